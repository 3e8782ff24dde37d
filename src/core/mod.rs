/*!
 * Upload orchestration
 *
 * Bucket check, optional size limit, sequential directory upload with
 * per-file progress to one or more destinations, then URL issuance.
 * Everything here talks to storage through [`S3Operations`](crate::protocol::s3::S3Operations).
 */

pub mod bucket;
pub mod pipeline;
pub mod progress;
pub mod quota;
pub mod uploader;
pub mod urls;

pub use bucket::{ensure_bucket, BucketStatus};
pub use pipeline::{
    run_upload, DestinationOutcome, PipelineOptions, PipelineOutcome, TargetState, UploadTarget,
};
pub use progress::{
    EventSink, NullSink, ProgressSnapshot, ProgressTracker, TransferSession, UploadEvent,
};
pub use quota::{bucket_usage, check_quota, BucketUsage, QuotaCheck};
pub use uploader::{
    scan_directory, DirectoryUploader, FileFailure, LocalFile, UploadResult, UploadedFile,
};
pub use urls::{percent_encode, FileUrls, IssuedUrl, UrlFailure, UrlIssuer, UrlKind, UrlReport};

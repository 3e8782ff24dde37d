/*!
 * oci-uploader - bulk folder upload to OCI Object Storage
 *
 * Uploads every regular file of a directory to a bucket on Oracle Cloud
 * Object Storage (or Cloudflare R2 / any S3-compatible endpoint) through
 * the S3 compatibility API, with:
 * - bucket creation when it does not exist yet
 * - an optional bucket size limit checked before anything is sent
 * - multipart upload for large files with live per-file progress
 * - permanent public and time-limited pre-signed URLs per uploaded file
 * - fan-out to several named destinations, each checked and reported on
 *   its own
 *
 * Version: 0.3.0
 */

pub mod cli_progress;
pub mod cli_style;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod output;
pub mod protocol;

// Re-export commonly used types
pub use config::{Destination, LogLevel, Provider, UploadConfig};
pub use core::{
    run_upload, PipelineOptions, PipelineOutcome, UploadResult, UploadTarget, UrlReport,
};
pub use error::{Result, UploadError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/*!
 * End-to-end upload run
 *
 * Bucket check per destination, directory scan, optional size limit per
 * destination, then each file is sent to every ready destination in turn,
 * then URL issuance for every uploaded file. A destination whose bucket
 * check or size limit fails is skipped while the others continue; the run
 * only ends early when no destination is left.
 */

use super::bucket::{ensure_bucket, BucketStatus};
use super::progress::{EventSink, ProgressTracker, UploadEvent};
use super::quota::{bucket_usage, check_quota, BucketUsage, QuotaCheck};
use super::uploader::{scan_directory, DirectoryUploader, UploadResult};
use super::urls::{UrlIssuer, UrlReport};
use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::protocol::s3::S3Operations;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// One place the files go to
pub struct UploadTarget<'a> {
    pub name: String,
    pub store: &'a dyn S3Operations,
    pub max_size_bytes: Option<u64>,
    pub public_base: Option<String>,
}

impl<'a> UploadTarget<'a> {
    pub fn new(name: impl Into<String>, store: &'a dyn S3Operations) -> Self {
        Self {
            name: name.into(),
            store,
            max_size_bytes: None,
            public_base: None,
        }
    }

    pub fn with_size_limit(mut self, limit: Option<u64>) -> Self {
        self.max_size_bytes = limit;
        self
    }

    pub fn with_public_base(mut self, base: Option<String>) -> Self {
        self.public_base = base;
        self
    }
}

/// What a run needs besides the destinations
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub source_dir: PathBuf,
    pub public_urls: bool,
    pub presigned_urls: bool,
    pub presign_ttl: Duration,
    pub tracker: ProgressTracker,
}

impl PipelineOptions {
    pub fn from_config(config: &UploadConfig) -> Result<Self> {
        Ok(Self {
            source_dir: config.require_source_dir()?.to_path_buf(),
            public_urls: config.public_urls,
            presigned_urls: config.presigned_urls,
            presign_ttl: Duration::from_secs(config.presign_ttl_secs),
            tracker: ProgressTracker::new(),
        })
    }
}

/// Whether a destination takes part in the upload
#[derive(Debug)]
pub enum TargetState {
    Ready {
        bucket: BucketStatus,
        quota: Option<QuotaCheck>,
    },
    Skipped(UploadError),
}

impl TargetState {
    fn is_ready(&self) -> bool {
        matches!(self, TargetState::Ready { .. })
    }
}

/// What one destination produced
#[derive(Debug)]
pub struct DestinationOutcome {
    pub name: String,
    pub bucket: String,
    pub state: TargetState,
    pub upload: UploadResult,
    pub urls: UrlReport,
    /// Bucket volume after the upload, when it could be listed
    pub final_usage: Option<BucketUsage>,
}

impl DestinationOutcome {
    pub fn bucket_status(&self) -> Option<BucketStatus> {
        match self.state {
            TargetState::Ready { bucket, .. } => Some(bucket),
            TargetState::Skipped(_) => None,
        }
    }

    pub fn quota(&self) -> Option<QuotaCheck> {
        match self.state {
            TargetState::Ready { quota, .. } => quota,
            TargetState::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&UploadError> {
        match &self.state {
            TargetState::Skipped(e) => Some(e),
            TargetState::Ready { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        !self.state.is_ready()
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Files found in the source directory
    pub files: usize,
    pub total_bytes: u64,
    /// One entry per destination, in configuration order
    pub destinations: Vec<DestinationOutcome>,
}

impl PipelineOutcome {
    pub fn has_failures(&self) -> bool {
        self.destinations
            .iter()
            .any(|d| d.is_skipped() || d.upload.has_failures())
    }
}

/// Run the whole upload against every target
///
/// Fails when the directory cannot be read or when no destination passes
/// its bucket check and size limit. With a single destination, that
/// destination's error is returned unchanged.
pub async fn run_upload(
    targets: &[UploadTarget<'_>],
    options: &PipelineOptions,
    sink: &mut dyn EventSink,
) -> Result<PipelineOutcome> {
    let mut states = Vec::with_capacity(targets.len());
    for target in targets {
        let state = match ensure_bucket(target.store).await {
            Ok(bucket) => TargetState::Ready {
                bucket,
                quota: None,
            },
            Err(e) => {
                warn!(destination = %target.name, error = %e, "Skipping destination");
                TargetState::Skipped(e)
            }
        };
        states.push(state);
    }
    let mut states = require_any_ready(states)?;

    let files = scan_directory(&options.source_dir)?;
    if files.is_empty() {
        info!(directory = %options.source_dir.display(), "No files to upload");
        return Ok(PipelineOutcome {
            files: 0,
            total_bytes: 0,
            destinations: finish(targets, states, Vec::new(), Vec::new(), Vec::new()),
        });
    }

    let incoming: u64 = files.iter().map(|f| f.size).sum();
    for (target, state) in targets.iter().zip(states.iter_mut()) {
        if let TargetState::Ready { bucket, .. } = *state {
            *state = match check_quota(target.store, incoming, target.max_size_bytes).await {
                Ok(quota) => TargetState::Ready { bucket, quota },
                Err(e) => {
                    warn!(destination = %target.name, error = %e, "Skipping destination");
                    TargetState::Skipped(e)
                }
            };
        }
    }
    let states = require_any_ready(states)?;

    sink.emit(&UploadEvent::BatchStarted {
        directory: options.source_dir.clone(),
        files: files.len(),
        total_bytes: incoming,
    });

    let labelled = targets.len() > 1;
    let uploaders: Vec<_> = targets
        .iter()
        .map(|target| {
            let uploader = DirectoryUploader::new(target.store).with_tracker(options.tracker);
            if labelled {
                uploader.for_destination(target.name.as_str())
            } else {
                uploader
            }
        })
        .collect();

    let mut results: Vec<UploadResult> = targets.iter().map(|_| UploadResult::default()).collect();
    for (index, file) in files.iter().enumerate() {
        for ((uploader, state), result) in uploaders.iter().zip(&states).zip(results.iter_mut()) {
            if state.is_ready() {
                uploader
                    .upload_into(result, file, index, files.len(), sink)
                    .await;
            }
        }
    }

    let mut reports = Vec::with_capacity(targets.len());
    let mut usages = Vec::with_capacity(targets.len());
    for (((target, uploader), state), result) in
        targets.iter().zip(&uploaders).zip(&states).zip(&results)
    {
        if !state.is_ready() {
            reports.push(UrlReport::default());
            usages.push(None);
            continue;
        }
        uploader.finish_batch(result, sink);

        let urls = UrlIssuer::new(target.store, target.public_base.clone())
            .with_kinds(options.public_urls, options.presigned_urls)
            .issue_all(&result.file_names(), options.presign_ttl)
            .await;
        reports.push(urls);

        let usage = if result.uploaded.is_empty() {
            None
        } else {
            match bucket_usage(target.store).await {
                Ok(usage) => Some(usage),
                Err(e) => {
                    warn!(destination = %target.name, error = %e, "Could not measure final bucket size");
                    None
                }
            }
        };
        usages.push(usage);
    }

    Ok(PipelineOutcome {
        files: files.len(),
        total_bytes: incoming,
        destinations: finish(targets, states, results, reports, usages),
    })
}

/// Pass the states through when at least one target is ready
///
/// Otherwise the first skip reason becomes the error of the run.
fn require_any_ready(states: Vec<TargetState>) -> Result<Vec<TargetState>> {
    if states.iter().any(TargetState::is_ready) {
        return Ok(states);
    }
    Err(states
        .into_iter()
        .find_map(|state| match state {
            TargetState::Skipped(e) => Some(e),
            TargetState::Ready { .. } => None,
        })
        .unwrap_or_else(|| UploadError::Config("No destination configured".to_string())))
}

fn finish(
    targets: &[UploadTarget<'_>],
    states: Vec<TargetState>,
    results: Vec<UploadResult>,
    reports: Vec<UrlReport>,
    usages: Vec<Option<BucketUsage>>,
) -> Vec<DestinationOutcome> {
    let mut results = results.into_iter();
    let mut reports = reports.into_iter();
    let mut usages = usages.into_iter();
    targets
        .iter()
        .zip(states)
        .map(|(target, state)| DestinationOutcome {
            name: target.name.clone(),
            bucket: target.store.bucket().to_string(),
            state,
            upload: results.next().unwrap_or_default(),
            urls: reports.next().unwrap_or_default(),
            final_usage: usages.next().flatten(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::{NullSink, UploadEvent};
    use crate::protocol::s3::{MockFailure, MockStore};
    use std::fs;
    use tempfile::TempDir;

    fn options(dir: &TempDir) -> PipelineOptions {
        PipelineOptions {
            source_dir: dir.path().to_path_buf(),
            public_urls: true,
            presigned_urls: true,
            presign_ttl: Duration::from_secs(3600),
            tracker: ProgressTracker::new(),
        }
    }

    fn target<'a>(name: &str, store: &'a MockStore) -> UploadTarget<'a> {
        UploadTarget::new(name, store)
            .with_public_base(Some(format!("https://public.example/{}", store.bucket())))
    }

    #[tokio::test]
    async fn test_creates_bucket_then_uploads_and_issues_urls() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), b"hello").unwrap();

        let store = MockStore::new("media");
        let outcome = run_upload(&[target("wasabi", &store)], &options(&temp), &mut NullSink)
            .await
            .unwrap();

        let dest = &outcome.destinations[0];
        assert_eq!(dest.bucket_status(), Some(BucketStatus::Created));
        assert_eq!(dest.upload.file_names(), vec!["a.txt"]);
        assert_eq!(dest.urls.entries.len(), 1);
        assert_eq!(dest.urls.issued().count(), 2);
        assert_eq!(
            dest.final_usage,
            Some(BucketUsage {
                bytes: 5,
                objects: 1
            })
        );
        assert!(!outcome.has_failures());
    }

    #[tokio::test]
    async fn test_bucket_failure_stops_before_scan() {
        let temp = TempDir::new().unwrap();
        let store = MockStore::new("media");
        store.fail_head(MockFailure::AccessDenied);

        let mut opts = options(&temp);
        opts.source_dir = temp.path().join("missing");

        let err = run_upload(&[target("wasabi", &store)], &opts, &mut NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::BucketCheck { .. }));
    }

    #[tokio::test]
    async fn test_quota_exceeded_uploads_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), vec![0u8; 600]).unwrap();

        let store = MockStore::with_existing_bucket("media");
        store.insert_object("old.bin", 500);
        let limited = target("wasabi", &store).with_size_limit(Some(1000));

        let mut events: Vec<UploadEvent> = Vec::new();
        let err = run_upload(&[limited], &options(&temp), &mut events)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::QuotaExceeded { .. }));
        assert!(store.upload_order().is_empty());
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_empty_directory_is_not_a_failure() {
        let temp = TempDir::new().unwrap();
        let store = MockStore::with_existing_bucket("media");

        let outcome = run_upload(&[target("wasabi", &store)], &options(&temp), &mut NullSink)
            .await
            .unwrap();
        assert_eq!(outcome.files, 0);
        assert!(outcome.destinations[0].upload.is_empty());
        assert!(outcome.destinations[0].urls.entries.is_empty());
        assert!(outcome.destinations[0].final_usage.is_none());
    }

    #[tokio::test]
    async fn test_urls_only_for_uploaded_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file1"), b"1").unwrap();
        fs::write(temp.path().join("file2"), b"22").unwrap();

        let store = MockStore::with_existing_bucket("media");
        store.fail_upload("file1");

        let outcome = run_upload(&[target("wasabi", &store)], &options(&temp), &mut NullSink)
            .await
            .unwrap();
        let names: Vec<_> = outcome.destinations[0]
            .urls
            .entries
            .iter()
            .map(|e| e.file_name.as_str())
            .collect();
        assert_eq!(names, vec!["file2"]);
    }

    #[tokio::test]
    async fn test_each_file_goes_to_every_destination() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), vec![0u8; 10]).unwrap();
        fs::write(temp.path().join("b.bin"), vec![0u8; 20]).unwrap();

        let primary = MockStore::with_existing_bucket("media");
        let backup = MockStore::new("media-backup");
        backup.fail_upload("b.bin");

        let mut events: Vec<UploadEvent> = Vec::new();
        let outcome = run_upload(
            &[target("primary", &primary), target("backup", &backup)],
            &options(&temp),
            &mut events,
        )
        .await
        .unwrap();

        assert_eq!(primary.upload_order(), vec!["a.bin", "b.bin"]);
        assert_eq!(backup.upload_order(), vec!["a.bin", "b.bin"]);

        let [first, second] = &outcome.destinations[..] else {
            panic!("expected two destinations");
        };
        assert_eq!(first.name, "primary");
        assert_eq!(first.upload.file_names(), vec!["a.bin", "b.bin"]);
        assert_eq!(second.bucket_status(), Some(BucketStatus::Created));
        assert_eq!(second.upload.file_names(), vec!["a.bin"]);
        assert_eq!(second.upload.failures[0].file_name, "b.bin");
        assert_eq!(second.urls.entries.len(), 1);
        assert!(second
            .urls
            .issued()
            .any(|u| u.url.starts_with("https://public.example/media-backup/")));
        assert!(outcome.has_failures());

        // File order first, destination order second
        let started: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                UploadEvent::FileStarted {
                    file_name,
                    destination,
                    ..
                } => Some((file_name.as_str(), destination.as_deref())),
                _ => None,
            })
            .collect();
        assert_eq!(
            started,
            vec![
                ("a.bin", Some("primary")),
                ("a.bin", Some("backup")),
                ("b.bin", Some("primary")),
                ("b.bin", Some("backup")),
            ]
        );
        let batches = events
            .iter()
            .filter(|e| matches!(e, UploadEvent::BatchCompleted { .. }))
            .count();
        assert_eq!(batches, 2);
    }

    #[tokio::test]
    async fn test_destination_over_limit_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), vec![0u8; 600]).unwrap();

        let full = MockStore::with_existing_bucket("full");
        full.insert_object("old.bin", 500);
        let roomy = MockStore::with_existing_bucket("roomy");

        let outcome = run_upload(
            &[
                target("full", &full).with_size_limit(Some(1000)),
                target("roomy", &roomy).with_size_limit(Some(10_000)),
            ],
            &options(&temp),
            &mut NullSink,
        )
        .await
        .unwrap();

        assert!(full.upload_order().is_empty());
        assert_eq!(roomy.upload_order(), vec!["a.bin"]);

        let skipped = &outcome.destinations[0];
        assert!(matches!(
            skipped.skip_reason(),
            Some(UploadError::QuotaExceeded { used: 500, .. })
        ));
        assert!(skipped.upload.is_empty());
        assert!(skipped.urls.entries.is_empty());

        let kept = &outcome.destinations[1];
        assert_eq!(kept.quota().map(|q| q.remaining_after()), Some(9_400));
        assert_eq!(kept.final_usage.map(|u| u.bytes), Some(600));
        assert!(outcome.has_failures());
    }

    #[tokio::test]
    async fn test_bucket_failure_skips_only_that_destination() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), b"abc").unwrap();

        let broken = MockStore::new("broken");
        broken.fail_head(MockFailure::AccessDenied);
        let healthy = MockStore::with_existing_bucket("healthy");

        let outcome = run_upload(
            &[target("broken", &broken), target("healthy", &healthy)],
            &options(&temp),
            &mut NullSink,
        )
        .await
        .unwrap();

        assert!(matches!(
            outcome.destinations[0].skip_reason(),
            Some(UploadError::BucketCheck { .. })
        ));
        assert_eq!(
            outcome.destinations[1].upload.file_names(),
            vec!["a.bin"]
        );
    }

    #[tokio::test]
    async fn test_every_destination_skipped_is_fatal() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.bin"), vec![0u8; 600]).unwrap();

        let one = MockStore::with_existing_bucket("one");
        one.insert_object("old.bin", 900);
        let two = MockStore::new("two");
        two.fail_head(MockFailure::AccessDenied);

        let err = run_upload(
            &[
                target("one", &one).with_size_limit(Some(1000)),
                target("two", &two),
            ],
            &options(&temp),
            &mut NullSink,
        )
        .await
        .unwrap_err();
        assert!(err.is_fatal());
        assert!(one.upload_order().is_empty());
    }

    #[tokio::test]
    async fn test_no_targets_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let err = run_upload(&[], &options(&temp), &mut NullSink)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Config(_)));
    }
}

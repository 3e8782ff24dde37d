/*!
 * Directory uploader
 *
 * Uploads the regular files directly inside a directory, one file at a
 * time, in file-name order. Each file is a single attempt: a failure is
 * recorded and the batch moves on. Re-running the same directory is the
 * recovery path, since objects are simply overwritten.
 */

use super::progress::{EventSink, ProgressTracker, TransferSession, UploadEvent};
use crate::error::{Result, UploadError};
use crate::protocol::s3::{ProgressReporter, S3Operations};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// File name, also used as the object key
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// A successfully uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
}

/// A file that could not be uploaded
#[derive(Debug)]
pub struct FileFailure {
    pub file_name: String,
    pub error: UploadError,
}

/// Outcome of a batch
#[derive(Debug, Default)]
pub struct UploadResult {
    /// Uploaded files in processing order
    pub uploaded: Vec<UploadedFile>,
    pub failures: Vec<FileFailure>,
    pub elapsed: Duration,
}

impl UploadResult {
    /// Names of the uploaded files in processing order
    pub fn file_names(&self) -> Vec<&str> {
        self.uploaded.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty() && self.failures.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of files an upload was attempted for
    pub fn attempted(&self) -> usize {
        self.uploaded.len() + self.failures.len()
    }

    /// Bytes in successfully uploaded files
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded.iter().map(|f| f.size).sum()
    }

    /// Average throughput over the whole batch, in bytes per second
    pub fn average_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.uploaded_bytes() as f64 / secs
        } else {
            0.0
        }
    }
}

/// List the regular files directly inside `dir`, sorted by name
///
/// Subdirectories, symlinks (never followed) and special files are skipped.
/// Names that are not valid UTF-8 cannot become object keys and are
/// skipped with a warning.
pub fn scan_directory(dir: &Path) -> Result<Vec<LocalFile>> {
    let metadata = std::fs::metadata(dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            UploadError::SourceNotFound(dir.to_path_buf())
        } else {
            UploadError::Io(e)
        }
    })?;
    if !metadata.is_dir() {
        return Err(UploadError::SourceNotDirectory(dir.to_path_buf()));
    }

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            debug!(path = %entry.path().display(), "Skipping non-regular entry");
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!(path = %entry.path().display(), "Skipping file with non UTF-8 name");
            continue;
        };

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Failed to stat file");
                continue;
            }
        };

        files.push(LocalFile {
            name: name.to_string(),
            path: entry.path().to_path_buf(),
            size,
        });
    }

    Ok(files)
}

/// Uploads files through an [`S3Operations`] store
pub struct DirectoryUploader<'a, S: S3Operations + ?Sized> {
    store: &'a S,
    tracker: ProgressTracker,
    destination: Option<String>,
}

impl<'a, S: S3Operations + ?Sized> DirectoryUploader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            tracker: ProgressTracker::new(),
            destination: None,
        }
    }

    pub fn with_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Label every event with the destination name
    pub fn for_destination(mut self, name: impl Into<String>) -> Self {
        self.destination = Some(name.into());
        self
    }

    /// Upload every regular file directly inside `directory`
    ///
    /// Fails only if the directory itself cannot be read; per-file failures
    /// are collected in the result. An empty directory yields an empty
    /// result without contacting the store.
    pub async fn upload_all(
        &self,
        directory: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<UploadResult> {
        let files = scan_directory(directory)?;
        if files.is_empty() {
            info!(directory = %directory.display(), "No files to upload");
            return Ok(UploadResult::default());
        }

        sink.emit(&UploadEvent::BatchStarted {
            directory: directory.to_path_buf(),
            files: files.len(),
            total_bytes: files.iter().map(|f| f.size).sum(),
        });

        Ok(self.upload_files(&files, sink).await)
    }

    /// Upload an already scanned list of files, in order
    pub async fn upload_files(
        &self,
        files: &[LocalFile],
        sink: &mut dyn EventSink,
    ) -> UploadResult {
        let mut result = UploadResult::default();
        for (index, file) in files.iter().enumerate() {
            self.upload_into(&mut result, file, index, files.len(), sink)
                .await;
        }
        self.finish_batch(&result, sink);
        result
    }

    /// Upload one file and record the outcome in `result`
    ///
    /// The time spent is added to `result.elapsed`, so a result filled one
    /// file at a time across several stores still yields a per-store rate.
    pub async fn upload_into(
        &self,
        result: &mut UploadResult,
        file: &LocalFile,
        index: usize,
        count: usize,
        sink: &mut dyn EventSink,
    ) {
        let started = Instant::now();
        match self.upload_one(file, index, count, sink).await {
            Ok(()) => result.uploaded.push(UploadedFile {
                name: file.name.clone(),
                size: file.size,
            }),
            Err(error) => result.failures.push(FileFailure {
                file_name: file.name.clone(),
                error,
            }),
        }
        result.elapsed += started.elapsed();
    }

    /// Emit the end-of-batch marker for `result`
    pub fn finish_batch(&self, result: &UploadResult, sink: &mut dyn EventSink) {
        sink.emit(&UploadEvent::BatchCompleted {
            succeeded: result.uploaded.len(),
            failed: result.failures.len(),
            total_bytes: result.uploaded_bytes(),
            duration_ms: result.elapsed.as_millis() as u64,
            destination: self.destination.clone(),
        });

        info!(
            destination = self.destination.as_deref().unwrap_or(self.store.bucket()),
            succeeded = result.uploaded.len(),
            failed = result.failures.len(),
            bytes = result.uploaded_bytes(),
            "Batch finished"
        );
    }

    async fn upload_one(
        &self,
        file: &LocalFile,
        index: usize,
        count: usize,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let mut session = TransferSession::new(&file.name, &file.path, file.size);
        sink.emit(&UploadEvent::FileStarted {
            file_name: file.name.clone(),
            index,
            count,
            total_bytes: file.size,
            destination: self.destination.clone(),
        });
        debug!(
            file = %file.name,
            size = file.size,
            bucket = self.store.bucket(),
            "Uploading file"
        );

        let (reporter, mut bytes_rx) = ProgressReporter::new();
        let upload = self.store.upload_file(&file.path, &file.name, reporter);
        tokio::pin!(upload);

        let outcome = loop {
            tokio::select! {
                result = &mut upload => break result,
                Some(n) = bytes_rx.recv() => {
                    let n = unconfirmed_share(&session, n);
                    if let Some(snapshot) = self.tracker.on_bytes(&mut session, n) {
                        sink.emit(&UploadEvent::Progress(snapshot));
                    }
                }
            }
        };

        // Reports sent just before the upload finished
        while let Ok(n) = bytes_rx.try_recv() {
            let n = unconfirmed_share(&session, n);
            self.tracker.on_bytes(&mut session, n);
        }

        match outcome {
            Ok(()) => {
                let snapshot = self.tracker.complete(&mut session);
                sink.emit(&UploadEvent::Progress(snapshot));
                sink.emit(&UploadEvent::FileCompleted {
                    file_name: file.name.clone(),
                    bytes: session.total_bytes,
                    duration_ms: session.start_time.elapsed().as_millis() as u64,
                    destination: self.destination.clone(),
                });
                info!(file = %file.name, bytes = file.size, bucket = self.store.bucket(), "Uploaded");
                Ok(())
            }
            Err(source) => {
                warn!(file = %file.name, bucket = self.store.bucket(), error = %source, "Upload failed");
                sink.emit(&UploadEvent::FileFailed {
                    file_name: file.name.clone(),
                    error: source.to_string(),
                    bytes_transferred: session.bytes_transferred,
                    destination: self.destination.clone(),
                });
                Err(UploadError::Transfer {
                    file: file.name.clone(),
                    source,
                })
            }
        }
    }
}

/// Part of `n` that may be credited before the store confirms the object
///
/// The last byte is held back until the upload succeeds, so a session only
/// reaches its total on success: a multipart upload whose parts all went
/// out but whose completion was rejected stays below it.
fn unconfirmed_share(session: &TransferSession, n: u64) -> u64 {
    let cap = session.total_bytes.saturating_sub(1);
    n.min(cap.saturating_sub(session.bytes_transferred))
}

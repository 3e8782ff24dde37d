//! In-memory object store for testing
//!
//! Implements [`S3Operations`] without any network access so the upload
//! pipeline can be exercised end to end. Failures are injected per bucket
//! call or per object key.

use super::error::{S3Error, S3Result};
use super::operations::S3Operations;
use super::progress::ProgressReporter;
use super::types::{S3ListResult, S3Object};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Failure to inject into a bucket-level call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    AccessDenied,
    Network,
    Timeout,
}

impl MockFailure {
    fn to_error(self) -> S3Error {
        match self {
            MockFailure::AccessDenied => S3Error::AccessDenied("mock: access denied".to_string()),
            MockFailure::Network => S3Error::Network("mock: connection reset".to_string()),
            MockFailure::Timeout => S3Error::Timeout("mock: timed out".to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    bucket_exists: bool,
    head_failure: Option<MockFailure>,
    create_failure: Option<MockFailure>,
    create_calls: usize,
    failing_uploads: HashSet<String>,
    failing_commits: HashSet<String>,
    failing_presigns: HashSet<String>,
    objects: BTreeMap<String, u64>,
    upload_order: Vec<String>,
    report_chunk: Option<u64>,
}

/// Mock object store
///
/// # Example
///
/// ```ignore
/// let store = MockStore::new("media");
/// store.fail_upload("broken.bin");
/// let result = upload_all(&store, &files, &mut sink).await;
/// ```
#[derive(Debug, Clone)]
pub struct MockStore {
    bucket: String,
    state: Arc<Mutex<MockState>>,
}

impl MockStore {
    /// Create a store whose bucket does not exist yet
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Create a store whose bucket already exists
    pub fn with_existing_bucket(bucket: impl Into<String>) -> Self {
        let store = Self::new(bucket);
        store.state().bucket_exists = true;
        store
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the store from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the existence check fail
    pub fn fail_head(&self, failure: MockFailure) {
        self.state().head_failure = Some(failure);
    }

    /// Make bucket creation fail
    pub fn fail_create(&self, failure: MockFailure) {
        self.state().create_failure = Some(failure);
    }

    /// Make the upload of `key` fail halfway through
    pub fn fail_upload(&self, key: impl Into<String>) {
        self.state().failing_uploads.insert(key.into());
    }

    /// Make the upload of `key` fail after every byte was sent, the way a
    /// rejected `CompleteMultipartUpload` does
    pub fn fail_commit(&self, key: impl Into<String>) {
        self.state().failing_commits.insert(key.into());
    }

    /// Make URL signing for `key` fail
    pub fn fail_presign(&self, key: impl Into<String>) {
        self.state().failing_presigns.insert(key.into());
    }

    /// Report upload progress in pieces of at most `bytes`
    pub fn report_in_chunks(&self, bytes: u64) {
        self.state().report_chunk = Some(bytes.max(1));
    }

    /// Put an object directly into the store
    pub fn insert_object(&self, key: impl Into<String>, size: u64) {
        self.state().objects.insert(key.into(), size);
    }

    /// Whether the bucket currently exists
    pub fn has_bucket(&self) -> bool {
        self.state().bucket_exists
    }

    /// Number of create-bucket calls received
    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    /// Size of a stored object
    pub fn object_size(&self, key: &str) -> Option<u64> {
        self.state().objects.get(key).copied()
    }

    /// Keys in the order their uploads started
    pub fn upload_order(&self) -> Vec<String> {
        self.state().upload_order.clone()
    }
}

#[async_trait]
impl S3Operations for MockStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> S3Result<bool> {
        let state = self.state();
        match state.head_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(state.bucket_exists),
        }
    }

    async fn create_bucket(&self) -> S3Result<()> {
        let mut state = self.state();
        state.create_calls += 1;
        if let Some(failure) = state.create_failure {
            return Err(failure.to_error());
        }
        state.bucket_exists = true;
        Ok(())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        progress: ProgressReporter,
    ) -> S3Result<()> {
        let size = tokio::fs::metadata(local_path).await?.len();

        let (fails, fails_commit, chunk) = {
            let mut state = self.state();
            state.upload_order.push(key.to_string());
            (
                state.failing_uploads.contains(key),
                state.failing_commits.contains(key),
                state.report_chunk,
            )
        };

        let to_send = if fails { size / 2 } else { size };
        let chunk = chunk.unwrap_or(to_send.max(1));
        let mut sent = 0u64;
        while sent < to_send {
            let n = chunk.min(to_send - sent);
            progress.report(n);
            sent += n;
            tokio::task::yield_now().await;
        }

        if fails {
            return Err(S3Error::Network(format!("mock: upload of {} interrupted", key)));
        }
        if fails_commit {
            return Err(S3Error::Service {
                code: "InternalError".to_string(),
                message: format!("mock: could not assemble {}", key),
            });
        }

        self.state().objects.insert(key.to_string(), size);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> S3Result<String> {
        if self.state().failing_presigns.contains(key) {
            return Err(S3Error::Presign(format!("mock: cannot sign {}", key)));
        }
        Ok(format!(
            "https://mock.invalid/{}/{}?X-Amz-Expires={}&X-Amz-Signature=mock",
            self.bucket,
            key,
            expires_in.as_secs()
        ))
    }

    async fn list_objects(&self, prefix: &str) -> S3Result<S3ListResult> {
        let objects = self
            .state()
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, size)| S3Object {
                key: key.clone(),
                size: *size,
                last_modified: None,
                etag: None,
            })
            .collect();
        Ok(S3ListResult { objects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_create_bucket_then_exists() {
        let store = MockStore::new("media");
        assert!(!store.bucket_exists().await.unwrap());

        store.create_bucket().await.unwrap();
        assert!(store.bucket_exists().await.unwrap());
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_reports_partial_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 100]).unwrap();

        let store = MockStore::with_existing_bucket("media");
        store.fail_upload("broken.bin");

        let (reporter, mut receiver) = ProgressReporter::new();
        let result = store.upload_file(file.path(), "broken.bin", reporter).await;
        assert!(result.is_err());

        let mut total = 0;
        while let Ok(n) = receiver.try_recv() {
            total += n;
        }
        assert_eq!(total, 50);
        assert_eq!(store.object_size("broken.bin"), None);
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = MockStore::with_existing_bucket("media");
        store.insert_object("photos/a.jpg", 10);
        store.insert_object("photos/b.jpg", 20);
        store.insert_object("video.mp4", 30);

        let listed = store.list_objects("photos/").await.unwrap();
        assert_eq!(listed.objects.len(), 2);
        assert_eq!(listed.total_size(), 30);
    }
}

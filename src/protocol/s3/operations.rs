//! S3 operations trait and implementations

use super::client::S3Client;
use super::error::{S3Error, S3Result};
use super::progress::ProgressReporter;
use super::types::{S3ListResult, S3Object};
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Operations the uploader needs from an object store
///
/// Everything is scoped to the bucket the implementation was built for.
#[async_trait]
pub trait S3Operations: Send + Sync {
    /// Name of the bucket this store targets
    fn bucket(&self) -> &str;

    /// Metadata-only existence check; `Ok(false)` means "not found"
    async fn bucket_exists(&self) -> S3Result<bool>;

    /// Create the bucket
    async fn create_bucket(&self) -> S3Result<()>;

    /// Upload a local file under `key`, reporting bytes to `progress`
    async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        progress: ProgressReporter,
    ) -> S3Result<()>;

    /// Pre-signed GET URL for `key`, valid for `expires_in`
    async fn presign_get(&self, key: &str, expires_in: Duration) -> S3Result<String>;

    /// List objects with a given prefix, following continuation tokens
    async fn list_objects(&self, prefix: &str) -> S3Result<S3ListResult>;
}

#[async_trait]
impl S3Operations for S3Client {
    fn bucket(&self) -> &str {
        S3Client::bucket(self)
    }

    async fn bucket_exists(&self) -> S3Result<bool> {
        self.head_bucket().await
    }

    async fn create_bucket(&self) -> S3Result<()> {
        S3Client::create_bucket(self).await
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        progress: ProgressReporter,
    ) -> S3Result<()> {
        self.upload_file_with_progress(local_path, key, &progress)
            .await?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> S3Result<String> {
        S3Client::presign_get(self, key, expires_in).await
    }

    async fn list_objects(&self, prefix: &str) -> S3Result<S3ListResult> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .aws_client()
                .list_objects_v2()
                .bucket(S3Client::bucket(self))
                .prefix(prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| S3Error::from(e).context(format!("ListObjectsV2 {}", prefix)))?;

            objects.extend(response.contents().iter().filter_map(|obj| {
                let key = obj.key()?.to_string();
                let size = obj.size().unwrap_or(0).max(0) as u64;
                let last_modified = obj
                    .last_modified()
                    .and_then(|dt| SystemTime::try_from(*dt).ok());
                let etag = obj.e_tag().map(|s| s.to_string());

                Some(S3Object {
                    key,
                    size,
                    last_modified,
                    etag,
                })
            }));

            if response.is_truncated().unwrap_or(false) {
                match response.next_continuation_token() {
                    Some(token) => continuation_token = Some(token.to_string()),
                    None => break,
                }
            } else {
                break;
            }
        }

        Ok(S3ListResult { objects })
    }
}

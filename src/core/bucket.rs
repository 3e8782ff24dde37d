/*!
 * Destination bucket verification
 */

use crate::error::{Result, UploadError};
use crate::protocol::s3::S3Operations;
use serde::Serialize;
use tracing::{debug, info};

/// What [`ensure_bucket`] found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketStatus {
    Existed,
    Created,
}

/// Make sure the store's bucket exists, creating it if the service says it
/// does not
///
/// Only a definite "not found" leads to creation. Permission, network and
/// other failures of the existence check are returned as
/// [`UploadError::BucketCheck`] and end the run.
pub async fn ensure_bucket<S>(store: &S) -> Result<BucketStatus>
where
    S: S3Operations + ?Sized,
{
    let bucket = store.bucket().to_string();

    let exists = store
        .bucket_exists()
        .await
        .map_err(|source| UploadError::BucketCheck {
            bucket: bucket.clone(),
            source,
        })?;

    if exists {
        debug!(bucket = %bucket, "Bucket exists");
        return Ok(BucketStatus::Existed);
    }

    info!(bucket = %bucket, "Bucket not found, creating it");
    store
        .create_bucket()
        .await
        .map_err(|source| UploadError::BucketCreate {
            bucket: bucket.clone(),
            source,
        })?;

    info!(bucket = %bucket, "Bucket created");
    Ok(BucketStatus::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::s3::{MockFailure, MockStore};

    #[tokio::test]
    async fn test_existing_bucket_is_idempotent() {
        let store = MockStore::with_existing_bucket("media");

        assert_eq!(ensure_bucket(&store).await.unwrap(), BucketStatus::Existed);
        assert_eq!(ensure_bucket(&store).await.unwrap(), BucketStatus::Existed);
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_created_once() {
        let store = MockStore::new("media");

        assert_eq!(ensure_bucket(&store).await.unwrap(), BucketStatus::Created);
        assert_eq!(ensure_bucket(&store).await.unwrap(), BucketStatus::Existed);
        assert_eq!(store.create_calls(), 1);
        assert!(store.has_bucket());
    }

    #[tokio::test]
    async fn test_access_denied_is_fatal_without_create() {
        let store = MockStore::new("media");
        store.fail_head(MockFailure::AccessDenied);

        let err = ensure_bucket(&store).await.unwrap_err();
        assert!(matches!(err, UploadError::BucketCheck { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("access denied"));
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_network_error_is_fatal_without_create() {
        let store = MockStore::new("media");
        store.fail_head(MockFailure::Network);

        let err = ensure_bucket(&store).await.unwrap_err();
        assert!(matches!(err, UploadError::BucketCheck { .. }));
        assert!(err.is_transient());
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let store = MockStore::new("media");
        store.fail_create(MockFailure::AccessDenied);

        let err = ensure_bucket(&store).await.unwrap_err();
        assert!(matches!(err, UploadError::BucketCreate { .. }));
        assert!(err.is_fatal());
    }
}

/*!
 * Bucket size limit check
 *
 * Some providers bill or cap by stored volume. When a limit is configured,
 * the current bucket usage plus the batch size must stay within it before
 * any file is sent.
 */

use crate::error::{Result, UploadError};
use crate::protocol::s3::S3Operations;
use serde::Serialize;
use tracing::info;

/// Outcome of a passed size limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheck {
    /// Bytes already stored in the bucket
    pub used: u64,
    /// Objects already stored in the bucket
    pub objects: usize,
    /// Bytes about to be uploaded
    pub incoming: u64,
    /// Configured limit in bytes
    pub limit: u64,
}

impl QuotaCheck {
    pub fn total_after(&self) -> u64 {
        self.used.saturating_add(self.incoming)
    }

    pub fn remaining_after(&self) -> u64 {
        self.limit.saturating_sub(self.total_after())
    }

    pub fn passes(&self) -> bool {
        self.total_after() <= self.limit
    }
}

/// Stored volume of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketUsage {
    pub bytes: u64,
    pub objects: usize,
}

/// Sum the sizes of every object in the bucket
pub async fn bucket_usage<S>(store: &S) -> Result<BucketUsage>
where
    S: S3Operations + ?Sized,
{
    let listing = store.list_objects("").await?;
    Ok(BucketUsage {
        bytes: listing.total_size(),
        objects: listing.objects.len(),
    })
}

/// Compare bucket usage plus `incoming` bytes against `limit`
///
/// Returns `Ok(None)` without touching the store when no limit is set.
/// Exceeding the limit yields [`UploadError::QuotaExceeded`].
pub async fn check_quota<S>(
    store: &S,
    incoming: u64,
    limit: Option<u64>,
) -> Result<Option<QuotaCheck>>
where
    S: S3Operations + ?Sized,
{
    let Some(limit) = limit else {
        return Ok(None);
    };

    let usage = bucket_usage(store).await?;
    let check = QuotaCheck {
        used: usage.bytes,
        objects: usage.objects,
        incoming,
        limit,
    };

    info!(
        bucket = store.bucket(),
        used = check.used,
        objects = check.objects,
        incoming,
        limit,
        "Checked bucket size limit"
    );

    if !check.passes() {
        return Err(UploadError::QuotaExceeded {
            used: check.used,
            incoming,
            limit,
        });
    }

    Ok(Some(check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::s3::MockStore;

    #[tokio::test]
    async fn test_no_limit_skips_listing() {
        let store = MockStore::with_existing_bucket("media");
        store.insert_object("huge.bin", u64::MAX / 2);

        assert_eq!(check_quota(&store, u64::MAX / 2, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_within_limit() {
        let store = MockStore::with_existing_bucket("media");
        store.insert_object("a.bin", 400);
        store.insert_object("b.bin", 100);

        let check = check_quota(&store, 500, Some(1000)).await.unwrap().unwrap();
        assert_eq!(check.used, 500);
        assert_eq!(check.objects, 2);
        assert_eq!(check.remaining_after(), 0);
        assert!(check.passes());
    }

    #[tokio::test]
    async fn test_bucket_usage_sums_objects() {
        let store = MockStore::with_existing_bucket("media");
        assert_eq!(
            bucket_usage(&store).await.unwrap(),
            BucketUsage { bytes: 0, objects: 0 }
        );

        store.insert_object("a.bin", 400);
        store.insert_object("nested/b.bin", 100);
        assert_eq!(
            bucket_usage(&store).await.unwrap(),
            BucketUsage {
                bytes: 500,
                objects: 2
            }
        );
    }

    #[tokio::test]
    async fn test_over_limit_is_fatal() {
        let store = MockStore::with_existing_bucket("media");
        store.insert_object("a.bin", 600);

        let err = check_quota(&store, 500, Some(1000)).await.unwrap_err();
        assert!(matches!(
            err,
            UploadError::QuotaExceeded {
                used: 600,
                incoming: 500,
                limit: 1000
            }
        ));
        assert!(err.is_fatal());
    }
}

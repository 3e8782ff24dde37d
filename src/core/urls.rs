/*!
 * Retrieval URLs for uploaded objects
 *
 * Two kinds are issued per object:
 * - a permanent public URL, a pure string template that only works when
 *   the bucket allows public reads (never checked here);
 * - a pre-signed GET URL, signed locally by the client and valid for a
 *   bounded time.
 */

use crate::error::{Result, UploadError};
use crate::protocol::s3::S3Operations;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Characters escaped in object names: everything except `A-Za-z0-9-._~`
pub const OBJECT_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode an object name for use as a single URL path segment
pub fn percent_encode(name: &str) -> String {
    utf8_percent_encode(name, OBJECT_NAME).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Public,
    Presigned,
}

/// A URL issued for one object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedUrl {
    pub file_name: String,
    pub url: String,
    pub kind: UrlKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Both URLs of one object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileUrls {
    pub file_name: String,
    pub public: Option<IssuedUrl>,
    pub presigned: Option<IssuedUrl>,
}

/// A pre-signed URL that could not be generated
#[derive(Debug)]
pub struct UrlFailure {
    pub file_name: String,
    pub error: UploadError,
}

/// URLs for a set of objects, in the order they were requested
#[derive(Debug, Default)]
pub struct UrlReport {
    pub entries: Vec<FileUrls>,
    pub failures: Vec<UrlFailure>,
}

impl UrlReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Every issued URL, public first within each file
    pub fn issued(&self) -> impl Iterator<Item = &IssuedUrl> {
        self.entries
            .iter()
            .flat_map(|e| e.public.iter().chain(e.presigned.iter()))
    }
}

/// Issues public and pre-signed URLs for objects in the store's bucket
pub struct UrlIssuer<'a, S: S3Operations + ?Sized> {
    store: &'a S,
    public_base: Option<String>,
    include_public: bool,
    include_presigned: bool,
}

impl<'a, S: S3Operations + ?Sized> UrlIssuer<'a, S> {
    /// `public_base` is the URL objects are appended to, see
    /// [`Provider::public_url_base`](crate::config::Provider::public_url_base)
    pub fn new(store: &'a S, public_base: Option<String>) -> Self {
        Self {
            store,
            public_base,
            include_public: true,
            include_presigned: true,
        }
    }

    /// Choose which URL kinds [`issue_all`](Self::issue_all) produces
    pub fn with_kinds(mut self, public: bool, presigned: bool) -> Self {
        self.include_public = public;
        self.include_presigned = presigned;
        self
    }

    /// Permanent public URL, if the provider has one
    pub fn public_url(&self, file_name: &str) -> Option<String> {
        self.public_base
            .as_deref()
            .map(|base| format!("{}/{}", base, percent_encode(file_name)))
    }

    /// Time-limited URL signed by the client
    pub async fn presigned_url(&self, file_name: &str, ttl: Duration) -> Result<IssuedUrl> {
        let issued_at = Utc::now();
        let url = self
            .store
            .presign_get(file_name, ttl)
            .await
            .map_err(|source| UploadError::Presign {
                file: file_name.to_string(),
                source,
            })?;

        Ok(IssuedUrl {
            file_name: file_name.to_string(),
            url,
            kind: UrlKind::Presigned,
            expires_at: chrono::Duration::from_std(ttl)
                .ok()
                .map(|ttl| issued_at + ttl),
        })
    }

    /// Issue the enabled URL kinds for every name
    ///
    /// A failed pre-signed URL is recorded for that file only; the others,
    /// and its public URL, are still issued.
    pub async fn issue_all<N: AsRef<str>>(&self, names: &[N], ttl: Duration) -> UrlReport {
        let mut report = UrlReport::default();

        for name in names {
            let name = name.as_ref();

            let public = if self.include_public {
                self.public_url(name).map(|url| IssuedUrl {
                    file_name: name.to_string(),
                    url,
                    kind: UrlKind::Public,
                    expires_at: None,
                })
            } else {
                None
            };

            let presigned = if self.include_presigned {
                match self.presigned_url(name, ttl).await {
                    Ok(url) => Some(url),
                    Err(error) => {
                        warn!(file = name, error = %error, "Pre-signed URL failed");
                        report.failures.push(UrlFailure {
                            file_name: name.to_string(),
                            error,
                        });
                        None
                    }
                }
            } else {
                None
            };

            debug!(
                file = name,
                public = public.is_some(),
                presigned = presigned.is_some(),
                "Issued URLs"
            );
            report.entries.push(FileUrls {
                file_name: name.to_string(),
                public,
                presigned,
            });
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::s3::MockStore;
    use percent_encoding::percent_decode_str;

    const OCI_BASE: &str = "https://objectstorage.ap-hyderabad-1.oraclecloud.com/n/ns/b/media/o";

    fn decode(segment: &str) -> String {
        percent_decode_str(segment).decode_utf8().unwrap().into_owned()
    }

    #[test]
    fn test_percent_encode_escapes_everything_but_unreserved() {
        assert_eq!(percent_encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(percent_encode("my file.mp4"), "my%20file.mp4");
        assert_eq!(percent_encode("dir/name"), "dir%2Fname");
        assert_eq!(percent_encode("100%"), "100%25");
        assert_eq!(percent_encode("café"), "caf%C3%A9");
    }

    #[test]
    fn test_public_url_segment_decodes_to_name() {
        let store = MockStore::with_existing_bucket("media");
        let issuer = UrlIssuer::new(&store, Some(OCI_BASE.to_string()));

        for name in ["holiday photo.jpg", "a/b/c.txt", "日本語 ファイル.pdf", "50% off+more&co"] {
            let url = issuer.public_url(name).unwrap();
            let segment = url.strip_prefix(&format!("{}/", OCI_BASE)).unwrap();
            assert!(!segment.contains('/'));
            assert_eq!(decode(segment), name);
        }
    }

    #[test]
    fn test_no_public_base_means_no_public_url() {
        let store = MockStore::with_existing_bucket("media");
        let issuer = UrlIssuer::new(&store, None);
        assert_eq!(issuer.public_url("a.txt"), None);
    }

    #[tokio::test]
    async fn test_presigned_url_carries_expiry() {
        let store = MockStore::with_existing_bucket("media");
        let issuer = UrlIssuer::new(&store, None);

        let before = Utc::now();
        let issued = issuer
            .presigned_url("a.txt", Duration::from_secs(3600))
            .await
            .unwrap();

        assert_eq!(issued.kind, UrlKind::Presigned);
        assert!(issued.url.contains("X-Amz-Expires=3600"));
        let expires_at = issued.expires_at.unwrap();
        assert!(expires_at >= before + chrono::Duration::seconds(3600));
    }

    #[tokio::test]
    async fn test_one_presign_failure_does_not_block_others() {
        let store = MockStore::with_existing_bucket("media");
        store.fail_presign("b.txt");
        let issuer = UrlIssuer::new(&store, Some(OCI_BASE.to_string()));

        let report = issuer
            .issue_all(&["a.txt", "b.txt", "c.txt"], Duration::from_secs(60))
            .await;

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_name, "b.txt");
        assert!(!report.failures[0].error.is_fatal());

        let b = &report.entries[1];
        assert!(b.public.is_some());
        assert!(b.presigned.is_none());
        assert!(report.entries[2].presigned.is_some());
        assert_eq!(report.issued().count(), 5);
    }

    #[tokio::test]
    async fn test_kinds_can_be_disabled() {
        let store = MockStore::with_existing_bucket("media");
        let issuer =
            UrlIssuer::new(&store, Some(OCI_BASE.to_string())).with_kinds(true, false);

        let report = issuer.issue_all(&["a.txt"], Duration::from_secs(60)).await;
        assert!(report.entries[0].public.is_some());
        assert!(report.entries[0].presigned.is_none());
        assert!(!report.has_failures());
    }
}

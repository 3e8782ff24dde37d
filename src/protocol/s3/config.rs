//! Configuration types for S3 client

use super::error::{S3Error, S3Result};
use secrecy::SecretString;

/// S3 client configuration
///
/// The client is bound to a single bucket; every operation on
/// [`super::S3Client`] targets `bucket`.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,

    /// Signing region (e.g., "ap-hyderabad-1", "auto" for R2)
    pub region: Option<String>,

    /// Custom endpoint URL (for S3-compatible services)
    pub endpoint: Option<String>,

    /// Access key ID
    pub access_key: Option<String>,

    /// Secret access key
    pub secret_key: Option<SecretString>,

    /// Path-style addressing (required by OCI's compatibility API)
    pub force_path_style: bool,

    /// Files at or above this size are uploaded with multipart upload
    pub multipart_threshold: u64,

    /// Part size for multipart uploads
    pub chunk_size: usize,

    /// Maximum number of parts in flight for a single file
    pub parallel_operations: usize,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl S3Config {
    /// Create a new S3 config with required parameters
    pub fn new(bucket: String) -> Self {
        Self {
            bucket,
            region: None,
            endpoint: None,
            access_key: None,
            secret_key: None,
            force_path_style: true,
            multipart_threshold: super::DEFAULT_MULTIPART_THRESHOLD,
            chunk_size: super::DEFAULT_CHUNK_SIZE,
            parallel_operations: super::DEFAULT_PARALLEL_PARTS,
            timeout_seconds: 300,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> S3Result<()> {
        if self.bucket.is_empty() {
            return Err(S3Error::InvalidBucketName(
                "Bucket name cannot be empty".to_string(),
            ));
        }

        if !is_valid_bucket_name(&self.bucket) {
            return Err(S3Error::InvalidBucketName(format!(
                "{}. Bucket names must be 3-63 characters of letters, numbers, \
                 hyphens, underscores and periods",
                self.bucket
            )));
        }

        if self.chunk_size < super::MIN_CHUNK_SIZE {
            return Err(S3Error::InvalidConfig(format!(
                "Chunk size {} is below minimum {}",
                self.chunk_size,
                super::MIN_CHUNK_SIZE
            )));
        }

        if self.chunk_size > super::MAX_CHUNK_SIZE {
            return Err(S3Error::InvalidConfig(format!(
                "Chunk size {} exceeds maximum {}",
                self.chunk_size,
                super::MAX_CHUNK_SIZE
            )));
        }

        if self.multipart_threshold < super::MIN_CHUNK_SIZE as u64 {
            return Err(S3Error::InvalidConfig(format!(
                "Multipart threshold {} is below the minimum part size {}",
                self.multipart_threshold,
                super::MIN_CHUNK_SIZE
            )));
        }

        if self.multipart_threshold > super::MAX_CHUNK_SIZE as u64 {
            return Err(S3Error::InvalidConfig(format!(
                "Multipart threshold {} exceeds the single PUT limit {}",
                self.multipart_threshold,
                super::MAX_CHUNK_SIZE
            )));
        }

        if self.parallel_operations == 0 {
            return Err(S3Error::InvalidConfig(
                "Parallel operations must be at least 1".to_string(),
            ));
        }

        if self.parallel_operations > super::MAX_PARALLEL_OPERATIONS {
            return Err(S3Error::InvalidConfig(format!(
                "Parallel operations {} exceeds maximum {}",
                self.parallel_operations,
                super::MAX_PARALLEL_OPERATIONS
            )));
        }

        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(S3Error::InvalidConfig(
                "Both access_key and secret_key must be provided together".to_string(),
            ));
        }

        if let Some(endpoint) = &self.endpoint {
            let parsed = url::Url::parse(endpoint).map_err(|e| {
                S3Error::InvalidConfig(format!("Invalid endpoint URL '{}': {}", endpoint, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(S3Error::InvalidConfig(format!(
                    "Endpoint URL must use http or https: {}",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Check if using explicit credentials
    pub fn has_explicit_credentials(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self::new(String::new())
    }
}

/// Builder for S3Config
pub struct S3ConfigBuilder {
    config: S3Config,
}

impl S3ConfigBuilder {
    /// Create a new builder with bucket name
    pub fn new(bucket: String) -> Self {
        Self {
            config: S3Config::new(bucket),
        }
    }

    /// Set the signing region
    pub fn region(mut self, region: String) -> Self {
        self.config.region = Some(region);
        self
    }

    /// Set custom endpoint
    pub fn endpoint(mut self, endpoint: String) -> Self {
        self.config.endpoint = Some(endpoint);
        self
    }

    /// Set credentials explicitly
    pub fn credentials(mut self, access_key: String, secret_key: SecretString) -> Self {
        self.config.access_key = Some(access_key);
        self.config.secret_key = Some(secret_key);
        self
    }

    /// Enable or disable path-style addressing
    pub fn force_path_style(mut self, force: bool) -> Self {
        self.config.force_path_style = force;
        self
    }

    /// Set the multipart threshold in bytes
    pub fn multipart_threshold(mut self, threshold: u64) -> Self {
        self.config.multipart_threshold = threshold;
        self
    }

    /// Set chunk size for multipart uploads
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set number of parallel part uploads
    pub fn parallel_operations(mut self, count: usize) -> Self {
        self.config.parallel_operations = count;
        self
    }

    /// Set request timeout
    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.timeout_seconds = seconds;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> S3Result<S3Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Validate bucket name.
///
/// OCI accepts letters (either case), digits, hyphens, underscores and
/// periods, which is looser than AWS; R2 and the others are a subset.
pub(crate) fn is_valid_bucket_name(name: &str) -> bool {
    let len = name.len();
    if !(3..=63).contains(&len) {
        return false;
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid_chars {
        return false;
    }

    let first = name.chars().next();
    let last = name.chars().last();
    let edge_ok = |c: Option<char>| c.map(|c| c.is_ascii_alphanumeric()).unwrap_or(false);

    edge_ok(first) && edge_ok(last) && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bucket_names() {
        assert!(is_valid_bucket_name("my-bucket"));
        assert!(is_valid_bucket_name("Media_Archive"));
        assert!(is_valid_bucket_name("bucket.with.dots"));
        assert!(is_valid_bucket_name("abc"));
    }

    #[test]
    fn test_invalid_bucket_names() {
        assert!(!is_valid_bucket_name("ab"));
        assert!(!is_valid_bucket_name(&"a".repeat(64)));
        assert!(!is_valid_bucket_name("-bucket"));
        assert!(!is_valid_bucket_name("bucket-"));
        assert!(!is_valid_bucket_name("my bucket"));
        assert!(!is_valid_bucket_name("bucket..name"));
    }

    #[test]
    fn test_config_validation() {
        assert!(S3Config::new("valid-bucket".to_string()).validate().is_ok());
        assert!(S3Config::new(String::new()).validate().is_err());

        let mut config = S3Config::new("valid-bucket".to_string());
        config.chunk_size = 1024;
        assert!(matches!(config.validate(), Err(S3Error::InvalidConfig(_))));

        let mut config = S3Config::new("valid-bucket".to_string());
        config.parallel_operations = 0;
        assert!(config.validate().is_err());

        let mut config = S3Config::new("valid-bucket".to_string());
        config.access_key = Some("key".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multipart_threshold_bounds() {
        let mut config = S3Config::new("valid-bucket".to_string());
        config.multipart_threshold = super::super::MAX_CHUNK_SIZE as u64;
        assert!(config.validate().is_ok());

        // Anything above this would be sent as one oversized PutObject
        config.multipart_threshold = super::super::MAX_CHUNK_SIZE as u64 + 1;
        assert!(matches!(config.validate(), Err(S3Error::InvalidConfig(_))));

        config.multipart_threshold = 40 * 1024 * 1024 * 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_validation() {
        let mut config = S3Config::new("valid-bucket".to_string());
        config.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.endpoint = Some("ftp://example.com".to_string());
        assert!(config.validate().is_err());

        config.endpoint =
            Some("https://ns.compat.objectstorage.ap-hyderabad-1.oraclecloud.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = S3ConfigBuilder::new("test-bucket".to_string())
            .region("ap-hyderabad-1".to_string())
            .credentials("key".to_string(), SecretString::from("secret"))
            .chunk_size(16 * 1024 * 1024)
            .parallel_operations(8)
            .build()
            .unwrap();

        assert_eq!(config.bucket, "test-bucket");
        assert_eq!(config.region.as_deref(), Some("ap-hyderabad-1"));
        assert_eq!(config.chunk_size, 16 * 1024 * 1024);
        assert_eq!(config.parallel_operations, 8);
        assert!(config.has_explicit_credentials());
        assert!(config.force_path_style);
    }
}

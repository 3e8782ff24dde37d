/*!
 * Configuration types for oci-uploader
 */

use crate::error::{Result, UploadError};
use crate::protocol::s3::{
    self, S3Config, DEFAULT_CHUNK_SIZE, DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PARALLEL_PARTS,
    MAX_CHUNK_SIZE, MAX_PARALLEL_OPERATIONS, MIN_CHUNK_SIZE,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Bytes in one GiB, the unit of `max_size_gb`
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Default validity of pre-signed URLs (7 days, the SigV4 maximum)
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 604_800;

/// Where the object store lives and how its public URLs look
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Provider {
    /// Oracle Cloud Infrastructure Object Storage (S3 compatibility API)
    Oci { namespace: String, region: String },

    /// Cloudflare R2
    R2 {
        account_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_base_url: Option<String>,
    },

    /// Any other S3-compatible endpoint (Wasabi, MinIO, ...)
    Custom {
        endpoint: String,
        #[serde(default = "default_region")]
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_base_url: Option<String>,
    },
}

impl Default for Provider {
    fn default() -> Self {
        Provider::Oci {
            namespace: String::new(),
            region: String::new(),
        }
    }
}

impl Provider {
    /// Short provider name for display
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Oci { .. } => "OCI Object Storage",
            Provider::R2 { .. } => "Cloudflare R2",
            Provider::Custom { .. } => "S3-compatible",
        }
    }

    /// S3 compatibility endpoint URL
    pub fn endpoint_url(&self) -> String {
        match self {
            Provider::Oci { namespace, region } => format!(
                "https://{}.compat.objectstorage.{}.oraclecloud.com",
                namespace, region
            ),
            Provider::R2 { account_id, .. } => {
                format!("https://{}.r2.cloudflarestorage.com", account_id)
            }
            Provider::Custom { endpoint, .. } => endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Region used for request signing
    pub fn signing_region(&self) -> &str {
        match self {
            Provider::Oci { region, .. } => region,
            Provider::R2 { .. } => "auto",
            Provider::Custom { region, .. } => region,
        }
    }

    /// Base of the permanent public URL for objects in `bucket`
    ///
    /// Object names are appended as `{base}/{encoded name}`. `None` when the
    /// provider has no public URL scheme configured.
    pub fn public_url_base(&self, bucket: &str) -> Option<String> {
        match self {
            Provider::Oci { namespace, region } => Some(format!(
                "https://objectstorage.{}.oraclecloud.com/n/{}/b/{}/o",
                region, namespace, bucket
            )),
            Provider::R2 {
                public_base_url, ..
            }
            | Provider::Custom {
                public_base_url, ..
            } => public_base_url
                .as_deref()
                .map(|base| base.trim_end_matches('/').to_string())
                .filter(|base| !base.is_empty()),
        }
    }

    fn validate(&self) -> Result<()> {
        let require = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(UploadError::Config(format!("provider {} is required", field)))
            } else if value.chars().any(char::is_whitespace) {
                Err(UploadError::Config(format!(
                    "provider {} must not contain whitespace",
                    field
                )))
            } else {
                Ok(())
            }
        };

        match self {
            Provider::Oci { namespace, region } => {
                require("namespace", namespace)?;
                require("region", region)?;
            }
            Provider::R2 {
                account_id,
                public_base_url,
            } => {
                require("account_id", account_id)?;
                validate_http_url("public_base_url", public_base_url.as_deref())?;
            }
            Provider::Custom {
                endpoint,
                region,
                public_base_url,
            } => {
                require("endpoint", endpoint)?;
                require("region", region)?;
                validate_http_url("endpoint", Some(endpoint))?;
                validate_http_url("public_base_url", public_base_url.as_deref())?;
            }
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, value: Option<&str>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let parsed = url::Url::parse(value)
        .map_err(|e| UploadError::Config(format!("{} '{}' is not a URL: {}", field, value, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UploadError::Config(format!(
            "{} must use http or https: {}",
            field, value
        )));
    }
    Ok(())
}

/// A named upload destination: one bucket on one provider
///
/// Listed as `[[destinations]]` tables. When none are configured, the
/// top-level connection settings form the only destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    /// Label used in progress lines, reports and the URL file
    pub name: String,

    /// Disabled destinations are kept in the file but never contacted
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub bucket: String,

    #[serde(default)]
    pub access_key_id: String,

    #[serde(
        default,
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub secret_key: Option<SecretString>,

    /// Skip this destination if its bucket would grow past this many GiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_gb: Option<f64>,

    pub provider: Provider,
}

impl Destination {
    /// Size limit in bytes, if one is configured
    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size_gb.map(|gb| (gb * BYTES_PER_GB) as u64)
    }

    /// Base of the public URL of objects in this destination's bucket
    pub fn public_url_base(&self) -> Option<String> {
        self.provider.public_url_base(&self.bucket)
    }

    /// S3 client configuration, with transfer tuning taken from `tuning`
    pub fn to_s3_config(&self, tuning: &UploadConfig) -> Result<S3Config> {
        let secret_key = self.secret_key.clone().ok_or_else(|| {
            UploadError::Config(format!("destination '{}': secret_key is required", self.name))
        })?;

        s3::S3ConfigBuilder::new(self.bucket.clone())
            .region(self.provider.signing_region().to_string())
            .endpoint(self.provider.endpoint_url())
            .credentials(self.access_key_id.clone(), secret_key)
            .force_path_style(true)
            .multipart_threshold(tuning.multipart_threshold)
            .chunk_size(tuning.multipart_chunk_size)
            .parallel_operations(tuning.max_concurrency)
            .timeout_seconds(tuning.timeout_seconds)
            .build()
            .map_err(|e| UploadError::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        self.provider.validate()?;

        if self.bucket.is_empty() {
            return Err(UploadError::Config("bucket is required".to_string()));
        }
        if !s3::is_valid_bucket_name(&self.bucket) {
            return Err(UploadError::Config(format!(
                "invalid bucket name '{}': use 3-63 letters, numbers, hyphens, underscores or periods",
                self.bucket
            )));
        }

        if self.access_key_id.is_empty() || self.secret_key.is_none() {
            return Err(UploadError::Config(
                "access_key_id and secret_key are both required".to_string(),
            ));
        }

        if let Some(gb) = self.max_size_gb {
            if !gb.is_finite() || gb <= 0.0 {
                return Err(UploadError::Config(
                    "max_size_gb must be a positive number".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Main configuration for an upload run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Destination bucket
    #[serde(default)]
    pub bucket: String,

    /// Access key ID (OCI "Customer Secret Key" access key)
    #[serde(default)]
    pub access_key_id: String,

    /// Secret access key
    #[serde(
        default,
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub secret_key: Option<SecretString>,

    /// Directory whose files are uploaded
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// Files at or above this size use multipart upload
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: u64,

    /// Part size for multipart uploads
    #[serde(default = "default_chunk_size")]
    pub multipart_chunk_size: usize,

    /// Maximum parts in flight for one file
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,

    /// Validity of pre-signed URLs in seconds
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Refuse the batch if the bucket would grow past this many GiB
    #[serde(default)]
    pub max_size_gb: Option<f64>,

    /// Issue permanent public URLs
    #[serde(default = "default_true")]
    pub public_urls: bool,

    /// Issue pre-signed URLs
    #[serde(default = "default_true")]
    pub presigned_urls: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Object store provider
    #[serde(default)]
    pub provider: Provider,

    /// Upload to several destinations instead of the top-level bucket
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<Destination>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            access_key_id: String::new(),
            secret_key: None,
            source_dir: None,
            multipart_threshold: default_multipart_threshold(),
            multipart_chunk_size: default_chunk_size(),
            max_concurrency: default_concurrency(),
            presign_ttl_secs: default_presign_ttl(),
            timeout_seconds: default_timeout(),
            max_size_gb: None,
            public_urls: true,
            presigned_urls: true,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            provider: Provider::default(),
            destinations: Vec::new(),
        }
    }
}

/// Log level for diagnostic output
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_multipart_threshold() -> u64 {
    DEFAULT_MULTIPART_THRESHOLD
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_concurrency() -> usize {
    DEFAULT_PARALLEL_PARTS
}

fn default_presign_ttl() -> u64 {
    DEFAULT_PRESIGN_TTL_SECS
}

fn default_timeout() -> u64 {
    300
}

fn serialize_secret<S>(
    secret: &Option<SecretString>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match secret {
        Some(secret) => serializer.serialize_str(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()).map(SecretString::from))
}

impl UploadConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            UploadError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| UploadError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| UploadError::Config(format!("cannot serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file location (`~/.oci-uploader/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".oci-uploader").join("config.toml"))
    }

    /// Effective log level, with `verbose` forcing debug
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }

    /// Size limit in bytes, if one is configured
    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size_gb.map(|gb| (gb * BYTES_PER_GB) as u64)
    }

    /// The top-level connection settings as a destination
    pub fn primary_destination(&self) -> Destination {
        Destination {
            name: self.provider.name().to_string(),
            enabled: true,
            bucket: self.bucket.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_key: self.secret_key.clone(),
            max_size_gb: self.max_size_gb,
            provider: self.provider.clone(),
        }
    }

    /// Destinations of this run, in configuration order
    ///
    /// The enabled `[[destinations]]` entries, or the top-level settings
    /// when the list is empty.
    pub fn targets(&self) -> Vec<Destination> {
        if self.destinations.is_empty() {
            return vec![self.primary_destination()];
        }
        self.destinations
            .iter()
            .filter(|d| d.enabled)
            .cloned()
            .collect()
    }

    /// Keep only the named destinations enabled
    ///
    /// Unknown names are a configuration error. Without a destination list
    /// the only valid name is the top-level one.
    pub fn select_destinations(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        if self.destinations.is_empty() {
            let primary = self.provider.name();
            return match names.iter().find(|n| n.as_str() != primary) {
                Some(unknown) => Err(UploadError::Config(format!(
                    "unknown destination '{}'",
                    unknown
                ))),
                None => Ok(()),
            };
        }

        if let Some(unknown) = names
            .iter()
            .find(|n| !self.destinations.iter().any(|d| &d.name == *n))
        {
            return Err(UploadError::Config(format!(
                "unknown destination '{}'",
                unknown
            )));
        }
        for destination in &mut self.destinations {
            destination.enabled = names.contains(&destination.name);
        }
        Ok(())
    }

    /// Check everything needed to talk to the object stores
    pub fn validate(&self) -> Result<()> {
        if self.destinations.is_empty() {
            self.primary_destination().validate()?;
        } else {
            let mut seen = std::collections::HashSet::new();
            for destination in &self.destinations {
                if destination.name.trim().is_empty() {
                    return Err(UploadError::Config(
                        "every destination needs a name".to_string(),
                    ));
                }
                if !seen.insert(destination.name.as_str()) {
                    return Err(UploadError::Config(format!(
                        "destination '{}' is listed twice",
                        destination.name
                    )));
                }
                if destination.enabled {
                    destination.validate().map_err(|e| match e {
                        UploadError::Config(msg) => UploadError::Config(format!(
                            "destination '{}': {}",
                            destination.name, msg
                        )),
                        other => other,
                    })?;
                }
            }
            if !self.destinations.iter().any(|d| d.enabled) {
                return Err(UploadError::Config(
                    "all destinations are disabled".to_string(),
                ));
            }
        }

        if !(MIN_CHUNK_SIZE as u64..=MAX_CHUNK_SIZE as u64).contains(&self.multipart_threshold) {
            return Err(UploadError::Config(format!(
                "multipart_threshold must be between {} and {} bytes",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.multipart_chunk_size) {
            return Err(UploadError::Config(format!(
                "multipart_chunk_size must be between {} and {} bytes",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }
        if !(1..=MAX_PARALLEL_OPERATIONS).contains(&self.max_concurrency) {
            return Err(UploadError::Config(format!(
                "max_concurrency must be between 1 and {}",
                MAX_PARALLEL_OPERATIONS
            )));
        }
        if !(1..=DEFAULT_PRESIGN_TTL_SECS).contains(&self.presign_ttl_secs) {
            return Err(UploadError::Config(format!(
                "presign_ttl_secs must be between 1 and {}",
                DEFAULT_PRESIGN_TTL_SECS
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(UploadError::Config(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Source directory, required for uploads
    pub fn require_source_dir(&self) -> Result<&Path> {
        self.source_dir
            .as_deref()
            .ok_or_else(|| UploadError::Config("source_dir is required for upload".to_string()))
    }

    /// S3 client configuration of the top-level destination
    pub fn to_s3_config(&self) -> Result<S3Config> {
        self.primary_destination().to_s3_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oci_config() -> UploadConfig {
        UploadConfig {
            bucket: "media".to_string(),
            access_key_id: "access".to_string(),
            secret_key: Some(SecretString::from("secret")),
            source_dir: Some(PathBuf::from("/data/upload")),
            provider: Provider::Oci {
                namespace: "axaxnpcrorw5".to_string(),
                region: "ap-hyderabad-1".to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = UploadConfig::default();
        assert_eq!(config.multipart_threshold, 8 * 1024 * 1024);
        assert_eq!(config.multipart_chunk_size, 8 * 1024 * 1024);
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.presign_ttl_secs, 604_800);
        assert_eq!(config.timeout_seconds, 300);
        assert!(config.public_urls);
        assert!(config.presigned_urls);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oci_endpoint_and_public_base() {
        let config = oci_config();
        assert_eq!(
            config.provider.endpoint_url(),
            "https://axaxnpcrorw5.compat.objectstorage.ap-hyderabad-1.oraclecloud.com"
        );
        assert_eq!(
            config.provider.public_url_base("media").as_deref(),
            Some("https://objectstorage.ap-hyderabad-1.oraclecloud.com/n/axaxnpcrorw5/b/media/o")
        );
        assert_eq!(config.provider.signing_region(), "ap-hyderabad-1");
    }

    #[test]
    fn test_r2_provider() {
        let provider = Provider::R2 {
            account_id: "abc123".to_string(),
            public_base_url: Some("https://pub-xyz.r2.dev/".to_string()),
        };
        assert_eq!(provider.endpoint_url(), "https://abc123.r2.cloudflarestorage.com");
        assert_eq!(provider.signing_region(), "auto");
        assert_eq!(
            provider.public_url_base("media").as_deref(),
            Some("https://pub-xyz.r2.dev")
        );

        let private = Provider::R2 {
            account_id: "abc123".to_string(),
            public_base_url: None,
        };
        assert_eq!(private.public_url_base("media"), None);
    }

    #[test]
    fn test_validation() {
        assert!(oci_config().validate().is_ok());

        let mut config = oci_config();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());
        config.max_concurrency = 65;
        assert!(config.validate().is_err());

        let mut config = oci_config();
        config.presign_ttl_secs = 604_801;
        assert!(config.validate().is_err());

        let mut config = oci_config();
        config.secret_key = None;
        assert!(config.validate().is_err());

        let mut config = oci_config();
        config.bucket = "bad bucket".to_string();
        assert!(config.validate().is_err());

        let mut config = oci_config();
        config.provider = Provider::Oci {
            namespace: String::new(),
            region: "ap-hyderabad-1".to_string(),
        };
        assert!(config.validate().is_err());

        let mut config = oci_config();
        config.max_size_gb = Some(-1.0);
        assert!(config.validate().is_err());

        let mut config = oci_config();
        config.multipart_threshold = MAX_CHUNK_SIZE as u64;
        assert!(config.validate().is_ok());
        config.multipart_threshold = 64 * 1024 * 1024 * 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = oci_config();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("type = \"oci\""));

        let parsed: UploadConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.bucket, "media");
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(
            parsed.secret_key.as_ref().map(|s| s.expose_secret().to_string()),
            Some("secret".to_string())
        );
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let text = r#"
            bucket = "media"
            access_key_id = "access"
            secret_key = "secret"

            [provider]
            type = "custom"
            endpoint = "https://s3.ap-northeast-1.wasabisys.com"
        "#;
        let config: UploadConfig = toml::from_str(text).unwrap();
        assert_eq!(config.max_concurrency, 10);
        assert_eq!(config.provider.signing_region(), "us-east-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let debug = format!("{:?}", oci_config());
        assert!(!debug.contains("\"secret\""));
    }

    #[test]
    fn test_to_s3_config() {
        let s3 = oci_config().to_s3_config().unwrap();
        assert_eq!(s3.bucket, "media");
        assert_eq!(s3.region.as_deref(), Some("ap-hyderabad-1"));
        assert!(s3.force_path_style);
        assert!(s3.has_explicit_credentials());
        assert_eq!(s3.parallel_operations, 10);
    }

    #[test]
    fn test_max_size_bytes() {
        let mut config = oci_config();
        assert_eq!(config.max_size_bytes(), None);
        config.max_size_gb = Some(2.0);
        assert_eq!(config.max_size_bytes(), Some(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn test_verbose_forces_debug() {
        let mut config = oci_config();
        config.verbose = true;
        assert_eq!(config.effective_log_level(), LogLevel::Debug);
    }

    const TWO_DESTINATIONS: &str = r#"
        source_dir = "/data/upload"

        [provider]
        type = "oci"
        namespace = "unused"
        region = "ap-hyderabad-1"

        [[destinations]]
        name = "oci"
        bucket = "media"
        access_key_id = "access"
        secret_key = "secret"
        max_size_gb = 20.0

        [destinations.provider]
        type = "oci"
        namespace = "axaxnpcrorw5"
        region = "ap-hyderabad-1"

        [[destinations]]
        name = "wasabi"
        bucket = "media-backup"
        access_key_id = "wasabi-access"
        secret_key = "wasabi-secret"

        [destinations.provider]
        type = "custom"
        endpoint = "https://s3.ap-northeast-1.wasabisys.com"
        region = "ap-northeast-1"
    "#;

    #[test]
    fn test_destination_list_from_toml() {
        let config: UploadConfig = toml::from_str(TWO_DESTINATIONS).unwrap();
        assert!(config.validate().is_ok());

        let targets = config.targets();
        let names: Vec<_> = targets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["oci", "wasabi"]);
        assert_eq!(targets[0].max_size_bytes(), Some(20 * 1024 * 1024 * 1024));
        assert_eq!(targets[1].max_size_bytes(), None);
        assert!(targets[1].enabled);

        let wasabi = targets[1].to_s3_config(&config).unwrap();
        assert_eq!(wasabi.bucket, "media-backup");
        assert_eq!(wasabi.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(wasabi.parallel_operations, config.max_concurrency);
    }

    #[test]
    fn test_without_list_the_top_level_is_the_only_destination() {
        let config = oci_config();
        let targets = config.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "OCI Object Storage");
        assert_eq!(targets[0].bucket, "media");
    }

    #[test]
    fn test_destination_list_validation() {
        let mut config: UploadConfig = toml::from_str(TWO_DESTINATIONS).unwrap();
        config.destinations[1].name = "oci".to_string();
        assert!(config.validate().is_err());

        let mut config: UploadConfig = toml::from_str(TWO_DESTINATIONS).unwrap();
        config.destinations[1].secret_key = None;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("destination 'wasabi'"));

        // A disabled entry is not checked
        config.destinations[1].enabled = false;
        assert!(config.validate().is_ok());
        assert_eq!(config.targets().len(), 1);

        config.destinations[0].enabled = false;
        assert!(config.validate().is_err());

        let mut config: UploadConfig = toml::from_str(TWO_DESTINATIONS).unwrap();
        config.destinations[0].max_size_gb = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_select_destinations() {
        let mut config: UploadConfig = toml::from_str(TWO_DESTINATIONS).unwrap();
        config.select_destinations(&[]).unwrap();
        assert_eq!(config.targets().len(), 2);

        config
            .select_destinations(&["wasabi".to_string()])
            .unwrap();
        let names: Vec<_> = config.targets().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["wasabi"]);

        assert!(config
            .select_destinations(&["gcs".to_string()])
            .is_err());

        let mut single = oci_config();
        assert!(single
            .select_destinations(&["OCI Object Storage".to_string()])
            .is_ok());
        assert!(single.select_destinations(&["r2".to_string()]).is_err());
    }

    #[test]
    fn test_destination_list_round_trip() {
        let config: UploadConfig = toml::from_str(TWO_DESTINATIONS).unwrap();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[[destinations]]"));

        let parsed: UploadConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.destinations.len(), 2);
        assert_eq!(parsed.destinations[1].provider, config.destinations[1].provider);
    }
}

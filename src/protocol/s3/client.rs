//! S3 client implementation

use super::config::S3Config;
use super::error::{S3Error, S3Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{
    Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as AwsS3Client;
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::debug;

/// Longest validity a SigV4 pre-signed URL may have (7 days)
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(604_800);

/// S3 client for OCI Object Storage and other S3-compatible services
#[derive(Clone)]
pub struct S3Client {
    /// AWS S3 client
    client: AwsS3Client,

    /// Client configuration
    config: S3Config,
}

impl S3Client {
    /// Create a new S3 client with the given configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use oci_uploader::protocol::s3::{S3Client, S3ConfigBuilder};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = S3ConfigBuilder::new("my-bucket".to_string())
    ///         .region("ap-hyderabad-1".to_string())
    ///         .endpoint("https://ns.compat.objectstorage.ap-hyderabad-1.oraclecloud.com".to_string())
    ///         .build()?;
    ///     let client = S3Client::new(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: S3Config) -> S3Result<Self> {
        config.validate()?;

        let client = Self::build_aws_client(&config).await?;

        Ok(Self { client, config })
    }

    /// Build the AWS SDK S3 client from configuration
    async fn build_aws_client(config: &S3Config) -> S3Result<AwsS3Client> {
        let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

        let region_provider = if let Some(region_str) = &config.region {
            RegionProviderChain::first_try(Region::new(region_str.clone()))
        } else {
            RegionProviderChain::default_provider()
        };
        aws_config_loader = aws_config_loader.region(region_provider);

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = Credentials::new(
                access_key,
                secret_key.expose_secret(),
                None,
                None,
                "oci-uploader-explicit",
            );
            aws_config_loader = aws_config_loader.credentials_provider(credentials);
        }

        let aws_config = aws_config_loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        // OCI's compatibility API only understands path-style requests.
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        // S3-compatible stores reject the flexible checksums newer SDKs send by default.
        s3_config_builder = s3_config_builder
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired);

        // Each request is attempted once; a failed file is retried by re-running the batch.
        s3_config_builder = s3_config_builder.retry_config(RetryConfig::disabled());

        let timeout_config = aws_sdk_s3::config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();
        s3_config_builder = s3_config_builder.timeout_config(timeout_config);

        Ok(AwsS3Client::from_conf(s3_config_builder.build()))
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Get a reference to the underlying AWS S3 client
    pub fn aws_client(&self) -> &AwsS3Client {
        &self.client
    }

    /// Check whether the bucket exists with a metadata-only HEAD request
    ///
    /// Returns `Ok(false)` only when the service answers "not found". Every
    /// other failure (permissions, network, timeouts) is an error.
    pub async fn head_bucket(&self) -> S3Result<bool> {
        match self.client.head_bucket().bucket(self.bucket()).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let status = e.raw_response().map(|r| r.status().as_u16());
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);

                if not_found || status == Some(404) {
                    debug!(bucket = %self.bucket(), "Bucket does not exist");
                    Ok(false)
                } else if status == Some(403) {
                    Err(S3Error::AccessDenied(format!(
                        "Cannot access bucket: {}",
                        self.bucket()
                    )))
                } else {
                    Err(S3Error::from(e).context(format!("HeadBucket {}", self.bucket())))
                }
            }
        }
    }

    /// Create the bucket
    pub async fn create_bucket(&self) -> S3Result<()> {
        self.client
            .create_bucket()
            .bucket(self.bucket())
            .send()
            .await
            .map_err(|e| S3Error::from(e).context(format!("CreateBucket {}", self.bucket())))?;
        Ok(())
    }

    /// Generate a pre-signed GET URL for an object
    ///
    /// Signing happens locally; no request is sent. `expires_in` must be
    /// between one second and seven days.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> S3Result<String> {
        if expires_in.is_zero() || expires_in > MAX_PRESIGN_TTL {
            return Err(S3Error::Presign(format!(
                "expiry of {}s is outside 1..={}s",
                expires_in.as_secs(),
                MAX_PRESIGN_TTL.as_secs()
            )));
        }

        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| S3Error::Presign(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(self.bucket())
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| S3Error::Presign(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}

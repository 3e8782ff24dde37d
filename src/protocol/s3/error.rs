//! Error types for S3 operations

use std::io;
use thiserror::Error;

/// Result type alias for S3 operations
pub type S3Result<T> = Result<T, S3Error>;

/// Errors that can occur during S3 operations
#[derive(Error, Debug, Clone)]
pub enum S3Error {
    /// AWS SDK error
    #[error("AWS SDK error: {0}")]
    Sdk(String),

    /// S3 service error with specific error code
    #[error("S3 service error ({code}): {message}")]
    Service { code: String, message: String },

    /// Object not found in bucket
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Bucket not found or not accessible
    #[error("Bucket not found or not accessible: {0}")]
    BucketNotFound(String),

    /// Access denied error
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid bucket name
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Multipart upload error
    #[error("Multipart upload error: {0}")]
    MultipartUpload(String),

    /// Pre-signing a request failed
    #[error("Pre-signing failed: {0}")]
    Presign(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<S3Error>,
    },
}

impl S3Error {
    /// Add context to an error
    pub fn context<S: Into<String>>(self, context: S) -> Self {
        S3Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if error is retryable
    ///
    /// Nothing in this crate retries automatically; the classification only
    /// feeds the failure report so a re-run can be suggested.
    pub fn is_retryable(&self) -> bool {
        match self {
            S3Error::Network(_) => true,
            S3Error::Timeout(_) => true,
            S3Error::Io(_) => true,
            S3Error::Sdk(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("connection reset")
                    || lower.contains("connection timed out")
                    || lower.contains("broken pipe")
                    || lower.contains("connection refused")
                    || lower.contains("temporarily unavailable")
            }
            S3Error::Service { code, .. } => is_retryable_code(code),
            S3Error::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// The innermost error, with any context layers removed
    pub fn root(&self) -> &S3Error {
        match self {
            S3Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short failure class for user-facing messages
    pub fn class(&self) -> &'static str {
        match self.root() {
            S3Error::AccessDenied(_) => "access denied",
            S3Error::Network(_) => "network error",
            S3Error::Timeout(_) => "timed out",
            S3Error::Io(_) => "local I/O error",
            S3Error::NotFound { .. } | S3Error::BucketNotFound(_) => "not found",
            S3Error::Service { .. } => "service error",
            S3Error::InvalidConfig(_) | S3Error::InvalidBucketName(_) => "invalid configuration",
            S3Error::Presign(_) => "signing error",
            S3Error::MultipartUpload(_) => "multipart upload error",
            S3Error::Sdk(_) | S3Error::WithContext { .. } => "client error",
        }
    }
}

impl From<io::Error> for S3Error {
    fn from(err: io::Error) -> Self {
        S3Error::Io(err.to_string())
    }
}

/// Check if an S3 error code is retryable
pub(crate) fn is_retryable_code(code: &str) -> bool {
    matches!(
        code,
        "RequestTimeout"
            | "ServiceUnavailable"
            | "InternalError"
            | "SlowDown"
            | "RequestTimeTooSkewed"
    )
}

/// Convert AWS SDK errors to S3Error
impl<E> From<aws_sdk_s3::error::SdkError<E>> for S3Error
where
    E: std::error::Error + aws_sdk_s3::error::ProvideErrorMetadata + 'static,
{
    fn from(error: aws_sdk_s3::error::SdkError<E>) -> Self {
        use aws_sdk_s3::error::SdkError;

        match error {
            SdkError::DispatchFailure(e) => {
                if e.is_timeout() {
                    S3Error::Timeout(format!("{:?}", e))
                } else {
                    S3Error::Network(format!("Network dispatch failure: {:?}", e))
                }
            }
            SdkError::TimeoutError(e) => S3Error::Timeout(format!("{:?}", e)),
            SdkError::ResponseError(e) => S3Error::Network(format!("Response error: {:?}", e)),
            SdkError::ServiceError(e) => {
                let status = e.raw().status().as_u16();
                let err = e.into_err();
                let code = err.code().map(str::to_string);
                let message = err
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string());

                match code.as_deref() {
                    Some("AccessDenied") | Some("Forbidden") => S3Error::AccessDenied(message),
                    Some(code) => S3Error::Service {
                        code: code.to_string(),
                        message,
                    },
                    None if status == 403 => S3Error::AccessDenied(message),
                    None => S3Error::Service {
                        code: status.to_string(),
                        message,
                    },
                }
            }
            other => S3Error::Sdk(format!("{:?}", other)),
        }
    }
}

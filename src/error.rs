/*!
 * Error types for oci-uploader
 */

use crate::protocol::s3::S3Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, UploadError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum UploadError {
    /// Configuration missing or invalid
    Config(String),

    /// Source directory does not exist
    SourceNotFound(PathBuf),

    /// Source path exists but is not a directory
    SourceNotDirectory(PathBuf),

    /// Bucket existence check failed for a reason other than "not found"
    BucketCheck { bucket: String, source: S3Error },

    /// Bucket did not exist and could not be created
    BucketCreate { bucket: String, source: S3Error },

    /// Batch would push the bucket past its configured size limit
    QuotaExceeded { used: u64, incoming: u64, limit: u64 },

    /// Upload of a single file failed
    Transfer { file: String, source: S3Error },

    /// Pre-signed URL could not be generated for a file
    Presign { file: String, source: S3Error },

    /// Other object store failure (listing, client construction)
    Storage(S3Error),

    /// Local I/O error
    Io(io::Error),

    /// Report could not be serialized
    Serialization(String),
}

impl UploadError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            EXIT_FATAL
        } else {
            EXIT_PARTIAL
        }
    }

    /// Check if this error ends the run
    ///
    /// Per-file failures are collected and the batch continues; everything
    /// else stops before (or instead of) uploading.
    pub fn is_fatal(&self) -> bool {
        match self {
            UploadError::Transfer { .. } | UploadError::Presign { .. } => false,

            UploadError::Config(_)
            | UploadError::SourceNotFound(_)
            | UploadError::SourceNotDirectory(_)
            | UploadError::BucketCheck { .. }
            | UploadError::BucketCreate { .. }
            | UploadError::QuotaExceeded { .. }
            | UploadError::Storage(_)
            | UploadError::Io(_)
            | UploadError::Serialization(_) => true,
        }
    }

    /// Check if this error is transient (a re-run may succeed)
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::BucketCheck { source, .. }
            | UploadError::BucketCreate { source, .. }
            | UploadError::Transfer { source, .. }
            | UploadError::Presign { source, .. }
            | UploadError::Storage(source) => source.is_retryable(),
            UploadError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            UploadError::Config(_) => ErrorCategory::Configuration,
            UploadError::SourceNotFound(_) | UploadError::SourceNotDirectory(_) => {
                ErrorCategory::Validation
            }
            UploadError::QuotaExceeded { .. } => ErrorCategory::Resource,
            UploadError::Io(_) => ErrorCategory::IoError,
            UploadError::Serialization(_) => ErrorCategory::Unknown,
            UploadError::BucketCheck { source, .. }
            | UploadError::BucketCreate { source, .. }
            | UploadError::Transfer { source, .. }
            | UploadError::Presign { source, .. }
            | UploadError::Storage(source) => ErrorCategory::from_s3(source),
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Path validation errors
    Validation,
    /// I/O operation errors
    IoError,
    /// Size limit errors
    Resource,
    /// Configuration errors
    Configuration,
    /// Network/protocol errors
    Network,
    /// Authentication/authorization errors
    Security,
    /// Error reported by the object store service
    Service,
    /// Uncategorized errors
    Unknown,
}

impl ErrorCategory {
    fn from_s3(err: &S3Error) -> Self {
        match err.root() {
            S3Error::AccessDenied(_) => ErrorCategory::Security,
            S3Error::Network(_) | S3Error::Timeout(_) => ErrorCategory::Network,
            S3Error::Io(_) => ErrorCategory::IoError,
            S3Error::InvalidConfig(_) | S3Error::InvalidBucketName(_) => {
                ErrorCategory::Configuration
            }
            S3Error::Service { .. }
            | S3Error::NotFound { .. }
            | S3Error::BucketNotFound(_)
            | S3Error::MultipartUpload(_) => ErrorCategory::Service,
            _ => ErrorCategory::Unknown,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Resource => write!(f, "resource"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::Service => write!(f, "service"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            UploadError::SourceNotFound(path) => {
                write!(f, "Source directory not found: {}", path.display())
            }
            UploadError::SourceNotDirectory(path) => {
                write!(f, "Source is not a directory: {}", path.display())
            }
            UploadError::BucketCheck { bucket, source } => {
                write!(
                    f,
                    "Cannot check bucket '{}' ({}): {}",
                    bucket,
                    source.class(),
                    source
                )
            }
            UploadError::BucketCreate { bucket, source } => {
                write!(
                    f,
                    "Cannot create bucket '{}' ({}): {}",
                    bucket,
                    source.class(),
                    source
                )
            }
            UploadError::QuotaExceeded {
                used,
                incoming,
                limit,
            } => {
                write!(
                    f,
                    "Size limit exceeded: {} bytes stored + {} bytes to upload > {} bytes allowed",
                    used, incoming, limit
                )
            }
            UploadError::Transfer { file, source } => {
                write!(f, "Upload of '{}' failed: {}", file, source)
            }
            UploadError::Presign { file, source } => {
                write!(f, "Pre-signed URL for '{}' failed: {}", file, source)
            }
            UploadError::Storage(source) => {
                write!(f, "Object storage error: {}", source)
            }
            UploadError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            UploadError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Io(err) => Some(err),
            UploadError::BucketCheck { source, .. }
            | UploadError::BucketCreate { source, .. }
            | UploadError::Transfer { source, .. }
            | UploadError::Presign { source, .. }
            | UploadError::Storage(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for UploadError {
    fn from(err: io::Error) -> Self {
        UploadError::Io(err)
    }
}

impl From<S3Error> for UploadError {
    fn from(err: S3Error) -> Self {
        UploadError::Storage(err)
    }
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::Serialization(err.to_string())
    }
}

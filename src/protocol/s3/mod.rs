//! S3-compatible object storage for the uploader
//!
//! Talks to OCI Object Storage's Amazon S3 Compatibility API (and to other
//! S3-compatible services such as Cloudflare R2) through the official AWS
//! SDK for Rust.
//!
//! # Features
//!
//! - Explicit credentials, custom endpoint and path-style addressing
//! - Single `PutObject` below the multipart threshold, concurrent multipart
//!   upload above it, with abort on failure
//! - Byte-level progress reporting through [`ProgressReporter`]
//! - Locally signed pre-signed GET URLs
//! - [`MockStore`] for exercising callers without a network
//!
//! # Example
//!
//! ```ignore
//! use oci_uploader::protocol::s3::{ProgressReporter, S3Client, S3ConfigBuilder, S3Operations};
//! use secrecy::SecretString;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = S3ConfigBuilder::new("media".to_string())
//!         .region("ap-hyderabad-1".to_string())
//!         .endpoint("https://ns.compat.objectstorage.ap-hyderabad-1.oraclecloud.com".to_string())
//!         .credentials("access".to_string(), SecretString::from("secret"))
//!         .build()?;
//!
//!     let client = S3Client::new(config).await?;
//!     if !client.bucket_exists().await? {
//!         client.create_bucket().await?;
//!     }
//!     client
//!         .upload_file(Path::new("photo.jpg"), "photo.jpg", ProgressReporter::disabled())
//!         .await?;
//!     let url = client.presign_get("photo.jpg", Duration::from_secs(3600)).await?;
//!     println!("{}", url);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod multipart;
mod operations;
mod types;

pub mod mock;
pub mod progress;

#[cfg(test)]
mod tests;

// Re-export main types
pub use client::{S3Client, MAX_PRESIGN_TTL};
pub use config::{S3Config, S3ConfigBuilder};
pub(crate) use config::is_valid_bucket_name;
pub use error::{S3Error, S3Result};
pub use mock::{MockFailure, MockStore};
pub use multipart::{effective_chunk_size, plan_parts};
pub use operations::S3Operations;
pub use progress::ProgressReporter;
pub use types::{PartPlan, S3ListResult, S3Object, UploadPartInfo};

/// Files at or above this size use multipart upload (8 MiB)
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Default multipart chunk size (8 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Maximum multipart chunk size (5 GiB)
pub const MAX_CHUNK_SIZE: usize = 5 * 1024 * 1024 * 1024;

/// Minimum multipart chunk size required by S3
pub const MIN_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Default number of parts in flight per file
pub const DEFAULT_PARALLEL_PARTS: usize = 10;

/// Maximum number of parallel operations
pub const MAX_PARALLEL_OPERATIONS: usize = 64;

/// Maximum number of parts in one multipart upload
pub const MAX_PARTS: usize = 10_000;

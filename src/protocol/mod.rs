//! Storage protocols
//!
//! The uploader only speaks the S3 protocol; OCI Object Storage, Cloudflare
//! R2 and the other supported providers are all reached through it.

pub mod s3;

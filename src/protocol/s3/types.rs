//! Type definitions for S3 operations

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Object listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Object {
    /// Object key (path within bucket)
    pub key: String,

    /// Object size in bytes
    pub size: u64,

    /// Last modified timestamp
    pub last_modified: Option<SystemTime>,

    /// ETag (entity tag)
    pub etag: Option<String>,
}

/// Result of listing objects
#[derive(Debug, Clone, Default)]
pub struct S3ListResult {
    /// List of objects
    pub objects: Vec<S3Object>,
}

impl S3ListResult {
    /// Sum of all listed object sizes
    pub fn total_size(&self) -> u64 {
        self.objects.iter().map(|o| o.size).sum()
    }
}

/// A completed part of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPartInfo {
    /// Part number (1-based)
    pub part_number: i32,

    /// ETag returned by the service for this part
    pub etag: String,

    /// Size of the part in bytes
    pub size: usize,
}

impl UploadPartInfo {
    /// Create a new part info entry
    pub fn new(part_number: i32, etag: String, size: usize) -> Self {
        Self {
            part_number,
            etag,
            size,
        }
    }
}

/// Byte range of one part within the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    /// Part number (1-based)
    pub part_number: i32,

    /// Offset of the first byte
    pub offset: u64,

    /// Number of bytes in the part
    pub size: usize,
}

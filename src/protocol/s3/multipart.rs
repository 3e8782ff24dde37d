//! File uploads: single PUT for small files, multipart for large ones

use super::client::S3Client;
use super::error::{S3Error, S3Result};
use super::progress::ProgressReporter;
use super::types::{PartPlan, UploadPartInfo};
use super::MAX_PARTS;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

const MIB: usize = 1024 * 1024;

impl S3Client {
    /// Upload a local file, reporting transferred bytes as they complete
    ///
    /// Files smaller than the configured multipart threshold go out in a
    /// single `PutObject`; anything larger is split into parts of
    /// `chunk_size` bytes with at most `parallel_operations` parts in flight.
    ///
    /// Returns the number of bytes uploaded.
    pub async fn upload_file_with_progress(
        &self,
        local_path: &Path,
        key: &str,
        progress: &ProgressReporter,
    ) -> S3Result<u64> {
        let file_size = tokio::fs::metadata(local_path).await?.len();

        if file_size < self.config().multipart_threshold {
            self.put_small_file(local_path, key, file_size, progress)
                .await?;
        } else {
            self.upload_file_multipart(local_path, key, file_size, progress)
                .await?;
        }
        Ok(file_size)
    }

    /// Send a file below the multipart threshold in one `PutObject`
    ///
    /// The body is streamed from disk rather than read into memory.
    async fn put_small_file(
        &self,
        local_path: &Path,
        key: &str,
        size: u64,
        progress: &ProgressReporter,
    ) -> S3Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| S3Error::Io(e.to_string()))?;

        self.aws_client()
            .put_object()
            .bucket(self.bucket())
            .key(key)
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| S3Error::from(e).context(format!("PutObject {}", key)))?;

        progress.report(size);
        Ok(())
    }

    /// Upload a large file using multipart upload
    ///
    /// Any failure after the upload has been initiated aborts it, so no
    /// orphaned parts are left behind in the bucket.
    pub async fn upload_file_multipart(
        &self,
        local_path: &Path,
        key: &str,
        file_size: u64,
        progress: &ProgressReporter,
    ) -> S3Result<()> {
        let chunk_size = effective_chunk_size(file_size, self.config().chunk_size);
        let parts = plan_parts(file_size, chunk_size);

        let upload_id = self.initiate_multipart_upload(key).await?;
        debug!(
            key,
            upload_id = %upload_id,
            parts = parts.len(),
            chunk_size,
            "Started multipart upload"
        );

        let completed = match self
            .upload_parts(local_path, key, &upload_id, &parts, progress)
            .await
        {
            Ok(mut completed) => {
                completed.sort_by_key(|p| p.part_number);
                completed
            }
            Err(e) => {
                self.abort_quietly(key, &upload_id).await;
                return Err(e);
            }
        };

        if let Err(e) = self
            .complete_multipart_upload(key, &upload_id, &completed)
            .await
        {
            self.abort_quietly(key, &upload_id).await;
            return Err(e);
        }

        Ok(())
    }

    async fn upload_parts(
        &self,
        local_path: &Path,
        key: &str,
        upload_id: &str,
        parts: &[PartPlan],
        progress: &ProgressReporter,
    ) -> S3Result<Vec<UploadPartInfo>> {
        let concurrency = self.config().parallel_operations.max(1);

        let mut in_flight = stream::iter(parts.iter().copied().map(|plan| async move {
            let data = read_part(local_path, plan).await?;
            let info = self
                .upload_part(key, upload_id, plan.part_number, data)
                .await?;
            progress.report(info.size as u64);
            Ok::<_, S3Error>(info)
        }))
        .buffer_unordered(concurrency);

        let mut completed = Vec::with_capacity(parts.len());
        while let Some(result) = in_flight.next().await {
            completed.push(result?);
        }

        Ok(completed)
    }

    /// Initiate a multipart upload
    async fn initiate_multipart_upload(&self, key: &str) -> S3Result<String> {
        let response = self
            .aws_client()
            .create_multipart_upload()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| S3Error::from(e).context(format!("CreateMultipartUpload {}", key)))?;

        response
            .upload_id()
            .ok_or_else(|| S3Error::MultipartUpload("No upload ID returned".to_string()))
            .map(|s| s.to_string())
    }

    /// Upload a single part
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> S3Result<UploadPartInfo> {
        let size = data.len();

        let response = self
            .aws_client()
            .upload_part()
            .bucket(self.bucket())
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(size as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| S3Error::from(e).context(format!("UploadPart {} of {}", part_number, key)))?;

        let etag = response
            .e_tag()
            .ok_or_else(|| S3Error::MultipartUpload("No ETag returned for part".to_string()))?
            .to_string();

        Ok(UploadPartInfo::new(part_number, etag, size))
    }

    /// Complete a multipart upload
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadPartInfo],
    ) -> S3Result<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.aws_client()
            .complete_multipart_upload()
            .bucket(self.bucket())
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(multipart_upload)
            .send()
            .await
            .map_err(|e| S3Error::from(e).context(format!("CompleteMultipartUpload {}", key)))?;

        Ok(())
    }

    /// Abort a multipart upload
    pub async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> S3Result<()> {
        self.aws_client()
            .abort_multipart_upload()
            .bucket(self.bucket())
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(S3Error::from)?;

        Ok(())
    }

    async fn abort_quietly(&self, key: &str, upload_id: &str) {
        if let Err(e) = self.abort_multipart_upload(key, upload_id).await {
            warn!(key, upload_id, error = %e, "Failed to abort multipart upload");
        }
    }
}

/// Read one part of the file into memory
async fn read_part(local_path: &Path, plan: PartPlan) -> S3Result<Bytes> {
    let mut file = File::open(local_path).await?;
    file.seek(std::io::SeekFrom::Start(plan.offset)).await?;

    let mut buffer = vec![0u8; plan.size];
    file.read_exact(&mut buffer).await?;

    Ok(Bytes::from(buffer))
}

/// Chunk size actually used for a file
///
/// S3 allows at most [`MAX_PARTS`] parts per upload; larger files get a
/// bigger chunk, rounded up to a whole MiB.
pub fn effective_chunk_size(file_size: u64, chunk_size: usize) -> usize {
    let chunk_size = chunk_size.max(1);
    let parts_needed = file_size.div_ceil(chunk_size as u64);

    if parts_needed <= MAX_PARTS as u64 {
        return chunk_size;
    }

    let min_chunk = file_size.div_ceil(MAX_PARTS as u64) as usize;
    min_chunk.div_ceil(MIB) * MIB
}

/// Split a file of `file_size` bytes into consecutive parts
pub fn plan_parts(file_size: u64, chunk_size: usize) -> Vec<PartPlan> {
    let chunk = chunk_size.max(1) as u64;
    let mut parts = Vec::with_capacity(file_size.div_ceil(chunk) as usize);

    let mut offset = 0u64;
    let mut part_number = 1i32;
    while offset < file_size {
        let size = chunk.min(file_size - offset);
        parts.push(PartPlan {
            part_number,
            offset,
            size: size as usize,
        });
        offset += size;
        part_number += 1;
    }

    parts
}

//! Live tests against a real S3-compatible service
//!
//! Skipped unless `S3_TESTS_ENABLED=1`. Configure with:
//!
//! - `S3_TEST_BUCKET`: bucket to use (created if missing)
//! - `S3_TEST_REGION`: signing region
//! - `S3_TEST_ENDPOINT`: compatibility endpoint URL
//! - `S3_TEST_ACCESS_KEY` / `S3_TEST_SECRET_KEY`: credentials

use super::*;
use secrecy::SecretString;
use std::env;
use std::io::Write;
use std::time::Duration;

fn s3_tests_enabled() -> bool {
    env::var("S3_TESTS_ENABLED").unwrap_or_default() == "1"
}

fn get_test_config() -> S3Config {
    let bucket =
        env::var("S3_TEST_BUCKET").unwrap_or_else(|_| "oci-uploader-test-bucket".to_string());

    let mut config = S3Config::new(bucket);
    config.region = env::var("S3_TEST_REGION").ok();
    config.endpoint = env::var("S3_TEST_ENDPOINT").ok();
    config.access_key = env::var("S3_TEST_ACCESS_KEY").ok();
    config.secret_key = env::var("S3_TEST_SECRET_KEY").ok().map(SecretString::from);
    config
}

async fn ready_client() -> S3Client {
    let client = S3Client::new(get_test_config()).await.unwrap();
    if !client.head_bucket().await.unwrap() {
        client.create_bucket().await.unwrap();
    }
    client
}

#[tokio::test]
#[ignore]
async fn test_connection() {
    if !s3_tests_enabled() {
        return;
    }

    let client = ready_client().await;
    assert!(client.head_bucket().await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_small_upload_and_presign() {
    if !s3_tests_enabled() {
        return;
    }

    let client = ready_client().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"hello from the uploader").unwrap();

    let (reporter, mut receiver) = ProgressReporter::new();
    S3Operations::upload_file(&client, file.path(), "live-small.txt", reporter)
        .await
        .unwrap();

    let mut reported = 0;
    while let Ok(n) = receiver.try_recv() {
        reported += n;
    }
    assert_eq!(reported, 23);

    let url = client
        .presign_get("live-small.txt", Duration::from_secs(300))
        .await
        .unwrap();
    assert!(url.contains("X-Amz-Signature="));

    let listed = client.list_objects("live-small").await.unwrap();
    assert!(listed.objects.iter().any(|o| o.key == "live-small.txt"));
}

#[tokio::test]
#[ignore]
async fn test_multipart_upload() {
    if !s3_tests_enabled() {
        return;
    }

    let client = ready_client().await;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let data = vec![42u8; DEFAULT_MULTIPART_THRESHOLD as usize + MIN_CHUNK_SIZE];
    file.write_all(&data).unwrap();

    let (reporter, mut receiver) = ProgressReporter::new();
    let uploaded = client
        .upload_file_with_progress(file.path(), "live-multipart.bin", &reporter)
        .await
        .unwrap();
    drop(reporter);

    let mut reported = 0;
    while let Some(n) = receiver.recv().await {
        reported += n;
    }
    assert_eq!(uploaded, data.len() as u64);
    assert_eq!(reported, data.len() as u64);
}

//! S3 object transfer helpers.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Downloads an S3 object to a local file.
pub async fn download_object(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    dest: &Path,
) -> Result<()> {
    let object = client.get_object().bucket(bucket).key(key).send().await?;

    let bytes = object.body.collect().await?.into_bytes();
    debug!(bytes = bytes.len(), dest = %dest.display(), "Object downloaded");

    tokio::fs::write(dest, &bytes).await?;
    Ok(())
}

/// Serializes a value to pretty JSON and uploads it to an S3 bucket with
/// `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await?;

    Ok(())
}

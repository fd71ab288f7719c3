//! S3 object-created notification handling.
//!
//! Downloads the notified CSV, runs the aggregation, and uploads the JSON
//! report back to the same bucket under a derived key.

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::aggregate::aggregate_file;
use crate::transfer::{download_object, write_json_to_s3};

/// Key prefix for uploaded reports when `OUTPUT_PREFIX` is not set.
pub const DEFAULT_OUTPUT_PREFIX: &str = "output/";

#[derive(Debug, Deserialize)]
struct S3Event {
    #[serde(rename = "Records")]
    records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Outcome reported back to the invoking host.
#[derive(Debug, PartialEq, Eq)]
pub struct EventResponse {
    pub status_code: u16,
    pub body: String,
}

/// Extracts (bucket, key) from the first record of a notification payload.
///
/// Returns `None` when the payload is not valid notification JSON or carries
/// no records.
pub fn source_object(raw: &str) -> Option<(String, String)> {
    let event: S3Event = serde_json::from_str(raw).ok()?;
    let record = event.records.into_iter().next()?;
    Some((record.s3.bucket.name, record.s3.object.key))
}

/// Derives the upload key for a processed object: the configured prefix
/// followed by `resultado_<original-file-name>.json`.
pub fn destination_key(output_prefix: &str, source_key: &str) -> String {
    format!("{}resultado_{}.json", output_prefix, basename(source_key))
}

fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Handles one S3 notification end to end.
///
/// A structurally invalid notification is a client error: it is logged and
/// reported as a 400 response without any processing. Download, aggregation,
/// and upload failures propagate as errors so the host can apply its own
/// retry and alerting policy.
pub async fn handle_notification(
    client: &aws_sdk_s3::Client,
    raw_event: &str,
    output_prefix: &str,
) -> Result<EventResponse> {
    info!("Processing S3 event notification");

    let Some((bucket, key)) = source_object(raw_event) else {
        error!("Malformed event notification structure");
        return Ok(EventResponse {
            status_code: 400,
            body: "invalid event".to_string(),
        });
    };

    info!(bucket = %bucket, key = %key, "Input object received");

    let file_name = basename(&key);
    let download_path = std::env::temp_dir().join(file_name);

    download_object(client, &bucket, &key, &download_path).await?;
    info!(path = %download_path.display(), "Download complete");

    let report = aggregate_file(&download_path)?;

    let dest_key = destination_key(output_prefix, &key);
    write_json_to_s3(client, &bucket, &dest_key, &report).await?;
    info!(bucket = %bucket, key = %dest_key, "Upload complete");

    Ok(EventResponse {
        status_code: 200,
        body: "processing completed successfully".to_string(),
    })
}

/// Reads the configured output prefix from the environment, falling back to
/// [`DEFAULT_OUTPUT_PREFIX`].
pub fn output_prefix_from_env() -> String {
    std::env::var("OUTPUT_PREFIX").unwrap_or_else(|_| DEFAULT_OUTPUT_PREFIX.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_object_valid_event() {
        let raw = r#"{
            "Records": [
                {
                    "eventName": "ObjectCreated:Put",
                    "s3": {
                        "bucket": { "name": "fipe-data", "arn": "arn:aws:s3:::fipe-data" },
                        "object": { "key": "incoming/tabela.csv", "size": 1024 }
                    }
                }
            ]
        }"#;

        assert_eq!(
            source_object(raw),
            Some(("fipe-data".to_string(), "incoming/tabela.csv".to_string()))
        );
    }

    #[test]
    fn test_source_object_takes_first_record() {
        let raw = r#"{
            "Records": [
                { "s3": { "bucket": { "name": "a" }, "object": { "key": "one.csv" } } },
                { "s3": { "bucket": { "name": "b" }, "object": { "key": "two.csv" } } }
            ]
        }"#;

        assert_eq!(source_object(raw), Some(("a".to_string(), "one.csv".to_string())));
    }

    #[test]
    fn test_source_object_rejects_empty_records() {
        assert_eq!(source_object(r#"{ "Records": [] }"#), None);
    }

    #[test]
    fn test_source_object_rejects_missing_fields() {
        assert_eq!(source_object(r#"{ "Records": [ { "s3": {} } ] }"#), None);
        assert_eq!(source_object(r#"{}"#), None);
        assert_eq!(source_object("not json"), None);
    }

    #[test]
    fn test_destination_key_default_prefix() {
        assert_eq!(
            destination_key(DEFAULT_OUTPUT_PREFIX, "incoming/tabela-fipe.csv"),
            "output/resultado_tabela-fipe.csv.json"
        );
    }

    #[test]
    fn test_destination_key_unnested_source() {
        assert_eq!(
            destination_key("reports/", "data.csv"),
            "reports/resultado_data.csv.json"
        );
    }
}

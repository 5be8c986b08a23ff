#![doc = "S3-compatible storage client: implements the core `ObjectStore` trait over aws-sdk-s3."]
//
//! # Storage Integration (CLI <-> Core)
//!
//! This module wires the [`ObjectStore`] trait from `watch-upload-core` to a
//! real S3-compatible endpoint (MinIO or AWS) through `aws-sdk-s3`.
//!
//! - Construct [`S3Store`] from a [`StorageConfig`]: static credentials,
//!   explicit region, path-style addressing.
//! - Every SDK failure is converted into a [`StorageError`] carrying the
//!   operation name, so the handler can report it verbatim.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use watch_upload_core::config::StorageConfig;
use watch_upload_core::contract::{ObjectStore, StorageError};

pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client for the configured endpoint. No request is sent here.
    pub async fn connect(config: &StorageConfig) -> Self {
        let endpoint_url = config.endpoint_url();
        tracing::info!(
            endpoint = %endpoint_url,
            region = %config.region,
            access_key_set = !config.access_key.is_empty(),
            "Initializing S3 storage client"
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(&endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        S3Store {
            client: Client::from_conf(s3_config),
        }
    }
}

fn request_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> StorageError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    StorageError::request(operation, DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        tracing::debug!(bucket, "Checking bucket");
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(e)) if e.err().is_not_found() => Ok(false),
            Err(SdkError::ServiceError(e)) if e.raw().status().as_u16() == 404 => Ok(false),
            Err(e) => {
                tracing::error!(bucket, error = %DisplayErrorContext(&e), "HeadBucket failed");
                Err(request_error("HeadBucket", e))
            }
        }
    }

    async fn make_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        tracing::info!(bucket, "Creating bucket");
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(bucket, error = %DisplayErrorContext(&e), "CreateBucket failed");
                request_error("CreateBucket", e)
            })?;
        Ok(())
    }

    async fn put_file(&self, bucket: &str, key: &str, source: &Path) -> Result<(), StorageError> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::Io {
                path: source.to_path_buf(),
                source: std::io::Error::other(e),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(bucket, key, error = %DisplayErrorContext(&e), "PutObject failed");
                request_error("PutObject", e)
            })?;
        tracing::debug!(bucket, key, "PutObject succeeded");
        Ok(())
    }
}

//! MinIO/S3-compatible image store
//!
//! Objects are keyed `{prefix}/{public_id}` where the public id is a fresh
//! UUID followed by the original file extension.

use std::path::Path;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::config::MinIOConfig;
use crate::core::error::{AppError, Result};
use crate::modules::storage::provider::{content_type_for, ImageBlobProvider, StoredBlob};

pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    image_prefix: String,
}

impl MinIOClient {
    pub async fn new(config: MinIOConfig) -> Result<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            image_prefix: config.image_prefix,
        };

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.image_prefix
        );

        Ok(client)
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<()> {
        let created = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match created {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
            }
        }
        Ok(())
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    fn object_key(&self, public_id: &str) -> String {
        if self.image_prefix.is_empty() {
            public_id.to_string()
        } else {
            format!("{}/{}", self.image_prefix, public_id)
        }
    }
}

/// New public id: UUID plus the lowercased extension of the source file
fn new_public_id(local_path: &Path) -> String {
    let ext = local_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}{}", Uuid::new_v4(), ext)
}

fn ensure_success(status: u16, action: &str, key: &str) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        404 => Err(AppError::NotFound(format!("Image '{}' not found in storage", key))),
        _ => Err(AppError::Storage(format!(
            "Failed to {} '{}': HTTP {}",
            action, key, status
        ))),
    }
}

#[async_trait]
impl ImageBlobProvider for MinIOClient {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to read upload '{}': {}",
                local_path.display(),
                e
            ))
        })?;

        let public_id = new_public_id(local_path);
        let key = self.object_key(&public_id);
        let content_type = content_type_for(&public_id);

        let response = self
            .bucket
            .put_object_with_content_type(&key, &data, &content_type)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload '{}': {}", key, e)))?;
        ensure_success(response.status_code(), "upload", &key)?;

        debug!(
            "Uploaded image '{}' ({} bytes) to bucket '{}'",
            key,
            data.len(),
            self.bucket.name()
        );
        Ok(public_id)
    }

    async fn download(&self, public_id: &str) -> Result<StoredBlob> {
        let key = self.object_key(public_id);
        let response = self
            .bucket
            .get_object(&key)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to download '{}': {}", key, e)))?;
        ensure_success(response.status_code(), "download", &key)?;

        debug!("Downloaded image '{}' from bucket '{}'", key, self.bucket.name());
        Ok(StoredBlob {
            bytes: response.to_vec(),
            content_type: content_type_for(public_id),
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let key = self.object_key(public_id);
        let response = self
            .bucket
            .delete_object(&key)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete '{}': {}", key, e)))?;
        ensure_success(response.status_code(), "delete", &key)?;

        debug!("Deleted image '{}' from bucket '{}'", key, self.bucket.name());
        Ok(())
    }
}

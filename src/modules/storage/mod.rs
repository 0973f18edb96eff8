//! Image blob storage
//!
//! Defines the provider seam used by the catalog and its MinIO/S3-backed
//! implementation.

mod minio_client;
mod provider;

pub use minio_client::MinIOClient;
pub use provider::{content_type_for, ImageBlobProvider, StoredBlob};

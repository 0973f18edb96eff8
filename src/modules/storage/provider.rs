use std::path::Path;

use async_trait::async_trait;

use crate::core::error::Result;

/// Image bytes fetched back from storage
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Opaque blob store for product images.
///
/// `upload` returns the public id the blob is later addressed by.
#[async_trait]
pub trait ImageBlobProvider: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<String>;

    async fn download(&self, public_id: &str) -> Result<StoredBlob>;

    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// MIME type derived from the file extension of a path or public id
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

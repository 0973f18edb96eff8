use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::products::models::ProductImage;
use crate::shared::utils::build_image_url;

/// Response DTO for a product image
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductImageResponseDto {
    pub id: i64,
    pub public_id: String,
    /// Display URL derived from the request host
    pub image_url: String,
    pub is_cover: bool,
    pub created_at: DateTime<Utc>,
}

impl ProductImageResponseDto {
    pub fn from_image(image: ProductImage, host: &str) -> Self {
        Self {
            id: image.id,
            image_url: build_image_url(host, &image.public_id),
            public_id: image.public_id,
            is_cover: image.is_cover,
            created_at: image.created_at,
        }
    }
}

/// Multipart upload form for OpenAPI documentation only.
/// The handler reads axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadImagesDto {
    /// Up to five image files, repeated under the same field name
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub images: Vec<String>,
}

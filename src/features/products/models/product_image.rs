use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::core::error::{AppError, Result};
use crate::shared::constants::MAX_IMAGES_PER_PRODUCT;

/// Database model for a product image record
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    /// URL captured at upload time; responses derive a fresh one from the request host
    pub image_url: String,
    /// Opaque storage key
    pub public_id: String,
    pub is_cover: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Blob that has been stored but not yet attached to a product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

/// Rejects a batch that would leave the product with more than the allowed images
pub fn ensure_image_capacity(existing: usize, incoming: usize) -> Result<()> {
    if existing + incoming > MAX_IMAGES_PER_PRODUCT {
        return Err(AppError::LimitExceeded(format!(
            "A product can have at most {} images ({} existing, {} new)",
            MAX_IMAGES_PER_PRODUCT, existing, incoming
        )));
    }
    Ok(())
}

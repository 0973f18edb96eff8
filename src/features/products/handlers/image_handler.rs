use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::core::extractor::RequestHost;
use crate::features::auth::guards::RequireAdmin;
use crate::features::products::dtos::{ProductImageResponseDto, UploadImagesDto};
use crate::features::products::services::ProductService;
use crate::shared::constants::{
    ALLOWED_IMAGE_TYPES, IMAGES_FIELD, MAX_IMAGES_PER_PRODUCT, MAX_IMAGE_SIZE,
};
use crate::shared::types::{ApiResponse, Meta};

/// Upload images for a product (admin only)
///
/// Accepts multipart/form-data with up to five files under the `images` field.
#[utoipa::path(
    patch,
    path = "/api/admin/products/{slug}/images",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    request_body(
        content = UploadImagesDto,
        content_type = "multipart/form-data",
        description = "Image files repeated under the `images` field",
    ),
    responses(
        (status = 201, description = "Images attached", body = ApiResponse<Vec<ProductImageResponseDto>>),
        (status = 400, description = "Missing, oversized or unsupported file"),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Product would exceed the image limit"),
        (status = 502, description = "Storage failure")
    ),
    tag = "images",
    security(("bearer_auth" = []))
)]
pub async fn upload_product_images(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ProductImageResponseDto>>>)> {
    // Temp files are removed when dropped, after the service has uploaded them
    let mut files: Vec<NamedTempFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != IMAGES_FIELD {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        if files.len() == MAX_IMAGES_PER_PRODUCT {
            return Err(AppError::LimitExceeded(format!(
                "At most {} images can be uploaded at once",
                MAX_IMAGES_PER_PRODUCT
            )));
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        // The stored key, and so the served type, follows the checked content type only
        let extension = image_extension(&content_type).ok_or_else(|| {
            AppError::BadRequest(format!(
                "File type '{}' is not allowed. Allowed types: {}",
                content_type,
                ALLOWED_IMAGE_TYPES.join(", ")
            ))
        })?;

        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;
        if data.len() > MAX_IMAGE_SIZE {
            return Err(AppError::BadRequest(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                MAX_IMAGE_SIZE,
                MAX_IMAGE_SIZE / 1024 / 1024
            )));
        }

        files.push(write_temp_file(&data, extension).await?);
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(format!(
            "At least one file is required in the '{}' field",
            IMAGES_FIELD
        )));
    }

    let paths: Vec<PathBuf> = files.iter().map(|f| f.path().to_path_buf()).collect();
    let images = service.upload_product_images(&slug, &paths, &host).await?;
    drop(files);

    let items = images
        .into_iter()
        .map(|i| ProductImageResponseDto::from_image(i, &host))
        .collect();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(items),
            Some("Images uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// List images of an available product
#[utoipa::path(
    get,
    path = "/api/products/{slug}/images",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product images", body = ApiResponse<Vec<ProductImageResponseDto>>),
        (status = 404, description = "Product not found")
    ),
    tag = "images"
)]
pub async fn get_product_images(
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<ProductImageResponseDto>>>> {
    let images = service.get_product_images(&slug).await?;
    let total = images.len() as i64;
    let items = images
        .into_iter()
        .map(|i| ProductImageResponseDto::from_image(i, &host))
        .collect();

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Make an image the product's cover (admin only)
#[utoipa::path(
    patch,
    path = "/api/admin/products/{slug}/cover/{public_id}",
    params(
        ("slug" = String, Path, description = "Product slug"),
        ("public_id" = String, Path, description = "Image public id")
    ),
    responses(
        (status = 200, description = "Cover image set"),
        (status = 400, description = "Image does not belong to the product")
    ),
    tag = "images",
    security(("bearer_auth" = []))
)]
pub async fn set_cover_image(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    Path((slug, public_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<()>>> {
    service.set_image_as_cover(&public_id, &slug).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Cover image updated successfully".to_string()),
        None,
    )))
}

/// Delete an image from storage and from its product (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/images/{public_id}",
    params(
        ("public_id" = String, Path, description = "Image public id")
    ),
    responses(
        (status = 200, description = "Image deleted"),
        (status = 404, description = "Image not found"),
        (status = 502, description = "Storage failure")
    ),
    tag = "images",
    security(("bearer_auth" = []))
)]
pub async fn delete_image(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    Path(public_id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete_image(&public_id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Image deleted successfully".to_string()),
        None,
    )))
}

/// Serve image bytes
#[utoipa::path(
    get,
    path = "/image/{public_id}",
    params(
        ("public_id" = String, Path, description = "Image public id")
    ),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Image not found")
    ),
    tag = "images"
)]
pub async fn get_image(
    State(service): State<Arc<ProductService>>,
    Path(public_id): Path<String>,
) -> Result<Response> {
    let blob = service.get_image(&public_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CONTENT_DISPOSITION, "inline".to_string()),
        ],
        blob.bytes,
    )
        .into_response())
}

/// Storage extension for an accepted image type
fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

async fn write_temp_file(data: &[u8], extension: &str) -> Result<NamedTempFile> {
    let file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", extension))
        .tempfile()
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {}", e)))?;

    tokio::fs::write(file.path(), data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to write temp file: {}", e)))?;

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::content_type_for;

    #[test]
    fn test_image_extension_serves_back_as_declared_type() {
        for content_type in ALLOWED_IMAGE_TYPES {
            let extension = image_extension(content_type).unwrap();
            assert_eq!(content_type_for(&format!("abc.{}", extension)), *content_type);
        }
        assert_eq!(image_extension("text/html"), None);
        assert_eq!(image_extension("image/svg+xml"), None);
    }

    #[tokio::test]
    async fn test_temp_file_keeps_extension_and_bytes() {
        let file = write_temp_file(b"abc", "webp").await.unwrap();
        assert_eq!(
            file.path().extension().and_then(|e| e.to_str()),
            Some("webp")
        );
        assert_eq!(tokio::fs::read(file.path()).await.unwrap(), b"abc");
    }
}

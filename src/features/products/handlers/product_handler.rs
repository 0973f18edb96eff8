use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, RequestHost};
use crate::features::auth::guards::RequireAdmin;
use crate::features::products::dtos::{
    AdminProductResponseDto, CreateProductDto, LinkCategoriesQuery, ProductListQuery,
    ProductResponseDto, StockChangeDto, UpdateProductDto,
};
use crate::features::products::services::ProductService;
use crate::shared::types::{ApiResponse, Meta};
use crate::shared::utils::parse_id_list;

/// List available products
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Page of available products", body = ApiResponse<Vec<ProductResponseDto>>),
        (status = 400, description = "Malformed category id list")
    ),
    tag = "products"
)]
pub async fn list_products(
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ApiResponse<Vec<ProductResponseDto>>>> {
    let (products, total) = service.list_products(query.into_filter(true)?).await?;
    let items = products
        .into_iter()
        .map(|p| ProductResponseDto::from_product(p, &host))
        .collect();

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Get an available product by slug
#[utoipa::path(
    get,
    path = "/api/products/{slug}",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<ProductResponseDto>),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn get_product(
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductResponseDto>>> {
    let product = service.get_product(&slug).await?;
    Ok(Json(ApiResponse::success(
        Some(ProductResponseDto::from_product(product, &host)),
        None,
        None,
    )))
}

/// List every product, available or not (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Page of products", body = ApiResponse<Vec<AdminProductResponseDto>>),
        (status = 403, description = "Admin access required")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn list_admin_products(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ApiResponse<Vec<AdminProductResponseDto>>>> {
    let (products, total) = service
        .list_products_for_admin(query.into_filter(false)?)
        .await?;
    let items = products
        .into_iter()
        .map(|p| AdminProductResponseDto::from_product(p, &host))
        .collect();

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Get any product by slug (admin only)
#[utoipa::path(
    get,
    path = "/api/admin/products/{slug}",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<AdminProductResponseDto>),
        (status = 404, description = "Product not found")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn get_admin_product(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<AdminProductResponseDto>>> {
    let product = service.get_product_for_admin(&slug).await?;
    Ok(Json(ApiResponse::success(
        Some(AdminProductResponseDto::from_product(product, &host)),
        None,
        None,
    )))
}

/// Create a product (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductDto,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<AdminProductResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Category does not exist"),
        (status = 409, description = "Slug already taken")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    AppJson(dto): AppJson<CreateProductDto>,
) -> Result<(StatusCode, Json<ApiResponse<AdminProductResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product = service.create_product(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(AdminProductResponseDto::from_product(product, &host)),
            Some("Product created successfully".to_string()),
            None,
        )),
    ))
}

/// Overwrite a product's fields and categories (admin only)
#[utoipa::path(
    put,
    path = "/api/admin/products/{slug}",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    request_body = UpdateProductDto,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<AdminProductResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Product or category not found")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
    AppJson(dto): AppJson<UpdateProductDto>,
) -> Result<Json<ApiResponse<AdminProductResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product = service.update_product(&slug, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(AdminProductResponseDto::from_product(product, &host)),
        Some("Product updated successfully".to_string()),
        None,
    )))
}

/// Delete a product together with its images (admin only)
#[utoipa::path(
    delete,
    path = "/api/admin/products/{slug}",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found"),
        (status = 502, description = "An image could not be removed from storage")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn delete_product(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete_product(&slug).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Product deleted successfully".to_string()),
        None,
    )))
}

/// Replace the product's categories (admin only)
///
/// `ids` is a comma-separated list; an empty value removes every category.
#[utoipa::path(
    patch,
    path = "/api/admin/products/{slug}/categories",
    params(
        ("slug" = String, Path, description = "Product slug"),
        LinkCategoriesQuery
    ),
    responses(
        (status = 200, description = "Categories replaced", body = ApiResponse<AdminProductResponseDto>),
        (status = 400, description = "Missing or malformed id list"),
        (status = 404, description = "Product or category not found")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn update_product_categories(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
    Query(query): Query<LinkCategoriesQuery>,
) -> Result<Json<ApiResponse<AdminProductResponseDto>>> {
    let raw = query
        .ids
        .ok_or_else(|| AppError::BadRequest("Query parameter 'ids' is required".to_string()))?;
    let ids = parse_id_list(&raw)?;

    let product = service.update_product_categories(&slug, &ids).await?;
    Ok(Json(ApiResponse::success(
        Some(AdminProductResponseDto::from_product(product, &host)),
        Some("Product categories updated successfully".to_string()),
        None,
    )))
}

/// Toggle whether the product is publicly listed (admin only)
#[utoipa::path(
    patch,
    path = "/api/admin/products/{slug}/availability",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Availability switched", body = ApiResponse<AdminProductResponseDto>),
        (status = 404, description = "Product not found")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn switch_availability(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<AdminProductResponseDto>>> {
    let product = service.switch_available(&slug).await?;
    Ok(Json(ApiResponse::success(
        Some(AdminProductResponseDto::from_product(product, &host)),
        None,
        None,
    )))
}

/// Add stock (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/products/{slug}/stock/entry",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    request_body = StockChangeDto,
    responses(
        (status = 200, description = "Stock increased", body = ApiResponse<AdminProductResponseDto>),
        (status = 400, description = "Quantity must be positive"),
        (status = 404, description = "Product not found")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn stock_entry(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
    AppJson(dto): AppJson<StockChangeDto>,
) -> Result<Json<ApiResponse<AdminProductResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product = service.stock_entry(&slug, dto.quantity).await?;
    Ok(Json(ApiResponse::success(
        Some(AdminProductResponseDto::from_product(product, &host)),
        None,
        None,
    )))
}

/// Remove stock (admin only)
#[utoipa::path(
    post,
    path = "/api/admin/products/{slug}/stock/out",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    request_body = StockChangeDto,
    responses(
        (status = 200, description = "Stock decreased", body = ApiResponse<AdminProductResponseDto>),
        (status = 400, description = "Quantity must be positive"),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Not enough stock")
    ),
    tag = "products",
    security(("bearer_auth" = []))
)]
pub async fn stock_out(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<ProductService>>,
    RequestHost(host): RequestHost,
    Path(slug): Path<String>,
    AppJson(dto): AppJson<StockChangeDto>,
) -> Result<Json<ApiResponse<AdminProductResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let product = service.stock_out(&slug, dto.quantity).await?;
    Ok(Json(ApiResponse::success(
        Some(AdminProductResponseDto::from_product(product, &host)),
        None,
        None,
    )))
}

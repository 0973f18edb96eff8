use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::features::products::handlers;
use crate::features::products::services::ProductService;
use crate::shared::constants::{MAX_IMAGES_PER_PRODUCT, MAX_IMAGE_SIZE};

/// Public product and image routes (no authentication required)
pub fn public_routes(service: Arc<ProductService>) -> Router {
    Router::new()
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/{slug}", get(handlers::get_product))
        .route("/api/products/{slug}/images", get(handlers::get_product_images))
        .route("/image/{public_id}", get(handlers::get_image))
        .with_state(service)
}

/// Admin product and image routes (require JWT authentication and the admin role)
pub fn admin_routes(service: Arc<ProductService>) -> Router {
    Router::new()
        .route(
            "/api/admin/products",
            get(handlers::list_admin_products).post(handlers::create_product),
        )
        .route(
            "/api/admin/products/{slug}",
            get(handlers::get_admin_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/api/admin/products/{slug}/images",
            // A full batch of images plus multipart overhead
            patch(handlers::upload_product_images).layer(DefaultBodyLimit::max(
                MAX_IMAGE_SIZE * MAX_IMAGES_PER_PRODUCT + 1024 * 1024,
            )),
        )
        .route(
            "/api/admin/products/{slug}/categories",
            patch(handlers::update_product_categories),
        )
        .route(
            "/api/admin/products/{slug}/cover/{public_id}",
            patch(handlers::set_cover_image),
        )
        .route(
            "/api/admin/products/{slug}/availability",
            patch(handlers::switch_availability),
        )
        .route(
            "/api/admin/products/{slug}/stock/entry",
            post(handlers::stock_entry),
        )
        .route("/api/admin/products/{slug}/stock/out", post(handlers::stock_out))
        .route("/api/admin/images/{public_id}", delete(handlers::delete_image))
        .with_state(service)
}

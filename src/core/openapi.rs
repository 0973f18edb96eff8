use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::auth;
use crate::features::categories::{dtos as categories_dtos, handlers as categories_handlers};
use crate::features::products::{dtos as products_dtos, handlers as products_handlers};
use crate::features::users::{dtos as users_dtos, handlers as users_handlers, models as users_models};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        auth::handlers::sign_up,
        auth::handlers::sign_in,
        auth::handlers::get_me,
        // Users (admin)
        users_handlers::list_users,
        users_handlers::create_user,
        // Categories
        categories_handlers::list_categories,
        categories_handlers::get_category,
        categories_handlers::create_category,
        categories_handlers::update_category,
        categories_handlers::delete_category,
        // Products (public)
        products_handlers::list_products,
        products_handlers::get_product,
        // Products (admin)
        products_handlers::list_admin_products,
        products_handlers::get_admin_product,
        products_handlers::create_product,
        products_handlers::update_product,
        products_handlers::delete_product,
        products_handlers::update_product_categories,
        products_handlers::switch_availability,
        products_handlers::stock_entry,
        products_handlers::stock_out,
        // Images
        products_handlers::get_product_images,
        products_handlers::get_image,
        products_handlers::upload_product_images,
        products_handlers::set_cover_image,
        products_handlers::delete_image,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Auth
            auth::model::AuthenticatedUser,
            auth::dtos::SignUpDto,
            auth::dtos::SignInDto,
            auth::dtos::AuthResponseDto,
            ApiResponse<auth::dtos::AuthResponseDto>,
            // Users
            users_models::UserRole,
            users_dtos::CreateUserDto,
            users_dtos::UserResponseDto,
            ApiResponse<users_dtos::UserResponseDto>,
            ApiResponse<Vec<users_dtos::UserResponseDto>>,
            // Categories
            categories_dtos::CreateCategoryDto,
            categories_dtos::UpdateCategoryDto,
            categories_dtos::CategoryResponseDto,
            ApiResponse<Vec<categories_dtos::CategoryResponseDto>>,
            ApiResponse<categories_dtos::CategoryResponseDto>,
            // Products
            products_dtos::CreateProductDto,
            products_dtos::UpdateProductDto,
            products_dtos::StockChangeDto,
            products_dtos::ProductResponseDto,
            products_dtos::AdminProductResponseDto,
            ApiResponse<Vec<products_dtos::ProductResponseDto>>,
            ApiResponse<products_dtos::ProductResponseDto>,
            ApiResponse<Vec<products_dtos::AdminProductResponseDto>>,
            ApiResponse<products_dtos::AdminProductResponseDto>,
            // Images
            products_dtos::UploadImagesDto,
            products_dtos::ProductImageResponseDto,
            ApiResponse<Vec<products_dtos::ProductImageResponseDto>>,
        )
    ),
    tags(
        (name = "auth", description = "Sign-up, sign-in and current user"),
        (name = "users", description = "User management (admin only)"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Product catalog, availability and stock"),
        (name = "images", description = "Product image upload, cover selection and serving"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Stockroom API",
        version = "0.1.0",
        description = "API documentation for Stockroom",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_catalog_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/products",
            "/api/admin/products/{slug}/cover/{public_id}",
            "/image/{public_id}",
            "/api/admin/categories/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::core::error::Result;
use crate::features::categories::dtos::CategoryResponseDto;
use crate::features::products::dtos::ProductImageResponseDto;
use crate::features::products::models::{Product, ProductFilter};
use crate::shared::types::PaginationQuery;
use crate::shared::utils::parse_id_list;
use crate::shared::validation::SLUG_REGEX;

fn validate_positive_price(price: &Decimal) -> std::result::Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::new("price_not_positive")
            .with_message("Price must be greater than zero".into()));
    }
    Ok(())
}

fn validate_non_negative(amount: &Decimal) -> std::result::Result<(), ValidationError> {
    if amount.is_sign_negative() {
        return Err(ValidationError::new("amount_negative")
            .with_message("Cost must not be negative".into()));
    }
    Ok(())
}

fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Name is required".into()));
    }
    Ok(())
}

/// Request DTO for creating a product
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductDto {
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    /// Optional slug; a short random one is generated when omitted
    #[validate(regex(path = *SLUG_REGEX, message = "Slug must be lowercase alphanumeric with hyphens"))]
    pub slug: Option<String>,

    #[serde(default)]
    pub description: String,

    #[schema(value_type = String, example = "19.90")]
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Decimal,

    #[schema(value_type = Option<String>, example = "8.50")]
    #[validate(custom(function = "validate_non_negative"))]
    pub cost: Option<Decimal>,

    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: Option<i32>,

    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// Request DTO for overwriting a product
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductDto {
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "validate_not_blank")
    )]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[schema(value_type = String, example = "19.90")]
    #[validate(custom(function = "validate_positive_price"))]
    pub price: Decimal,

    #[schema(value_type = String, example = "8.50")]
    #[validate(custom(function = "validate_non_negative"))]
    pub cost: Decimal,

    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: i32,

    #[serde(default)]
    pub category_ids: Vec<i64>,
}

/// Request DTO for stock entry and stock out
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockChangeDto {
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
}

/// Query params for listing products
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProductListQuery {
    /// Page number (1-indexed, default: 1)
    #[param(value_type = Option<i64>, minimum = 1)]
    pub page: Option<String>,

    /// Items per page (default: 10, max: 100)
    #[param(value_type = Option<i64>, minimum = 1, maximum = 100)]
    pub page_size: Option<String>,

    /// Case-insensitive substring match on the product name
    pub name: Option<String>,

    /// Comma-separated category ids; products in any of them match
    pub category_ids: Option<String>,
}

impl ProductListQuery {
    pub fn into_filter(self, only_available: bool) -> Result<ProductFilter> {
        let pagination = PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        };
        let category_ids = match self.category_ids.as_deref() {
            Some(raw) => parse_id_list(raw)?,
            None => Vec::new(),
        };

        Ok(ProductFilter {
            page: pagination.page(),
            page_size: pagination.page_size(),
            name: self.name,
            category_ids,
            only_available,
        })
    }
}

/// Query params for replacing a product's categories
#[derive(Debug, Deserialize, IntoParams)]
pub struct LinkCategoriesQuery {
    /// Comma-separated category ids; an empty value removes every category
    pub ids: Option<String>,
}

/// Public product representation (cost is withheld)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponseDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock: i32,
    pub available: bool,
    pub cover_image: Option<String>,
    pub categories: Vec<CategoryResponseDto>,
    pub images: Vec<ProductImageResponseDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponseDto {
    pub fn from_product(product: Product, host: &str) -> Self {
        let images: Vec<ProductImageResponseDto> = product
            .images
            .into_iter()
            .map(|i| ProductImageResponseDto::from_image(i, host))
            .collect();
        let cover_image = images
            .iter()
            .find(|i| i.is_cover)
            .map(|i| i.image_url.clone());

        Self {
            id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            stock: product.stock,
            available: product.available,
            cover_image,
            categories: product.categories.into_iter().map(Into::into).collect(),
            images,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Admin product representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminProductResponseDto {
    #[serde(flatten)]
    pub product: ProductResponseDto,
    #[schema(value_type = String)]
    pub cost: Decimal,
}

impl AdminProductResponseDto {
    pub fn from_product(product: Product, host: &str) -> Self {
        let cost = product.cost;
        Self {
            product: ProductResponseDto::from_product(product, host),
            cost,
        }
    }
}

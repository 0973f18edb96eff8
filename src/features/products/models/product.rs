use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use crate::features::categories::models::Category;
use crate::features::products::models::ProductImage;
use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Row of the `products` table
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub stock: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product with its categories and images loaded
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub stock: i32,
    pub available: bool,
    pub categories: Vec<Category>,
    pub images: Vec<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn from_row(row: ProductRow, categories: Vec<Category>, images: Vec<ProductImage>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            cost: row.cost,
            stock: row.stock,
            available: row.available,
            categories,
            images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert payload; categories are already resolved
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub stock: i32,
    pub available: bool,
    pub categories: Vec<Category>,
}

/// Full overwrite of a product's scalar fields and category set
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub stock: i32,
    pub categories: Vec<Category>,
}

/// Listing criteria. `page` and `page_size` are expected to be >= 1.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub page: i64,
    pub page_size: i64,
    pub name: Option<String>,
    pub category_ids: Vec<i64>,
    pub only_available: bool,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            name: None,
            category_ids: Vec::new(),
            only_available: false,
        }
    }
}

impl ProductFilter {
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit())
    }

    /// Trimmed name filter, `None` when blank
    pub fn name_filter(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

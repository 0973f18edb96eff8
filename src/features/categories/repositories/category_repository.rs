use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::categories::models::Category;

const CATEGORY_EXISTS: &str = "A category with this name already exists";

/// Persistence for categories.
///
/// Lookups return `None` for missing rows; callers decide whether that is a
/// `NotFound`.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, name: &str) -> Result<Category>;

    async fn get_all(&self) -> Result<Vec<Category>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn update(&self, id: i64, name: &str) -> Result<Option<Category>>;

    /// Returns false when no row was deleted
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Whether any product still references the category
    async fn has_products(&self, id: i64) -> Result<bool>;
}

pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn create(&self, name: &str) -> Result<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| handle_db_error(e, CATEGORY_EXISTS))
    }

    async fn get_all(&self) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list categories: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn update(&self, id: i64, name: &str) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| handle_db_error(e, CATEGORY_EXISTS))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            // a product linked in the meantime trips the association FK
            .map_err(|e| match handle_db_error(e, CATEGORY_EXISTS) {
                AppError::BadRequest(_) => AppError::Dependency(format!(
                    "Category {} is still assigned to products",
                    id
                )),
                other => other,
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn has_products(&self, id: i64) -> Result<bool> {
        let linked: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM product_categories WHERE category_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(linked)
    }
}

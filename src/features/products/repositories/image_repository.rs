use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::products::models::{ensure_image_capacity, ProductImage, UploadedImage};

const IMAGE_COLUMNS: &str = "id, product_id, image_url, public_id, is_cover, created_at, updated_at";

/// Persistence for product image records
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Inserts one non-cover record per uploaded image.
    ///
    /// Fails with `LimitExceeded` and inserts nothing when the batch would
    /// take the product past the image cap.
    async fn create_many(&self, product_id: i64, images: &[UploadedImage]) -> Result<()>;

    async fn find_by_product_id(&self, product_id: i64) -> Result<Vec<ProductImage>>;

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<ProductImage>>;

    /// Image lookup constrained to the product with the given slug
    async fn find_by_public_id_and_product_slug(
        &self,
        public_id: &str,
        slug: &str,
    ) -> Result<Option<ProductImage>>;

    async fn delete_by_product_id(&self, product_id: i64) -> Result<()>;

    async fn delete_by_public_id(&self, public_id: &str) -> Result<()>;

    /// Clears the cover flag on every image of the product.
    ///
    /// Single-statement primitive; cover changes go through `replace_cover`,
    /// which performs this reset and `set_cover` under one product lock.
    async fn reset_cover(&self, slug: &str) -> Result<()>;

    /// Flags one image as cover. Fails with `Conflict` while a sibling is
    /// still the cover, so it must follow `reset_cover`.
    async fn set_cover(&self, public_id: &str) -> Result<()>;

    /// Makes `public_id` the only cover of the product in one transaction.
    ///
    /// Returns false and changes nothing when the image is not one of the
    /// product's images.
    async fn replace_cover(&self, slug: &str, public_id: &str) -> Result<bool>;
}

pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn create_many(&self, product_id: i64, images: &[UploadedImage]) -> Result<()> {
        if images.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        // Same product row lock as replace_cover, so concurrent batches are counted one at a time
        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!(
                "Product with ID {} not found",
                product_id
            )));
        }

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_images WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;
        ensure_image_capacity(existing as usize, images.len())?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO product_images (product_id, image_url, public_id, is_cover) ");
        qb.push_values(images, |mut b, image| {
            b.push_bind(product_id)
                .push_bind(&image.url)
                .push_bind(&image.public_id)
                .push_bind(false);
        });
        qb.build()
            .execute(&mut *tx)
            .await
            .map_err(|e| handle_db_error(e, "Image already registered"))?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_product_id(&self, product_id: i64) -> Result<Vec<ProductImage>> {
        let query = format!(
            "SELECT {} FROM product_images WHERE product_id = $1 ORDER BY id ASC",
            IMAGE_COLUMNS
        );
        sqlx::query_as::<_, ProductImage>(&query)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<ProductImage>> {
        let query = format!(
            "SELECT {} FROM product_images WHERE public_id = $1",
            IMAGE_COLUMNS
        );
        sqlx::query_as::<_, ProductImage>(&query)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_public_id_and_product_slug(
        &self,
        public_id: &str,
        slug: &str,
    ) -> Result<Option<ProductImage>> {
        sqlx::query_as::<_, ProductImage>(
            r#"
            SELECT pi.id, pi.product_id, pi.image_url, pi.public_id, pi.is_cover,
                   pi.created_at, pi.updated_at
            FROM product_images pi
            JOIN products p ON p.id = pi.product_id
            WHERE pi.public_id = $1 AND p.slug = $2
            "#,
        )
        .bind(public_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn delete_by_product_id(&self, product_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_public_id(&self, public_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM product_images WHERE public_id = $1")
            .bind(public_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset_cover(&self, slug: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE product_images
            SET is_cover = FALSE, updated_at = NOW()
            WHERE is_cover
              AND product_id = (SELECT id FROM products WHERE slug = $1)
            "#,
        )
        .bind(slug)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_cover(&self, public_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE product_images SET is_cover = TRUE, updated_at = NOW() WHERE public_id = $1",
        )
        .bind(public_id)
        .execute(&self.pool)
        .await
        .map_err(|e| handle_db_error(e, "Product already has a cover image"))?;
        Ok(())
    }

    async fn replace_cover(&self, slug: &str, public_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent cover swaps on the same product
        let product_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE slug = $1 FOR UPDATE")
                .bind(slug)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(product_id) = product_id else {
            return Ok(false);
        };

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM product_images WHERE public_id = $1 AND product_id = $2)",
        )
        .bind(public_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;
        if !owned {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE product_images
            SET is_cover = FALSE, updated_at = NOW()
            WHERE product_id = $1 AND is_cover
            "#,
        )
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE product_images SET is_cover = TRUE, updated_at = NOW() WHERE public_id = $1",
        )
        .bind(public_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

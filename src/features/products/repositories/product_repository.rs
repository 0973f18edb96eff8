use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use crate::core::error::{handle_db_error, AppError, Result};
use crate::features::categories::models::Category;
use crate::features::products::models::{
    NewProduct, Product, ProductChanges, ProductFilter, ProductImage, ProductRow,
};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.price, p.cost, p.stock, \
                               p.available, p.created_at, p.updated_at";

const SLUG_TAKEN: &str = "A product with this slug already exists";

/// Persistence for products and their category associations
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// One page of products plus the total count of matches before paging
    async fn get_all(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)>;

    async fn create(&self, product: NewProduct) -> Result<Product>;

    /// Product with categories and images loaded
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>>;

    /// Clears associations and hard-deletes the product row
    async fn delete_by_id(&self, product_id: i64) -> Result<()>;

    /// Overwrites scalar fields and replaces associations; images are untouched
    async fn update_by_slug(&self, slug: &str, changes: ProductChanges) -> Result<Option<Product>>;

    async fn clear_product_categories(&self, product_id: i64) -> Result<()>;

    /// Makes `categories` the exact category set of the product
    async fn replace_product_categories(
        &self,
        product_id: i64,
        categories: &[Category],
    ) -> Result<()>;

    async fn switch_available(&self, slug: &str) -> Result<()>;

    /// Adds `delta` to the stock in a single statement.
    ///
    /// Returns the new stock, or `None` when the product is missing or the
    /// balance would drop below zero.
    async fn adjust_stock(&self, product_id: i64, delta: i32) -> Result<Option<i32>>;
}

#[derive(FromRow)]
struct LinkedCategoryRow {
    product_id: i64,
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attaches categories and images to a batch of rows in two queries
    async fn hydrate(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let linked = sqlx::query_as::<_, LinkedCategoryRow>(
            r#"
            SELECT pc.product_id, c.id, c.name, c.created_at, c.updated_at
            FROM product_categories pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.product_id = ANY($1)
            ORDER BY c.id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let images = sqlx::query_as::<_, ProductImage>(
            r#"
            SELECT id, product_id, image_url, public_id, is_cover, created_at, updated_at
            FROM product_images
            WHERE product_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut categories_by_product: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in linked {
            categories_by_product
                .entry(row.product_id)
                .or_default()
                .push(Category {
                    id: row.id,
                    name: row.name,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                });
        }

        let mut images_by_product: HashMap<i64, Vec<ProductImage>> = HashMap::new();
        for image in images {
            images_by_product
                .entry(image.product_id)
                .or_default()
                .push(image);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let categories = categories_by_product.remove(&row.id).unwrap_or_default();
                let images = images_by_product.remove(&row.id).unwrap_or_default();
                Product::from_row(row, categories, images)
            })
            .collect())
    }

    async fn find_row_by_slug(&self, slug: &str) -> Result<Option<ProductRow>> {
        let query = format!("SELECT {} FROM products p WHERE p.slug = $1", PRODUCT_COLUMNS);
        sqlx::query_as::<_, ProductRow>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ProductFilter) {
    qb.push(" WHERE TRUE");

    if let Some(name) = filter.name_filter() {
        qb.push(" AND p.name ILIKE ")
            .push_bind(format!("%{}%", name));
    }

    // EXISTS keeps a product matching several categories from appearing twice
    if !filter.category_ids.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM product_categories pc \
             WHERE pc.product_id = p.id AND pc.category_id = ANY(",
        )
        .push_bind(&filter.category_ids)
        .push("))");
    }

    if filter.only_available {
        qb.push(" AND p.available = TRUE");
    }
}

async fn insert_links(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    categories: &[Category],
) -> Result<()> {
    if categories.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO product_categories (product_id, category_id) ");
    qb.push_values(categories, |mut b, category| {
        b.push_bind(product_id).push_bind(category.id);
    });
    qb.push(" ON CONFLICT DO NOTHING");
    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(|e| handle_db_error(e, "Category already linked"))?;
    Ok(())
}

async fn delete_links(tx: &mut Transaction<'_, Postgres>, product_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn get_all(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
        let mut count_qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM products p");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count products: {:?}", e);
                AppError::Database(e)
            })?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM products p", PRODUCT_COLUMNS));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY p.id ASC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list products: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((self.hydrate(rows).await?, total))
    }

    async fn create(&self, product: NewProduct) -> Result<Product> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (name, slug, description, price, cost, stock, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, slug, description, price, cost, stock, available,
                      created_at, updated_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.cost)
        .bind(product.stock)
        .bind(product.available)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| handle_db_error(e, SLUG_TAKEN))?;

        insert_links(&mut tx, row.id, &product.categories).await?;
        tx.commit().await?;

        Ok(Product::from_row(row, product.categories, Vec::new()))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let Some(row) = self.find_row_by_slug(slug).await? else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn delete_by_id(&self, product_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        delete_links(&mut tx, product_id).await?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Product with id {} not found",
                product_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_by_slug(&self, slug: &str, changes: ProductChanges) -> Result<Option<Product>> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM products WHERE slug = $1 FOR UPDATE")
                .bind(slug)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(product_id) = product_id else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, cost = $5, stock = $6,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.price)
        .bind(changes.cost)
        .bind(changes.stock)
        .execute(&mut *tx)
        .await
        .map_err(|e| handle_db_error(e, SLUG_TAKEN))?;

        delete_links(&mut tx, product_id).await?;
        insert_links(&mut tx, product_id, &changes.categories).await?;

        tx.commit().await?;

        self.find_by_slug(slug).await
    }

    async fn clear_product_categories(&self, product_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM product_categories WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_product_categories(
        &self,
        product_id: i64,
        categories: &[Category],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        delete_links(&mut tx, product_id).await?;
        insert_links(&mut tx, product_id, categories).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn switch_available(&self, slug: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET available = NOT available, updated_at = NOW() WHERE slug = $1",
        )
        .bind(slug)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Product '{}' not found", slug)));
        }
        Ok(())
    }

    async fn adjust_stock(&self, product_id: i64, delta: i32) -> Result<Option<i32>> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING stock
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(stock_error)
    }
}

fn stock_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        // integer out of range
        if db_err.code() == Some(std::borrow::Cow::Borrowed("22003")) {
            return AppError::Validation("Stock would overflow".to_string());
        }
    }
    AppError::Database(e)
}

use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::Category;
use crate::features::categories::repositories::CategoryRepository;
use crate::features::products::dtos::{CreateProductDto, UpdateProductDto};
use crate::features::products::models::{
    ensure_image_capacity, NewProduct, Product, ProductChanges, ProductFilter, ProductImage,
    UploadedImage,
};
use crate::features::products::repositories::{ImageRepository, ProductRepository};
use crate::modules::storage::{ImageBlobProvider, StoredBlob};
use crate::shared::utils::{build_image_url, generate_slug};

/// Coordinates products, their categories, image records and image blobs
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
    categories: Arc<dyn CategoryRepository>,
    images: Arc<dyn ImageRepository>,
    blobs: Arc<dyn ImageBlobProvider>,
}

impl ProductService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        categories: Arc<dyn CategoryRepository>,
        images: Arc<dyn ImageRepository>,
        blobs: Arc<dyn ImageBlobProvider>,
    ) -> Self {
        Self {
            products,
            categories,
            images,
            blobs,
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Public listing; unavailable products never appear
    pub async fn list_products(&self, filter: ProductFilter) -> Result<(Vec<Product>, i64)> {
        self.products
            .get_all(&ProductFilter {
                only_available: true,
                ..filter
            })
            .await
    }

    pub async fn list_products_for_admin(
        &self,
        filter: ProductFilter,
    ) -> Result<(Vec<Product>, i64)> {
        self.products.get_all(&filter).await
    }

    /// Public lookup; an unavailable product reads as missing
    pub async fn get_product(&self, slug: &str) -> Result<Product> {
        let product = self.find_product(slug).await?;
        if !product.available {
            return Err(product_not_found(slug));
        }
        Ok(product)
    }

    pub async fn get_product_for_admin(&self, slug: &str) -> Result<Product> {
        self.find_product(slug).await
    }

    pub async fn get_product_images(&self, slug: &str) -> Result<Vec<ProductImage>> {
        let product = self.get_product(slug).await?;
        self.images.find_by_product_id(product.id).await
    }

    /// Bytes and content type of a registered image
    pub async fn get_image(&self, public_id: &str) -> Result<StoredBlob> {
        if self.images.find_by_public_id(public_id).await?.is_none() {
            return Err(image_not_found(public_id));
        }
        self.blobs.download(public_id).await
    }

    // =========================================================================
    // PRODUCT LIFECYCLE
    // =========================================================================

    pub async fn create_product(&self, dto: CreateProductDto) -> Result<Product> {
        let name = dto.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Product name is required".to_string()));
        }

        let slug = match dto.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => generate_slug(),
        };

        let categories = self.resolve_categories(&dto.category_ids).await?;

        let product = self
            .products
            .create(NewProduct {
                name,
                slug,
                description: dto.description,
                price: dto.price,
                cost: dto.cost.unwrap_or(Decimal::ZERO),
                stock: dto.stock.unwrap_or(0),
                available: true,
                categories,
            })
            .await?;

        tracing::info!("Product created: id={}, slug={}", product.id, product.slug);
        Ok(product)
    }

    /// Overwrites scalar fields and the category set; images are left alone
    pub async fn update_product(&self, slug: &str, dto: UpdateProductDto) -> Result<Product> {
        let categories = self.resolve_categories(&dto.category_ids).await?;

        let product = self
            .products
            .update_by_slug(
                slug,
                ProductChanges {
                    name: dto.name.trim().to_string(),
                    description: dto.description,
                    price: dto.price,
                    cost: dto.cost,
                    stock: dto.stock,
                    categories,
                },
            )
            .await?
            .ok_or_else(|| product_not_found(slug))?;

        tracing::info!("Product updated: id={}, slug={}", product.id, product.slug);
        Ok(product)
    }

    /// Deletes every blob first; any blob failure aborts before the database is touched
    pub async fn delete_product(&self, slug: &str) -> Result<()> {
        let product = self.find_product(slug).await?;
        let images = self.images.find_by_product_id(product.id).await?;

        for image in &images {
            self.blobs.delete(&image.public_id).await.map_err(|e| {
                tracing::error!(
                    "Aborting delete of product '{}': blob '{}' could not be removed: {}",
                    slug,
                    image.public_id,
                    e
                );
                e
            })?;
        }

        self.images.delete_by_product_id(product.id).await?;
        self.products.delete_by_id(product.id).await?;

        tracing::info!(
            "Product deleted: id={}, slug={}, images={}",
            product.id,
            slug,
            images.len()
        );
        Ok(())
    }

    pub async fn switch_available(&self, slug: &str) -> Result<Product> {
        self.find_product(slug).await?;
        self.products.switch_available(slug).await?;

        let product = self.find_product(slug).await?;
        tracing::info!(
            "Product availability switched: slug={}, available={}",
            slug,
            product.available
        );
        Ok(product)
    }

    // =========================================================================
    // CATEGORIES
    // =========================================================================

    /// Replaces the product's category set; an empty list removes all
    pub async fn update_product_categories(&self, slug: &str, ids: &[i64]) -> Result<Product> {
        let product = self.find_product(slug).await?;

        if ids.is_empty() {
            self.products.clear_product_categories(product.id).await?;
        } else {
            let categories = self.resolve_categories(ids).await?;
            self.products
                .replace_product_categories(product.id, &categories)
                .await?;
        }

        tracing::info!("Product categories replaced: slug={}, ids={:?}", slug, ids);
        self.find_product(slug).await
    }

    // =========================================================================
    // IMAGES
    // =========================================================================

    /// Registers already-stored blobs against the product
    pub async fn add_images_to_product(
        &self,
        slug: &str,
        uploaded: &[UploadedImage],
    ) -> Result<Vec<ProductImage>> {
        let product = self.find_product(slug).await?;
        self.images.create_many(product.id, uploaded).await?;

        tracing::info!(
            "Added {} image(s) to product '{}'",
            uploaded.len(),
            slug
        );
        self.images.find_by_product_id(product.id).await
    }

    /// Uploads local files and attaches them; blobs are removed again if attaching fails
    pub async fn upload_product_images(
        &self,
        slug: &str,
        files: &[PathBuf],
        host: &str,
    ) -> Result<Vec<ProductImage>> {
        if files.is_empty() {
            return Err(AppError::Validation(
                "At least one image is required".to_string(),
            ));
        }

        // Early check so a full product stores no blobs; create_many enforces the cap
        let product = self.find_product(slug).await?;
        let existing = self.images.find_by_product_id(product.id).await?;
        ensure_image_capacity(existing.len(), files.len())?;

        let mut uploaded: Vec<UploadedImage> = Vec::with_capacity(files.len());
        for path in files {
            match self.blobs.upload(path).await {
                Ok(public_id) => uploaded.push(UploadedImage {
                    url: build_image_url(host, &public_id),
                    public_id,
                }),
                Err(e) => {
                    self.discard_blobs(&uploaded).await;
                    return Err(e);
                }
            }
        }

        match self.add_images_to_product(slug, &uploaded).await {
            Ok(images) => Ok(images),
            Err(e) => {
                self.discard_blobs(&uploaded).await;
                Err(e)
            }
        }
    }

    /// Makes the image the product's only cover
    pub async fn set_image_as_cover(&self, public_id: &str, slug: &str) -> Result<()> {
        if self
            .images
            .find_by_public_id_and_product_slug(public_id, slug)
            .await?
            .is_none()
        {
            return Err(not_owned(public_id, slug));
        }

        if !self.images.replace_cover(slug, public_id).await? {
            return Err(not_owned(public_id, slug));
        }

        tracing::info!("Cover image set: slug={}, public_id={}", slug, public_id);
        Ok(())
    }

    /// Deletes the blob first, then the record
    pub async fn delete_image(&self, public_id: &str) -> Result<()> {
        if self.images.find_by_public_id(public_id).await?.is_none() {
            return Err(image_not_found(public_id));
        }

        self.blobs.delete(public_id).await?;
        self.images.delete_by_public_id(public_id).await?;

        tracing::info!("Image deleted: public_id={}", public_id);
        Ok(())
    }

    // =========================================================================
    // STOCK
    // =========================================================================

    pub async fn stock_entry(&self, slug: &str, quantity: i32) -> Result<Product> {
        ensure_positive_quantity(quantity)?;
        let mut product = self.find_product(slug).await?;

        let stock = self
            .products
            .adjust_stock(product.id, quantity)
            .await?
            .ok_or_else(|| product_not_found(slug))?;
        product.stock = stock;

        tracing::info!("Stock entry: slug={}, quantity={}, stock={}", slug, quantity, stock);
        Ok(product)
    }

    /// Removes stock; the store refuses any change that would go below zero
    pub async fn stock_out(&self, slug: &str, quantity: i32) -> Result<Product> {
        ensure_positive_quantity(quantity)?;
        let mut product = self.find_product(slug).await?;

        let Some(stock) = self.products.adjust_stock(product.id, -quantity).await? else {
            let current = self.find_product(slug).await?.stock;
            return Err(AppError::InsufficientStock {
                current,
                requested: quantity,
            });
        };
        product.stock = stock;

        tracing::info!("Stock out: slug={}, quantity={}, stock={}", slug, quantity, stock);
        Ok(product)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    async fn find_product(&self, slug: &str) -> Result<Product> {
        self.products
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| product_not_found(slug))
    }

    /// Resolves every id or fails naming the first missing one
    async fn resolve_categories(&self, ids: &[i64]) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = Vec::with_capacity(ids.len());
        for &id in ids {
            if categories.iter().any(|c| c.id == id) {
                continue;
            }
            let category = self.categories.get_by_id(id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Category with ID {} does not exist", id))
            })?;
            categories.push(category);
        }
        Ok(categories)
    }

    async fn discard_blobs(&self, uploaded: &[UploadedImage]) {
        for image in uploaded {
            if let Err(e) = self.blobs.delete(&image.public_id).await {
                tracing::warn!(
                    "Failed to discard orphaned blob '{}': {}",
                    image.public_id,
                    e
                );
            }
        }
    }
}

fn ensure_positive_quantity(quantity: i32) -> Result<()> {
    if quantity <= 0 {
        return Err(AppError::Validation(
            "Quantity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn product_not_found(slug: &str) -> AppError {
    AppError::NotFound(format!("Product '{}' not found", slug))
}

fn image_not_found(public_id: &str) -> AppError {
    AppError::NotFound(format!("Image '{}' not found", public_id))
}

fn not_owned(public_id: &str, slug: &str) -> AppError {
    AppError::Ownership(format!(
        "Image '{}' does not belong to product '{}'",
        public_id, slug
    ))
}

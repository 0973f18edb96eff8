//! In-memory fakes and fixtures shared by unit and handler tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, response::Response, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::config::JwtConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::categories::models::Category;
use crate::features::categories::repositories::CategoryRepository;
use crate::features::products::dtos::CreateProductDto;
use crate::features::products::models::{
    ensure_image_capacity, NewProduct, Product, ProductChanges, ProductFilter, ProductImage,
    ProductRow, UploadedImage,
};
use crate::features::products::repositories::{ImageRepository, ProductRepository};
use crate::features::users::models::{NewUser, User, UserRole};
use crate::features::users::repositories::UserRepository;
use crate::modules::storage::{content_type_for, ImageBlobProvider, StoredBlob};

// =============================================================================
// AUTH
// =============================================================================

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
        ttl: Duration::from_secs(3600),
        leeway: Duration::from_secs(0),
    }
}

pub fn create_admin_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: 1,
        email: "admin@example.com".to_string(),
        role: UserRole::Admin,
    }
}

pub fn create_regular_user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: 2,
        email: "user@example.com".to_string(),
        role: UserRole::User,
    }
}

async fn inject_admin_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_admin_user());
    next.run(request).await
}

async fn inject_user_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(create_regular_user());
    next.run(request).await
}

pub fn with_admin_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_admin_middleware))
}

pub fn with_user_auth(router: Router) -> Router {
    router.layer(axum::middleware::from_fn(inject_user_middleware))
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn new_product(name: &str, slug: &str, categories: Vec<Category>) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        slug: slug.to_string(),
        description: String::new(),
        price: Decimal::new(999, 2),
        cost: Decimal::new(400, 2),
        stock: 0,
        available: true,
        categories,
    }
}

pub fn create_product_dto(name: &str, category_ids: Vec<i64>) -> CreateProductDto {
    CreateProductDto {
        name: name.to_string(),
        slug: None,
        description: String::new(),
        price: Decimal::new(999, 2),
        cost: None,
        stock: None,
        category_ids,
    }
}

pub fn uploaded(public_id: &str) -> UploadedImage {
    UploadedImage {
        url: format!("http://localhost/image/{}", public_id),
        public_id: public_id.to_string(),
    }
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Default)]
struct CatalogState {
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, ProductRow>,
    links: BTreeSet<(i64, i64)>,
    images: BTreeMap<i64, ProductImage>,
    next_category_id: i64,
    next_product_id: i64,
    next_image_id: i64,
}

impl CatalogState {
    fn product_id_by_slug(&self, slug: &str) -> Option<i64> {
        self.products
            .values()
            .find(|p| p.slug == slug)
            .map(|p| p.id)
    }

    fn hydrate(&self, row: &ProductRow) -> Product {
        let categories = self
            .links
            .iter()
            .filter(|(product_id, _)| *product_id == row.id)
            .filter_map(|(_, category_id)| self.categories.get(category_id).cloned())
            .collect();
        let images = self
            .images
            .values()
            .filter(|i| i.product_id == row.id)
            .cloned()
            .collect();
        Product::from_row(row.clone(), categories, images)
    }

    fn replace_links(&mut self, product_id: i64, categories: &[Category]) {
        self.links.retain(|(p, _)| *p != product_id);
        for category in categories {
            self.links.insert((product_id, category.id));
        }
    }

    fn matches(&self, row: &ProductRow, filter: &ProductFilter) -> bool {
        if filter.only_available && !row.available {
            return false;
        }
        if let Some(name) = filter.name_filter() {
            if !row.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        filter.category_ids.is_empty()
            || filter
                .category_ids
                .iter()
                .any(|c| self.links.contains(&(row.id, *c)))
    }
}

fn negative_stock() -> AppError {
    AppError::Validation("Stock cannot be negative".to_string())
}

/// Catalog backed by maps, standing in for all three Postgres repositories
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_category(&self, name: &str) -> Category {
        CategoryRepository::create(self, name)
            .await
            .expect("seed category")
    }

    pub async fn seed_product(&self, product: NewProduct) -> Product {
        ProductRepository::create(self, product)
            .await
            .expect("seed product")
    }

    pub async fn category(&self, id: i64) -> Category {
        self.state
            .read()
            .await
            .categories
            .get(&id)
            .cloned()
            .expect("category exists")
    }

    pub async fn product(&self, slug: &str) -> Option<Product> {
        let state = self.state.read().await;
        state
            .products
            .values()
            .find(|p| p.slug == slug)
            .map(|row| state.hydrate(row))
    }

    pub async fn link(&self, product_id: i64, category_id: i64) {
        self.state
            .write()
            .await
            .links
            .insert((product_id, category_id));
    }

    pub async fn unlink_categories(&self, product_id: i64) {
        self.state
            .write()
            .await
            .links
            .retain(|(p, _)| *p != product_id);
    }

    pub async fn images_of(&self, product_id: i64) -> Vec<ProductImage> {
        self.state
            .read()
            .await
            .images
            .values()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCatalog {
    async fn create(&self, name: &str) -> Result<Category> {
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.name == name) {
            return Err(AppError::Conflict(
                "A category with this name already exists".to_string(),
            ));
        }

        state.next_category_id += 1;
        let now = Utc::now();
        let category = Category {
            id: state.next_category_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_all(&self) -> Result<Vec<Category>> {
        Ok(self.state.read().await.categories.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn update(&self, id: i64, name: &str) -> Result<Option<Category>> {
        let mut state = self.state.write().await;
        if state
            .categories
            .values()
            .any(|c| c.name == name && c.id != id)
        {
            return Err(AppError::Conflict(
                "A category with this name already exists".to_string(),
            ));
        }

        Ok(state.categories.get_mut(&id).map(|category| {
            category.name = name.to_string();
            category.updated_at = Utc::now();
            category.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.links.iter().any(|(_, c)| *c == id) {
            return Err(AppError::Dependency(
                "Category is still linked to products".to_string(),
            ));
        }
        Ok(state.categories.remove(&id).is_some())
    }

    async fn has_products(&self, id: i64) -> Result<bool> {
        Ok(self.state.read().await.links.iter().any(|(_, c)| *c == id))
    }
}

#[async_trait]
impl ProductRepository for InMemoryCatalog {
    async fn get_all(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64)> {
        let state = self.state.read().await;
        let matching: Vec<&ProductRow> = state
            .products
            .values()
            .filter(|row| state.matches(row, filter))
            .collect();
        let total = matching.len() as i64;

        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .map(|row| state.hydrate(row))
            .collect();
        Ok((page, total))
    }

    async fn create(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.write().await;
        if state.product_id_by_slug(&product.slug).is_some() {
            return Err(AppError::Conflict(
                "A product with this slug already exists".to_string(),
            ));
        }
        if product.stock < 0 {
            return Err(negative_stock());
        }

        state.next_product_id += 1;
        let now = Utc::now();
        let row = ProductRow {
            id: state.next_product_id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            cost: product.cost,
            stock: product.stock,
            available: product.available,
            created_at: now,
            updated_at: now,
        };
        state.replace_links(row.id, &product.categories);
        state.products.insert(row.id, row.clone());
        Ok(state.hydrate(&row))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        Ok(self.product(slug).await)
    }

    async fn delete_by_id(&self, product_id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        if state.products.remove(&product_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Product with id {} not found",
                product_id
            )));
        }
        state.links.retain(|(p, _)| *p != product_id);
        state.images.retain(|_, i| i.product_id != product_id);
        Ok(())
    }

    async fn update_by_slug(&self, slug: &str, changes: ProductChanges) -> Result<Option<Product>> {
        let mut state = self.state.write().await;
        let Some(product_id) = state.product_id_by_slug(slug) else {
            return Ok(None);
        };
        if changes.stock < 0 {
            return Err(negative_stock());
        }

        state.replace_links(product_id, &changes.categories);
        let Some(row) = state.products.get_mut(&product_id) else {
            return Ok(None);
        };
        row.name = changes.name;
        row.description = changes.description;
        row.price = changes.price;
        row.cost = changes.cost;
        row.stock = changes.stock;
        row.updated_at = Utc::now();

        let row = row.clone();
        Ok(Some(state.hydrate(&row)))
    }

    async fn clear_product_categories(&self, product_id: i64) -> Result<()> {
        self.unlink_categories(product_id).await;
        Ok(())
    }

    async fn replace_product_categories(
        &self,
        product_id: i64,
        categories: &[Category],
    ) -> Result<()> {
        self.state
            .write()
            .await
            .replace_links(product_id, categories);
        Ok(())
    }

    async fn switch_available(&self, slug: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let row = state
            .products
            .values_mut()
            .find(|p| p.slug == slug)
            .ok_or_else(|| AppError::NotFound(format!("Product '{}' not found", slug)))?;
        row.available = !row.available;
        Ok(())
    }

    async fn adjust_stock(&self, product_id: i64, delta: i32) -> Result<Option<i32>> {
        let mut state = self.state.write().await;
        let Some(row) = state.products.get_mut(&product_id) else {
            return Ok(None);
        };
        let stock = row
            .stock
            .checked_add(delta)
            .ok_or_else(|| AppError::Validation("Stock would overflow".to_string()))?;
        if stock < 0 {
            return Ok(None);
        }
        row.stock = stock;
        Ok(Some(stock))
    }
}

#[async_trait]
impl ImageRepository for InMemoryCatalog {
    async fn create_many(&self, product_id: i64, images: &[UploadedImage]) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product_id) {
            return Err(AppError::NotFound(format!(
                "Product with ID {} not found",
                product_id
            )));
        }
        let existing = state
            .images
            .values()
            .filter(|i| i.product_id == product_id)
            .count();
        ensure_image_capacity(existing, images.len())?;

        let taken: HashSet<&str> = state.images.values().map(|i| i.public_id.as_str()).collect();
        if images.iter().any(|i| taken.contains(i.public_id.as_str())) {
            return Err(AppError::Conflict("Image already registered".to_string()));
        }

        for image in images {
            state.next_image_id += 1;
            let now = Utc::now();
            let record = ProductImage {
                id: state.next_image_id,
                product_id,
                image_url: image.url.clone(),
                public_id: image.public_id.clone(),
                is_cover: false,
                created_at: now,
                updated_at: now,
            };
            state.images.insert(record.id, record);
        }
        Ok(())
    }

    async fn find_by_product_id(&self, product_id: i64) -> Result<Vec<ProductImage>> {
        Ok(self.images_of(product_id).await)
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<ProductImage>> {
        Ok(self
            .state
            .read()
            .await
            .images
            .values()
            .find(|i| i.public_id == public_id)
            .cloned())
    }

    async fn find_by_public_id_and_product_slug(
        &self,
        public_id: &str,
        slug: &str,
    ) -> Result<Option<ProductImage>> {
        let state = self.state.read().await;
        let Some(product_id) = state.product_id_by_slug(slug) else {
            return Ok(None);
        };
        Ok(state
            .images
            .values()
            .find(|i| i.public_id == public_id && i.product_id == product_id)
            .cloned())
    }

    async fn delete_by_product_id(&self, product_id: i64) -> Result<()> {
        self.state
            .write()
            .await
            .images
            .retain(|_, i| i.product_id != product_id);
        Ok(())
    }

    async fn delete_by_public_id(&self, public_id: &str) -> Result<()> {
        self.state
            .write()
            .await
            .images
            .retain(|_, i| i.public_id != public_id);
        Ok(())
    }

    async fn reset_cover(&self, slug: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(product_id) = state.product_id_by_slug(slug) {
            for image in state.images.values_mut() {
                if image.product_id == product_id {
                    image.is_cover = false;
                }
            }
        }
        Ok(())
    }

    async fn set_cover(&self, public_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(product_id) = state
            .images
            .values()
            .find(|i| i.public_id == public_id)
            .map(|i| i.product_id)
        else {
            return Ok(());
        };

        // mirrors the single-cover partial index
        if state
            .images
            .values()
            .any(|i| i.product_id == product_id && i.is_cover && i.public_id != public_id)
        {
            return Err(AppError::Conflict(
                "Product already has a cover image".to_string(),
            ));
        }
        for image in state.images.values_mut() {
            if image.public_id == public_id {
                image.is_cover = true;
            }
        }
        Ok(())
    }

    async fn replace_cover(&self, slug: &str, public_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(product_id) = state.product_id_by_slug(slug) else {
            return Ok(false);
        };
        if !state
            .images
            .values()
            .any(|i| i.product_id == product_id && i.public_id == public_id)
        {
            return Ok(false);
        }

        for image in state.images.values_mut() {
            if image.product_id == product_id {
                image.is_cover = image.public_id == public_id;
            }
        }
        Ok(true)
    }
}

// =============================================================================
// BLOBS
// =============================================================================

#[derive(Default)]
struct BlobState {
    blobs: HashMap<String, StoredBlob>,
    failing_deletes: HashSet<String>,
    uploads_before_failure: Option<usize>,
}

/// Blob store with failure injection for uploads and deletes
#[derive(Default)]
pub struct InMemoryBlobStore {
    state: RwLock<BlobState>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, public_id: &str, bytes: &[u8]) {
        self.state.write().await.blobs.insert(
            public_id.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type_for(public_id),
            },
        );
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.blobs.len()
    }

    pub async fn contains(&self, public_id: &str) -> bool {
        self.state.read().await.blobs.contains_key(public_id)
    }

    pub async fn fail_delete_of(&self, public_id: &str) {
        self.state
            .write()
            .await
            .failing_deletes
            .insert(public_id.to_string());
    }

    /// Lets `successes` more uploads through, then fails every later one
    pub async fn fail_upload_after(&self, successes: usize) {
        self.state.write().await.uploads_before_failure = Some(successes);
    }
}

#[async_trait]
impl ImageBlobProvider for InMemoryBlobStore {
    async fn upload(&self, local_path: &Path) -> Result<String> {
        let mut state = self.state.write().await;
        if let Some(remaining) = state.uploads_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(AppError::Storage(format!(
                    "Failed to upload '{}'",
                    local_path.display()
                )));
            }
            *remaining -= 1;
        }

        let extension = local_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let public_id = format!("{}.{}", Uuid::new_v4(), extension);
        state.blobs.insert(
            public_id.clone(),
            StoredBlob {
                bytes: b"fake-image".to_vec(),
                content_type: content_type_for(&public_id),
            },
        );
        Ok(public_id)
    }

    async fn download(&self, public_id: &str) -> Result<StoredBlob> {
        self.state
            .read()
            .await
            .blobs
            .get(public_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Blob '{}' not found", public_id)))
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing_deletes.contains(public_id) {
            return Err(AppError::Storage(format!(
                "Failed to delete blob '{}'",
                public_id
            )));
        }
        state.blobs.remove(public_id);
        Ok(())
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<i64, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: users.keys().next_back().copied().unwrap_or(0) + 1,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.users.read().await.len() as i64)
    }
}

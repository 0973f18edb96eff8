use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::CategoryResponseDto;
use crate::features::categories::repositories::CategoryRepository;

/// Service for category operations
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }

    pub async fn create(&self, name: &str) -> Result<CategoryResponseDto> {
        let name = normalized_name(name)?;
        let category = self.categories.create(name).await?;

        tracing::info!("Category created: id={}, name={}", category.id, category.name);
        Ok(category.into())
    }

    pub async fn list(&self) -> Result<Vec<CategoryResponseDto>> {
        let categories = self.categories.get_all().await?;
        Ok(categories.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: i64) -> Result<CategoryResponseDto> {
        self.categories
            .get_by_id(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| not_found(id))
    }

    pub async fn update(&self, id: i64, name: &str) -> Result<CategoryResponseDto> {
        let name = normalized_name(name)?;
        let category = self
            .categories
            .update(id, name)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!("Category updated: id={}, name={}", category.id, category.name);
        Ok(category.into())
    }

    /// Deletes a category that no product references
    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.categories.get_by_id(id).await?.is_none() {
            return Err(not_found(id));
        }

        if self.categories.has_products(id).await? {
            return Err(AppError::Dependency(format!(
                "Category {} is still assigned to products",
                id
            )));
        }

        if !self.categories.delete(id).await? {
            return Err(not_found(id));
        }

        tracing::info!("Category deleted: id={}", id);
        Ok(())
    }
}

fn normalized_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }
    Ok(name)
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Category with id {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{new_product, InMemoryCatalog};

    fn service(catalog: &Arc<InMemoryCatalog>) -> CategoryService {
        CategoryService::new(catalog.clone())
    }

    #[tokio::test]
    async fn test_create_trims_and_rejects_blank() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let service = service(&catalog);

        let created = service.create("  Drinkware ").await.unwrap();
        assert_eq!(created.name, "Drinkware");

        let err = service.create("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let service = service(&catalog);

        service.create("Kitchen").await.unwrap();
        let err = service.create("Kitchen").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_and_update_unknown_is_not_found() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let service = service(&catalog);

        assert!(matches!(
            service.get(42).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            service.update(42, "Other").await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_blocked_while_linked() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let service = service(&catalog);

        let category = service.create("Mugs").await.unwrap();
        let linked = catalog.category(category.id).await;
        let product = catalog
            .seed_product(new_product("Blue Mug", "blue-mug", vec![linked]))
            .await;

        let err = service.delete(category.id).await.unwrap_err();
        assert!(matches!(err, AppError::Dependency(_)));
        assert!(service.get(category.id).await.is_ok());

        catalog.unlink_categories(product.id).await;
        service.delete(category.id).await.unwrap();
        assert!(matches!(
            service.get(category.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let service = service(&catalog);

        service.create("B").await.unwrap();
        service.create("A").await.unwrap();

        let names: Vec<String> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}

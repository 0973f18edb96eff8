mod image_repository;
mod product_repository;

pub use image_repository::{ImageRepository, PgImageRepository};
pub use product_repository::{PgProductRepository, ProductRepository};

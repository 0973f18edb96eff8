mod product;
mod product_image;

pub use product::{NewProduct, Product, ProductChanges, ProductFilter, ProductRow};
pub use product_image::{ensure_image_capacity, ProductImage, UploadedImage};

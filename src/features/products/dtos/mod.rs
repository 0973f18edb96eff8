mod image_dto;
mod product_dto;

pub use image_dto::{ProductImageResponseDto, UploadImagesDto};
pub use product_dto::{
    AdminProductResponseDto, CreateProductDto, LinkCategoriesQuery, ProductListQuery,
    ProductResponseDto, StockChangeDto, UpdateProductDto,
};

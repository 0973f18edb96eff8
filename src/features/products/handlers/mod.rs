mod image_handler;
mod product_handler;

pub use image_handler::*;
pub use product_handler::*;

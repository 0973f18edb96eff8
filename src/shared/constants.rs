/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

// =============================================================================
// CATALOG CONSTANTS
// =============================================================================

/// Maximum number of images a product may hold
pub const MAX_IMAGES_PER_PRODUCT: usize = 5;

/// Length of generated product slugs
pub const GENERATED_SLUG_LENGTH: usize = 8;

/// Maximum size of a single uploaded image (5MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Multipart field carrying product images
pub const IMAGES_FIELD: &str = "images";

/// Accepted image MIME types
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

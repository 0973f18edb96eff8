use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::shared::constants::GENERATED_SLUG_LENGTH;

/// Short random slug taken from a v4 UUID
pub fn generate_slug() -> String {
    Uuid::new_v4().simple().to_string()[..GENERATED_SLUG_LENGTH].to_string()
}

/// Display URL for a stored image, derived from the request host
pub fn build_image_url(host: &str, public_id: &str) -> String {
    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };
    format!("{}://{}/image/{}", scheme, host, public_id)
}

/// Parses a comma-separated id list such as `1,2,3`.
///
/// Blank input yields an empty list; duplicates are dropped keeping first occurrence.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    let mut ids: Vec<i64> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::Validation(format!("Invalid id '{}'", part)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Emails are matched case-insensitively
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

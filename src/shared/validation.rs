use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for caller-supplied product slugs
    /// Must be lowercase alphanumeric with single hyphens between segments
    /// - Valid: "red-mug", "3f9a1c2b", "mug-2024"
    /// - Invalid: "-mug", "mug-", "red--mug", "Red", "red_mug"
    pub static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_regex_valid() {
        assert!(SLUG_REGEX.is_match("red-mug"));
        assert!(SLUG_REGEX.is_match("3f9a1c2b"));
        assert!(SLUG_REGEX.is_match("a-b-c"));
    }

    #[test]
    fn test_slug_regex_invalid() {
        assert!(!SLUG_REGEX.is_match("-mug"));
        assert!(!SLUG_REGEX.is_match("mug-"));
        assert!(!SLUG_REGEX.is_match("red--mug"));
        assert!(!SLUG_REGEX.is_match("Red"));
        assert!(!SLUG_REGEX.is_match("red_mug"));
        assert!(!SLUG_REGEX.is_match(""));
    }
}

//! Small shared helpers for providers

/// Mask an API key for safe logging: keep the first four characters,
/// replace the rest with asterisks.
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}{}", &key[..4], "*".repeat(key.len() - 4))
    }
}

/// Truncate a string at a char boundary at or below `max_bytes`.
#[must_use]
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

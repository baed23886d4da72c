//! Credential and error-text helpers

const MIN_KEY_LEN: usize = 8;

const MASK_VISIBLE: usize = 4;

/// Fragments that mark an error as possibly echoing a credential
const SENSITIVE_PATTERNS: &[&str] = &[
    "api_key",
    "api-key",
    "apikey",
    "authorization",
    "bearer",
    "token",
    "secret",
    "password",
    "credential",
];

/// Mask a key for logs: first and last four characters, or `****`.
///
/// ```
/// use council_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LEN || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..MASK_VISIBLE], &key[key.len() - MASK_VISIBLE..])
}

/// Replace error text that mentions credentials with a generic message.
///
/// ```
/// use council_llm::util::sanitize_error_for_user;
/// assert_eq!(sanitize_error_for_user("Connection timeout"), "Connection timeout");
/// ```
#[must_use]
pub fn sanitize_error_for_user(error: &str) -> String {
    let lower = error.to_lowercase();
    if SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p)) {
        "An API error occurred. Please try again.".to_string()
    } else {
        error.to_string()
    }
}

/// Why `key` cannot be a real key for `provider`, if it cannot
#[must_use]
pub fn validate_api_key(key: &str, provider: &str) -> Option<String> {
    if key.is_empty() {
        Some(format!("{} API key is required", provider))
    } else if key.len() < MIN_KEY_LEN {
        Some(format!("{} API key appears to be invalid (too short)", provider))
    } else {
        None
    }
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 character
#[must_use]
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

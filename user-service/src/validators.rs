use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Input validation utilities for user service

// These patterns are hardcoded and always valid, so we use expect() with explicit reasoning
pub static POSTAL_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9\- ]{3,20}$")
        .expect("hardcoded postal code regex is invalid - fix source code")
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

// Cognito `sub` values are UUIDs; the wider charset keeps imported pools working
static USER_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,128}$")
        .expect("hardcoded user id regex is invalid - fix source code")
});

/// validator crate compatible check for fields that must contain non-whitespace text
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Validate an identity-provider user id (`sub`)
pub fn validate_user_id(user_id: &str) -> bool {
    USER_ID_REGEX.is_match(user_id)
}

/// Escape a value embedded in a Cognito ListUsers filter expression
pub fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

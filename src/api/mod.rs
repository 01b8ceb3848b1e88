//! Resource operations for the REST API
//!
//! Each submodule holds the use cases for one resource. Functions take the
//! database (and, where needed, the auth services) explicitly, validate their
//! input and return response DTOs or an [`AppError`].

pub mod categories;
pub mod products;
pub mod users;
pub mod vendors;

use std::sync::OnceLock;

use uuid::Uuid;

use crate::error::AppError;

// =============================================================================
// Constants
// =============================================================================

/// Minimum length for user names
pub const MIN_USER_NAME_LENGTH: usize = 3;

/// Maximum length for user names
pub const MAX_USER_NAME_LENGTH: usize = 20;

/// Minimum length for passwords
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum length for passwords
pub const MAX_PASSWORD_LENGTH: usize = 50;

/// Maximum length for email addresses
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for vendor, product and category names
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length for descriptions
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

// =============================================================================
// Validation
// =============================================================================

/// Trim `value` and require its length in characters to be within bounds
pub fn bounded_text(field: &str, value: &str, min: usize, max: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if len == 0 {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }

    Ok(trimmed.to_string())
}

/// Trim `value` and require it to be non-empty and at most `max` characters
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, AppError> {
    bounded_text(field, value, 1, max)
}

/// Like [`bounded_text`] for optional fields; `None` or blank means "unchanged"
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Result<Option<String>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => bounded_text(field, v, min, max).map(Some),
    }
}

/// Passwords are length-checked but not trimmed
pub fn validate_password(field: &str, value: &str) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < MIN_PASSWORD_LENGTH || len > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {} characters",
            field, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Trim and check an email address
pub fn validate_email(value: &str) -> Result<String, AppError> {
    static EMAIL_RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        regex_lite::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .expect("Invalid regex pattern for email validation")
    });

    let email = required_text("email", value, MAX_EMAIL_LENGTH)?;
    if !re.is_match(&email) {
        return Err(AppError::Validation("invalid email format".to_string()));
    }
    Ok(email)
}

/// Parse a UUID path or body parameter
pub fn parse_id(field: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::Validation(format!("invalid {} format", field)))
}

/// Prices must be finite and strictly positive
pub fn validate_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::Validation(
            "product_price must be greater than 0".to_string(),
        ));
    }
    Ok(price)
}

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AppError, AppResult};

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email regex"));

/// Field-level error for the email input, `None` when the value is acceptable.
pub fn email_error(value: &str) -> Option<&'static str> {
    if value.is_empty() {
        Some("Email is required")
    } else if !EMAIL_REGEX.is_match(value) {
        Some("Invalid email format")
    } else {
        None
    }
}

pub fn validate_email(value: &str) -> AppResult<()> {
    match email_error(value) {
        Some(msg) => Err(AppError::ValidationError(msg.to_string())),
        None => Ok(()),
    }
}

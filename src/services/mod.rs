pub mod auth;
pub mod error;
pub mod lists;
pub mod sessions;
pub mod tasks;

use error::ServiceError;

pub const MAX_NAME_LEN: usize = 50;

/// Trim `value` and check it is a usable name for `field`.
pub(crate) fn clean_name<'a>(field: &str, value: &'a str) -> Result<&'a str, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::Validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed)
}

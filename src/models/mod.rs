// src/models/mod.rs

use validator::ValidationError;

pub mod attempt;
pub mod participant;
pub mod question;
pub mod quiz;
pub mod user;

/// Rejects values that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("This field is required.".into()));
    }
    Ok(())
}

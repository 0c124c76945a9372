// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique ignoring case, matched exactly at login.
    pub username: String,

    /// Lowercased email. Seeded staff accounts may have none.
    pub email: Option<String>,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Staff accounts manage quizzes and never take them.
    pub is_staff: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new account (Registration).
///
/// `username` is optional: when left blank it is derived from the email.
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_passwords_match, skip_on_field_errors = false))]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(max = 150, message = "Ensure this value has at most 150 characters."),
        custom(function = validate_username_chars)
    )]
    pub username: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(
        min = 8,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password1: String,
    pub password2: String,
}

impl RegisterRequest {
    /// Trimmed username, `None` when the field was left blank.
    pub fn requested_username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

fn validate_username_chars(username: &str) -> Result<(), ValidationError> {
    let username = username.trim();
    if username.is_empty() || USERNAME_RE.is_match(username) {
        return Ok(());
    }
    Err(ValidationError::new("invalid_username").with_message(
        "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
            .into(),
    ))
}

fn validate_passwords_match(req: &RegisterRequest) -> Result<(), ValidationError> {
    if req.password1 != req.password2 {
        return Err(ValidationError::new("password_mismatch")
            .with_message("The two password fields didn't match.".into()));
    }
    Ok(())
}

/// DTO for login. `username` accepts either a username or an email.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: Option<&str>, email: &str, p1: &str, p2: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.map(str::to_string),
            email: email.to_string(),
            password1: p1.to_string(),
            password2: p2.to_string(),
        }
    }

    #[test]
    fn blank_username_is_treated_as_missing() {
        let req = request(Some("   "), "A@Example.com", "password123", "password123");
        assert!(req.validate().is_ok());
        assert_eq!(req.requested_username(), None);
        assert_eq!(req.normalized_email(), "a@example.com");
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let req = request(None, "a@example.com", "password123", "password124");
        let errors = req.validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));
    }

    #[test]
    fn username_with_spaces_inside_is_rejected() {
        let req = request(Some("bad name"), "a@example.com", "password123", "password123");
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[test]
    fn short_password_and_bad_email_are_both_reported() {
        let req = request(None, "not-an-email", "short", "short");
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password1"));
    }

    #[test]
    fn long_password_is_accepted() {
        let long = "p".repeat(200);
        assert!(request(None, "a@example.com", &long, &long).validate().is_ok());
    }
}

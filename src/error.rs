// src/error.rs

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Key under which errors that belong to the whole form are reported.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request, with per-field messages for the re-rendered form
    Validation(FormErrors),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (e.g., wrong method on a mutation endpoint)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Validation(errors) => {
                let body = Json(json!({
                    "error": "Validation failed",
                    "fields": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

impl From<FormErrors> for AppError {
    fn from(errors: FormErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// A JSON body that does not fit the form is a form error too.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let errors = match &rejection {
            JsonRejection::JsonDataError(e) => body_errors(&e.body_text()),
            _ => FormErrors::single(NON_FIELD_ERRORS, rejection.body_text()),
        };
        AppError::Validation(errors)
    }
}

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Maps serde's `path: message` text onto the field it names.
fn body_errors(text: &str) -> FormErrors {
    let detail = text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(text);
    let (path, message) = match detail.split_once(": ") {
        Some((path, rest)) if is_field_path(path) => (Some(path), rest),
        _ => (None, detail),
    };

    let missing = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(name, _)| name);

    match (path, missing) {
        (Some(path), Some(field)) => FormErrors::single(format!("{path}.{field}"), REQUIRED),
        (None, Some(field)) => FormErrors::single(field, REQUIRED),
        (Some(path), None) => FormErrors::single(path, "Enter a valid value."),
        (None, None) => FormErrors::single(NON_FIELD_ERRORS, message),
    }
}

const REQUIRED: &str = "This field is required.";

fn is_field_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'))
}

/// Field-level form errors, keyed by field path.
///
/// Nested and list errors from `validator` are flattened into dotted keys such
/// as `options[1].option_text`, so a client can attach each message to the
/// input it belongs to.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a form with a single failing field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was reported, otherwise the errors as an `AppError`.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        flatten("", &errors, &mut out);
        out
    }
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut FormErrors) {
    for (field, kind) in errors.errors() {
        let name: &str = field;
        let key = match (prefix.is_empty(), name) {
            (true, name) => name.to_string(),
            (false, NON_FIELD_ERRORS) => prefix.to_string(),
            (false, name) => format!("{prefix}.{name}"),
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    out.add(key.clone(), message_of(error));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&key, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{key}[{index}]"), inner, out);
                }
            }
        }
    }
}

fn message_of(error: &ValidationError) -> String {
    error
        .message
        .as_deref()
        .map(str::to_owned)
        .unwrap_or_else(|| error.code.to_string())
}

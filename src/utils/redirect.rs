// src/utils/redirect.rs

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// One-shot status message delivered alongside a redirect.
#[derive(Debug, Clone, Serialize)]
pub struct Flash {
    pub level: Level,
    pub text: String,
}

/// `303 See Other` to `location`, optionally carrying a flash message in the
/// JSON body.
#[derive(Debug, Clone)]
pub struct Redirect {
    location: String,
    message: Option<Flash>,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: None,
        }
    }

    pub fn success(self, text: impl Into<String>) -> Self {
        self.with(Level::Success, text)
    }

    pub fn info(self, text: impl Into<String>) -> Self {
        self.with(Level::Info, text)
    }

    pub fn error(self, text: impl Into<String>) -> Self {
        self.with(Level::Error, text)
    }

    fn with(mut self, level: Level, text: impl Into<String>) -> Self {
        self.message = Some(Flash {
            level,
            text: text.into(),
        });
        self
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "redirect": self.location,
            "message": self.message,
        }));
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.location)],
            body,
        )
            .into_response()
    }
}

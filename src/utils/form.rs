// src/utils/form.rs

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON form body.
///
/// Same as `axum::Json`, but a body that cannot be deserialized is reported
/// like any other invalid form (`400` with per-field messages) instead of
/// axum's plain-text `422`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormJson<T>(pub T);

impl<T, S> FromRequest<S> for FormJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

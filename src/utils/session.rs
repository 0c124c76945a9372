// src/utils/session.rs

use axum::http::{HeaderMap, header};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::{
    config::{Config, SESSION_COOKIE},
    error::AppError,
    utils::jwt::{sign_jwt, verify_jwt},
};

/// The authenticated account behind a request.
/// Inserted into request extensions by the auth guard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
    #[serde(skip)]
    pub session_id: i64,
}

/// Pulls the session token from `Authorization: Bearer <token>` or, failing
/// that, from the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

/// Resolves the request's account, `None` if there is no valid open session.
pub async fn current_user(
    pool: &SqlitePool,
    config: &Config,
    headers: &HeaderMap,
) -> Result<Option<CurrentUser>, AppError> {
    let Some(token) = token_from_headers(headers) else {
        return Ok(None);
    };

    let Ok(claims) = verify_jwt(token, &config.jwt_secret) else {
        return Ok(None);
    };

    let Some(user_id) = claims.user_id() else {
        return Ok(None);
    };

    let user = sqlx::query_as::<_, CurrentUser>(
        r#"
        SELECT u.id, u.username, u.is_staff, s.id AS session_id
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.id = ? AND u.id = ?
        "#,
    )
    .bind(claims.sid)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Opens a session for `user_id` and returns the `Set-Cookie` value.
/// Sessions whose tokens have expired are purged first.
pub async fn start_session(
    pool: &SqlitePool,
    config: &Config,
    user_id: i64,
) -> Result<String, AppError> {
    purge_expired_sessions(pool, config.jwt_expiration).await?;

    let (session_id,): (i64,) =
        sqlx::query_as("INSERT INTO sessions (user_id, created_at) VALUES (?, ?) RETURNING id")
            .bind(user_id)
            .bind(chrono::Utc::now())
            .fetch_one(pool)
            .await?;

    let token = sign_jwt(user_id, session_id, &config.jwt_secret, config.jwt_expiration)?;

    Ok(format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        config.jwt_expiration
    ))
}

/// Deletes sessions older than the token lifetime. Their tokens can no
/// longer verify, so the rows are dead.
pub async fn purge_expired_sessions(pool: &SqlitePool, lifetime_secs: u64) -> Result<u64, AppError> {
    let cutoff = i64::try_from(lifetime_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lifetime| chrono::Utc::now().checked_sub_signed(lifetime));
    // A lifetime beyond chrono's range never expires anything
    let Some(cutoff) = cutoff else {
        return Ok(0);
    };

    let result = sqlx::query("DELETE FROM sessions WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        tracing::debug!("Purged {} expired sessions", result.rows_affected());
    }
    Ok(result.rows_affected())
}

/// Closes a session. Tokens naming it stop working immediately.
pub async fn end_session(pool: &SqlitePool, session_id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

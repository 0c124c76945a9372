// src/handlers/auth.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, FormErrors, NON_FIELD_ERRORS},
    models::user::{LoginRequest, RegisterRequest, User},
    state::AppState,
    utils::{
        form::FormJson,
        hash::{hash_password, verify_password},
        redirect::Redirect,
        session::{clear_cookie, current_user, end_session, start_session},
    },
};

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Renders the registration form.
/// Signed-in users are sent to their dashboard instead.
pub async fn register_form(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if current_user(&state.pool, &state.config, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Json(json!({
        "form": "register",
        "fields": ["username", "email", "password1", "password2"],
        "optional": ["username"],
    }))
    .into_response())
}

/// Registers a new participant account and signs it in.
///
/// The email must be unused (case-insensitive). A blank username is derived
/// from the email's local part, suffixed with 1, 2, ... until it is free.
/// On success redirects to the participant profile form.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    FormJson(payload): FormJson<RegisterRequest>,
) -> Result<Response, AppError> {
    if current_user(&state.pool, &state.config, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let mut errors = match payload.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => FormErrors::from(e),
    };

    let email = payload.normalized_email();
    if errors.get("email").is_none() && email_taken(&state.pool, &email).await? {
        errors.add("email", "This email is already in use.");
    }

    let username = match payload.requested_username() {
        Some(name) => {
            if errors.get("username").is_none() && username_taken(&state.pool, name).await? {
                errors.add("username", "This username is already in use.");
            }
            name.to_string()
        }
        None => unique_username(&state.pool, &username_base(&email)).await?,
    };

    errors.into_result()?;

    let hashed_password = hash_password(&payload.password1)?;

    let (user_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (username, email, password, is_staff, created_at)
        VALUES (?, ?, ?, FALSE, ?)
        RETURNING id
        "#,
    )
    .bind(&username)
    .bind(&email)
    .bind(&hashed_password)
    .bind(chrono::Utc::now())
    .fetch_one(&state.pool)
    .await
    .map_err(|e| -> AppError {
        // Lost a race with a concurrent registration
        let duplicate = e
            .as_database_error()
            .filter(|db| db.is_unique_violation())
            .map(|db| db.message().contains("email"));

        match duplicate {
            Some(true) => FormErrors::single("email", "This email is already in use.").into(),
            Some(false) => {
                FormErrors::single("username", "This username is already in use.").into()
            }
            None => {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        }
    })?;

    tracing::info!("Registered user {} (id {})", username, user_id);

    let cookie = start_session(&state.pool, &state.config, user_id).await?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to("/participant-profile/")
            .success("Registration successful. Please complete your participant profile."),
    )
        .into_response())
}

/// Renders the login form.
pub async fn login_form(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if current_user(&state.pool, &state.config, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(Json(json!({
        "form": "login",
        "fields": ["username", "password"],
        "labels": { "username": "Username or Email" },
    }))
    .into_response())
}

/// Authenticates with a username or an email plus password.
///
/// Input containing `@` is looked up as an email first and replaced by the
/// matching account's username. Usernames match case-sensitively. On success opens a session and redirects to
/// the dashboard.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    FormJson(payload): FormJson<LoginRequest>,
) -> Result<Response, AppError> {
    if current_user(&state.pool, &state.config, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    payload.validate()?;

    let username = resolve_login_name(&state.pool, payload.username.trim()).await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password, is_staff, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&username)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = match user {
        Some(user) if verify_password(&payload.password, &user.password)? => user,
        _ => {
            tracing::warn!("Failed login for {}", username);
            return Err(FormErrors::single(NON_FIELD_ERRORS, INVALID_LOGIN).into());
        }
    };

    let cookie = start_session(&state.pool, &state.config, user.id).await?;

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// Ends the current session (if any) and returns to the login page.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(user) = current_user(&state.pool, &state.config, &headers).await? {
        end_session(&state.pool, user.session_id).await?;
        tracing::info!("User {} logged out", user.username);
    }

    Ok(([(header::SET_COOKIE, clear_cookie())], Redirect::to("/login/")))
}

/// Maps an email to its account's username. Anything else, including an
/// unknown email, is returned unchanged and fails authentication later.
async fn resolve_login_name(pool: &SqlitePool, input: &str) -> Result<String, AppError> {
    if !input.contains('@') {
        return Ok(input.to_string());
    }

    let found: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE email = ?")
        .bind(input.to_lowercase())
        .fetch_optional(pool)
        .await?;

    Ok(found.map(|(username,)| username).unwrap_or_else(|| input.to_string()))
}

async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool, AppError> {
    let (taken,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(taken)
}

async fn username_taken(pool: &SqlitePool, username: &str) -> Result<bool, AppError> {
    let (taken,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE lower(username) = lower(?))")
            .bind(username)
            .fetch_one(pool)
            .await?;
    Ok(taken)
}

/// First free name in the sequence `base`, `base1`, `base2`, ...
async fn unique_username(pool: &SqlitePool, base: &str) -> Result<String, AppError> {
    let mut counter = 0u32;
    loop {
        let candidate = username_candidate(base, counter);
        if !username_taken(pool, &candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Local part of the email, or "user" when there is no `@`.
fn username_base(email: &str) -> String {
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() => local.to_string(),
        _ => "user".to_string(),
    }
}

fn username_candidate(base: &str, counter: u32) -> String {
    if counter == 0 {
        base.to_string()
    } else {
        format!("{base}{counter}")
    }
}

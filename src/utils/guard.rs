// src/utils/guard.rs

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::participant::Participant,
    state::AppState,
    utils::{
        redirect::Redirect,
        session::{CurrentUser, current_user},
    },
};

/// Axum Middleware: Authentication.
///
/// Resolves the session token (bearer header or cookie) to an open session.
/// If valid, injects `CurrentUser` into the request extensions for handlers to use.
/// Otherwise redirects to the login page.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match current_user(&state.pool, &state.config, req.headers()).await? {
        Some(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        None => Ok(Redirect::to("/login/").into_response()),
    }
}

/// Axum Middleware: Staff Authorization.
///
/// Must be used AFTER `auth_middleware`. Non-staff accounts are sent back to
/// their dashboard with an error message.
pub async fn staff_middleware(req: Request<Body>, next: Next) -> Response {
    let Some(user) = req.extensions().get::<CurrentUser>() else {
        return Redirect::to("/login/").into_response();
    };

    if !user.is_staff {
        tracing::warn!("User {} denied access to {}", user.username, req.uri().path());
        return Redirect::to("/")
            .error("Admin access required.")
            .into_response();
    }

    next.run(req).await
}

/// Axum Middleware: Participant Authorization.
///
/// Must be used AFTER `auth_middleware`. Staff go to the admin dashboard and
/// accounts without a profile go to the profile form. On success the
/// `Participant` is injected into the request extensions.
pub async fn participant_middleware(
    State(pool): State<SqlitePool>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user) = req.extensions().get::<CurrentUser>().cloned() else {
        return Ok(Redirect::to("/login/").into_response());
    };

    if user.is_staff {
        return Ok(Redirect::to("/admin-panel/")
            .info("Admins cannot participate in quizzes. Use Admin Panel to manage quizzes.")
            .into_response());
    }

    let participant = sqlx::query_as::<_, Participant>(
        r#"
        SELECT id, user_id, name, student_class, age, gender, institution
        FROM participants
        WHERE user_id = ?
        "#,
    )
    .bind(user.id)
    .fetch_optional(&pool)
    .await?;

    match participant {
        Some(participant) => {
            req.extensions_mut().insert(participant);
            Ok(next.run(req).await)
        }
        None => Ok(Redirect::to("/participant-profile/").into_response()),
    }
}

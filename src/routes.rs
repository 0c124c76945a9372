// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{any, get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, profile, quiz},
    state::AppState,
    utils::guard::{auth_middleware, participant_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Public routes: register, login, logout.
/// * Signed-in routes: participant profile.
/// * Participant routes: dashboard, take quiz, result (staff are turned away).
/// * Admin panel: quiz and question management (staff only).
/// * Applies global middleware (Trace, CORS, no-store caching).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let public_routes = Router::new()
        .route("/register/", get(auth::register_form).post(auth::register))
        .route("/login/", get(auth::login_form).post(auth::login))
        .route("/logout/", any(auth::logout));

    let account_routes = Router::new()
        .route(
            "/participant-profile/",
            get(profile::get_profile).post(profile::save_profile),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let participant_routes = Router::new()
        .route("/", get(quiz::dashboard))
        .route("/quiz/{quiz_id}/", get(quiz::take_quiz).post(quiz::submit_quiz))
        .route("/result/{attempt_id}/", get(quiz::result))
        // Auth first, then the participant check
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            participant_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Mutation endpoints answer 403 to anything but POST, after the staff check.
    let admin_routes = Router::new()
        .route("/admin-panel/", get(admin::dashboard))
        .route(
            "/admin-panel/quizzes/new/",
            get(admin::new_quiz_form).post(admin::create_quiz),
        )
        .route("/admin-panel/quizzes/{quiz_id}/", get(admin::quiz_detail))
        .route(
            "/admin-panel/quizzes/{quiz_id}/edit/",
            get(admin::edit_quiz_form).post(admin::update_quiz),
        )
        .route(
            "/admin-panel/quizzes/{quiz_id}/toggle-publish/",
            post(admin::toggle_publish).fallback(admin::invalid_method),
        )
        .route(
            "/admin-panel/quizzes/{quiz_id}/delete/",
            post(admin::delete_quiz).fallback(admin::invalid_method),
        )
        .route(
            "/admin-panel/quizzes/{quiz_id}/questions/new/",
            get(admin::new_question_form).post(admin::create_question),
        )
        .route(
            "/admin-panel/quizzes/{quiz_id}/questions/{question_id}/edit/",
            get(admin::edit_question_form).post(admin::update_question),
        )
        .route(
            "/admin-panel/quizzes/{quiz_id}/questions/{question_id}/delete/",
            post(admin::delete_question).fallback(admin::invalid_method),
        )
        // Double middleware protection: Auth first, then Staff check
        .route_layer(middleware::from_fn(staff_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(account_routes)
        .merge(participant_routes)
        .merge(admin_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
                )),
        )
        .with_state(state)
}

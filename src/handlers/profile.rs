use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::participant::{GENDER_CHOICES, Participant, ParticipantForm},
    utils::{form::FormJson, redirect::Redirect, session::CurrentUser},
};

async fn find_participant(pool: &SqlitePool, user_id: i64) -> Result<Option<Participant>, AppError> {
    let participant = sqlx::query_as::<_, Participant>(
        r#"
        SELECT id, user_id, name, student_class, age, gender, institution
        FROM participants
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(participant)
}

/// Current user's participant profile (or `null` before it is completed).
pub async fn get_profile(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let participant = find_participant(&pool, user.id).await?;

    let gender_choices: Vec<_> = GENDER_CHOICES
        .iter()
        .map(|(value, label)| json!({ "value": value, "label": label }))
        .collect();

    Ok(Json(json!({
        "user": user,
        "participant": participant,
        "gender_choices": gender_choices,
    })))
}

/// Creates or updates the single participant profile of the current user.
pub async fn save_profile(
    State(pool): State<SqlitePool>,
    Extension(user): Extension<CurrentUser>,
    FormJson(payload): FormJson<ParticipantForm>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    sqlx::query(
        r#"
        INSERT INTO participants (user_id, name, student_class, age, gender, institution)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            name = excluded.name,
            student_class = excluded.student_class,
            age = excluded.age,
            gender = excluded.gender,
            institution = excluded.institution
        "#,
    )
    .bind(user.id)
    .bind(payload.name.trim())
    .bind(payload.student_class.trim())
    .bind(payload.age)
    .bind(&payload.gender)
    .bind(payload.institution.trim())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to save participant profile: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Redirect::to("/").success("Participant profile saved."))
}

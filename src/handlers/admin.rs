// src/handlers/admin.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    config::NEW_QUESTION_OPTION_ROWS,
    error::AppError,
    models::{
        question::{AnswerOption, OptionForm, Question, QuestionForm, QuestionWithOptions},
        quiz::{Quiz, QuizDetail, QuizForm, QuizSummary},
    },
    utils::{form::FormJson, redirect::Redirect},
};

async fn find_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>("SELECT id, title, description, is_published FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// A question, only if it belongs to `quiz_id`.
async fn find_question(
    pool: &SqlitePool,
    quiz_id: i64,
    question_id: i64,
) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, question_text FROM questions WHERE id = ? AND quiz_id = ?",
    )
    .bind(question_id)
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))
}

async fn options_of(pool: &SqlitePool, question_id: i64) -> Result<Vec<AnswerOption>, AppError> {
    let options = sqlx::query_as::<_, AnswerOption>(
        r#"
        SELECT id, question_id, option_text, is_correct
        FROM options
        WHERE question_id = ?
        ORDER BY id
        "#,
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;
    Ok(options)
}

/// Lists every quiz with its question count.
/// Staff only.
pub async fn dashboard(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT
            z.id, z.title, z.description, z.is_published,
            (SELECT COUNT(*) FROM questions q WHERE q.quiz_id = z.id) AS question_count
        FROM quizzes z
        ORDER BY z.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(json!({ "quizzes": quizzes })))
}

/// Empty quiz form.
pub async fn new_quiz_form() -> impl IntoResponse {
    Json(json!({
        "form": "quiz",
        "initial": { "title": "", "description": "" },
    }))
}

/// Creates a new (unpublished) quiz.
/// Staff only.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    FormJson(payload): FormJson<QuizForm>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let (title, description) = payload.cleaned();

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO quizzes (title, description, is_published) VALUES (?, ?, FALSE) RETURNING id",
    )
    .bind(title)
    .bind(description)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!("Created quiz {} ({})", id, title);

    Ok(Redirect::to(format!("/admin-panel/quizzes/{id}/"))
        .success("Quiz created successfully. Now add questions."))
}

/// Quiz with every question and option, correct flags included.
/// Staff only.
pub async fn quiz_detail(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, question_text FROM questions WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let options = sqlx::query_as::<_, AnswerOption>(
        r#"
        SELECT o.id, o.question_id, o.option_text, o.is_correct
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.quiz_id = ?
        ORDER BY o.id
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    let questions = questions
        .into_iter()
        .map(|question| QuestionWithOptions {
            options: by_question.remove(&question.id).unwrap_or_default(),
            question,
        })
        .collect();

    Ok(Json(QuizDetail { quiz, questions }))
}

/// Quiz form pre-filled with the current values.
pub async fn edit_quiz_form(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;

    Ok(Json(json!({
        "form": "quiz",
        "quiz": quiz,
        "initial": { "title": quiz.title, "description": quiz.description },
    })))
}

/// Updates title and description of a quiz.
/// Staff only.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
    FormJson(payload): FormJson<QuizForm>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;
    payload.validate()?;
    let (title, description) = payload.cleaned();

    sqlx::query("UPDATE quizzes SET title = ?, description = ? WHERE id = ?")
        .bind(title)
        .bind(description)
        .bind(quiz.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update quiz: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Redirect::to(format!("/admin-panel/quizzes/{}/", quiz.id))
        .success("Quiz updated successfully."))
}

/// Flips the published flag of a quiz.
/// Staff only, POST only.
pub async fn toggle_publish(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (id, is_published): (i64, bool) = sqlx::query_as(
        "UPDATE quizzes SET is_published = NOT is_published WHERE id = ? RETURNING id, is_published",
    )
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let state = if is_published { "published" } else { "unpublished" };
    tracing::info!("Quiz {} {}", id, state);

    Ok(Redirect::to(format!("/admin-panel/quizzes/{id}/"))
        .success(format!("Quiz {state} successfully.")))
}

/// Deletes a quiz with its questions, options and attempts.
/// Staff only, POST only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(Redirect::to("/admin-panel/").success("Quiz deleted successfully."))
}

/// Empty question form with blank option rows.
pub async fn new_question_form(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;

    Ok(Json(json!({
        "form": "question",
        "quiz": quiz,
        "initial": {
            "question_text": "",
            "options": vec![OptionForm::default(); NEW_QUESTION_OPTION_ROWS],
        },
    })))
}

/// Creates a question together with its options.
/// Staff only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
    FormJson(payload): FormJson<QuestionForm>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;
    payload.check(&[])?;

    let mut tx = pool.begin().await?;

    let (question_id,): (i64,) =
        sqlx::query_as("INSERT INTO questions (quiz_id, question_text) VALUES (?, ?) RETURNING id")
            .bind(quiz.id)
            .bind(payload.question_text.trim())
            .fetch_one(&mut *tx)
            .await?;

    save_options(&mut tx, question_id, &payload.options).await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Redirect::to(format!("/admin-panel/quizzes/{}/", quiz.id))
        .success("Question and options added."))
}

/// Question form pre-filled with the question and its options.
pub async fn edit_question_form(
    State(pool): State<SqlitePool>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;
    let question = find_question(&pool, quiz.id, question_id).await?;

    let rows: Vec<OptionForm> = options_of(&pool, question.id)
        .await?
        .into_iter()
        .map(|option| OptionForm {
            id: Some(option.id),
            option_text: option.option_text,
            is_correct: option.is_correct,
            delete: false,
        })
        .collect();

    Ok(Json(json!({
        "form": "question",
        "quiz": quiz,
        "question": question,
        "initial": {
            "question_text": question.question_text,
            "options": rows,
        },
    })))
}

/// Updates the question text and applies the option formset
/// (insert new rows, update existing, delete flagged). Options the formset
/// leaves out are kept as they are.
/// Staff only.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
    FormJson(payload): FormJson<QuestionForm>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;
    let question = find_question(&pool, quiz.id, question_id).await?;

    let existing = options_of(&pool, question.id).await?;
    payload.check(&existing)?;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE questions SET question_text = ? WHERE id = ?")
        .bind(payload.question_text.trim())
        .bind(question.id)
        .execute(&mut *tx)
        .await?;

    save_options(&mut tx, question.id, &payload.options).await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Redirect::to(format!("/admin-panel/quizzes/{}/", quiz.id))
        .success("Question updated successfully."))
}

/// Deletes a question and its options.
/// Staff only, POST only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path((quiz_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = find_quiz(&pool, quiz_id).await?;
    let question = find_question(&pool, quiz.id, question_id).await?;

    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(question.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Redirect::to(format!("/admin-panel/quizzes/{}/", quiz.id))
        .success("Question deleted successfully."))
}

/// Fallback for mutation endpoints hit with anything but POST.
pub async fn invalid_method() -> AppError {
    AppError::Forbidden("Invalid request method.".to_string())
}

/// Applies validated formset rows. Ownership of every `id` has already been
/// checked against the question.
async fn save_options(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: i64,
    rows: &[OptionForm],
) -> Result<(), AppError> {
    for row in rows {
        match (row.id, row.delete) {
            (Some(id), true) => {
                sqlx::query("DELETE FROM options WHERE id = ? AND question_id = ?")
                    .bind(id)
                    .bind(question_id)
                    .execute(&mut **tx)
                    .await?;
            }
            (Some(id), false) => {
                sqlx::query(
                    "UPDATE options SET option_text = ?, is_correct = ? WHERE id = ? AND question_id = ?",
                )
                .bind(row.option_text.trim())
                .bind(row.is_correct)
                .bind(id)
                .bind(question_id)
                .execute(&mut **tx)
                .await?;
            }
            (None, false) if !row.is_blank() => {
                sqlx::query(
                    "INSERT INTO options (question_id, option_text, is_correct) VALUES (?, ?, ?)",
                )
                .bind(question_id)
                .bind(row.option_text.trim())
                .bind(row.is_correct)
                .execute(&mut **tx)
                .await?;
            }
            // Blank or deleted new rows are never saved
            (None, _) => {}
        }
    }
    Ok(())
}

// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use rand::seq::SliceRandom;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    config::LEADERBOARD_SIZE,
    error::{AppError, FormErrors},
    models::{
        attempt::{AttemptSummary, LeaderboardEntry, QuizAttempt, QuizSubmission, ResultPage},
        participant::Participant,
        question::{AnswerOption, PublicChoice, PublicQuestion, Question},
        quiz::Quiz,
    },
    utils::{form::FormJson, redirect::Redirect},
};

/// Correct-answer lookup for one quiz.
/// Question ID -> (Option ID -> is_correct).
#[derive(Debug, Default)]
struct AnswerKey(HashMap<i64, HashMap<i64, bool>>);

impl AnswerKey {
    fn new(questions: &[Question], options: &[AnswerOption]) -> Self {
        let mut key: HashMap<i64, HashMap<i64, bool>> =
            questions.iter().map(|q| (q.id, HashMap::new())).collect();
        for option in options {
            if let Some(choices) = key.get_mut(&option.question_id) {
                choices.insert(option.id, option.is_correct);
            }
        }
        Self(key)
    }

    fn total(&self) -> i64 {
        self.0.len() as i64
    }

    /// One point per question whose chosen option is the correct one.
    ///
    /// Unanswered questions score nothing. A choice that is not an option of
    /// its question is a field error; answers to questions outside the quiz
    /// are ignored.
    fn grade(&self, answers: &HashMap<i64, i64>) -> Result<i64, FormErrors> {
        let mut errors = FormErrors::new();
        let mut score = 0;

        for (question_id, choices) in &self.0 {
            let Some(chosen) = answers.get(question_id) else {
                continue;
            };
            match choices.get(chosen) {
                Some(true) => score += 1,
                Some(false) => {}
                None => errors.add(
                    format!("question_{question_id}"),
                    format!("Select a valid choice. {chosen} is not one of the available choices."),
                ),
            }
        }

        if errors.is_empty() { Ok(score) } else { Err(errors) }
    }
}

/// Builds the radio-choice form with questions and options in random order.
fn shuffled_form(questions: Vec<Question>, options: Vec<AnswerOption>) -> Vec<PublicQuestion> {
    let mut rng = rand::thread_rng();

    let mut choices: HashMap<i64, Vec<PublicChoice>> = HashMap::new();
    for option in options {
        choices.entry(option.question_id).or_default().push(PublicChoice {
            id: option.id,
            option_text: option.option_text,
        });
    }

    let mut form: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|question| {
            let mut question_choices = choices.remove(&question.id).unwrap_or_default();
            question_choices.shuffle(&mut rng);
            PublicQuestion {
                id: question.id,
                field: format!("question_{}", question.id),
                question_text: question.question_text,
                choices: question_choices,
            }
        })
        .collect();
    form.shuffle(&mut rng);
    form
}

async fn published_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, description, is_published
        FROM quizzes
        WHERE id = ? AND is_published = TRUE
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Questions and options of a quiz. 404 when the quiz has no questions.
async fn quiz_content(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<(Vec<Question>, Vec<AnswerOption>), AppError> {
    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, question_text FROM questions WHERE quiz_id = ? ORDER BY id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    if questions.is_empty() {
        return Err(AppError::NotFound("No questions found for this quiz.".to_string()));
    }

    let options = sqlx::query_as::<_, AnswerOption>(
        r#"
        SELECT o.id, o.question_id, o.option_text, o.is_correct
        FROM options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.quiz_id = ?
        ORDER BY o.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok((questions, options))
}

/// Participant dashboard: published quizzes and the participant's own attempts.
pub async fn dashboard(
    State(pool): State<SqlitePool>,
    Extension(participant): Extension<Participant>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, title, description, is_published
        FROM quizzes
        WHERE is_published = TRUE
        ORDER BY id
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let attempts = sqlx::query_as::<_, AttemptSummary>(
        r#"
        SELECT a.id, a.quiz_id, q.title AS quiz_title, a.score, a.total, a.created_at
        FROM quiz_attempts a
        JOIN quizzes q ON q.id = a.quiz_id
        WHERE a.participant_id = ?
        ORDER BY a.score DESC, a.created_at ASC, a.id ASC
        "#,
    )
    .bind(participant.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "participant": participant,
        "quizzes": quizzes,
        "attempts": attempts,
    })))
}

/// Renders a published quiz as one radio-choice field per question.
/// The correct flags are never sent to the participant.
pub async fn take_quiz(
    State(pool): State<SqlitePool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = published_quiz(&pool, quiz_id).await?;
    let (questions, options) = quiz_content(&pool, quiz.id).await?;

    Ok(Json(json!({
        "quiz": quiz,
        "questions": shuffled_form(questions, options),
    })))
}

/// Scores a submitted quiz and records the attempt.
///
/// * Compares each chosen option with its `is_correct` flag.
/// * Stores score and total as a new, immutable attempt.
/// * Redirects to the result page.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    Extension(participant): Extension<Participant>,
    Path(quiz_id): Path<i64>,
    FormJson(submission): FormJson<QuizSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = published_quiz(&pool, quiz_id).await?;
    let (questions, options) = quiz_content(&pool, quiz.id).await?;

    let key = AnswerKey::new(&questions, &options);
    let score = key.grade(&submission.answers)?;
    let total = key.total();

    let (attempt_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO quiz_attempts (participant_id, quiz_id, score, total, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(participant.id)
    .bind(quiz.id)
    .bind(score)
    .bind(total)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record quiz attempt: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(
        "Participant {} scored {}/{} on quiz {}",
        participant.id,
        score,
        total,
        quiz.id
    );

    Ok(Redirect::to(format!("/result/{attempt_id}/")))
}

/// Shows one of the participant's own attempts with its rank and the top of
/// the quiz leaderboard.
///
/// Rank is dense over score (equal scores share a rank, the next lower score
/// is one rank further); rows with equal rank are listed earliest first.
pub async fn result(
    State(pool): State<SqlitePool>,
    Extension(participant): Extension<Participant>,
    Path(attempt_id): Path<i64>,
) -> Result<Response, AppError> {
    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, participant_id, quiz_id, score, total, created_at
        FROM quiz_attempts
        WHERE id = ? AND participant_id = ?
        "#,
    )
    .bind(attempt_id)
    .bind(participant.id)
    .fetch_optional(&pool)
    .await?;

    let Some(attempt) = attempt else {
        return Ok(Redirect::to("/")
            .error("Result not found for your account.")
            .into_response());
    };

    let (quiz_title,): (String,) = sqlx::query_as("SELECT title FROM quizzes WHERE id = ?")
        .bind(attempt.quiz_id)
        .fetch_one(&pool)
        .await?;

    let position: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT ranked."rank"
        FROM (
            SELECT id, DENSE_RANK() OVER (ORDER BY score DESC) AS "rank"
            FROM quiz_attempts
            WHERE quiz_id = ?
        ) AS ranked
        WHERE ranked.id = ?
        "#,
    )
    .bind(attempt.quiz_id)
    .bind(attempt.id)
    .fetch_optional(&pool)
    .await?;

    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT
            a.id AS attempt_id,
            DENSE_RANK() OVER (ORDER BY a.score DESC) AS "rank",
            p.name AS participant_name,
            a.score,
            a.total,
            a.created_at
        FROM quiz_attempts a
        JOIN participants p ON p.id = a.participant_id
        WHERE a.quiz_id = ?
        ORDER BY a.score DESC, a.created_at ASC, a.id ASC
        LIMIT ?
        "#,
    )
    .bind(attempt.quiz_id)
    .bind(LEADERBOARD_SIZE)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(ResultPage {
        attempt,
        quiz_title,
        participant_name: participant.name,
        position: position.map(|(rank,)| rank),
        leaderboard,
    })
    .into_response())
}

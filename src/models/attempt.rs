// src/models/attempt.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_attempts' table in the database.
/// One immutable row per submitted quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub participant_id: i64,
    pub quiz_id: i64,
    pub score: i64,
    pub total: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Dashboard row: an attempt joined with its quiz title.
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptSummary {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score: i64,
    pub total: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregated struct for displaying the leaderboard.
/// Represents a row joined from `participants` and `quiz_attempts`.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub attempt_id: i64,
    pub rank: i64,
    pub participant_name: String,
    pub score: i64,
    pub total: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Result page payload.
#[derive(Debug, Serialize)]
pub struct ResultPage {
    pub attempt: QuizAttempt,
    pub quiz_title: String,
    pub participant_name: String,
    /// Dense rank of this attempt among all attempts of the quiz.
    pub position: Option<i64>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// DTO for submitting a quiz.
#[derive(Debug, Default, Deserialize)]
pub struct QuizSubmission {
    /// Key: Question ID, Value: the selected Option ID.
    /// Questions left out are unanswered.
    #[serde(default)]
    pub answers: HashMap<i64, i64>,
}

// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{not_blank, question::QuestionWithOptions};

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Only published quizzes are visible to participants.
    pub is_published: bool,
}

/// Admin dashboard row.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub is_published: bool,
    pub question_count: i64,
}

/// Admin detail page: the quiz with every question and its options.
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
}

/// DTO for creating or editing a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct QuizForm {
    #[validate(
        length(max = 200, message = "Ensure this value has at most 200 characters."),
        custom(function = not_blank)
    )]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Ensure this value has at most 5000 characters."))]
    pub description: String,
}

impl QuizForm {
    /// Title and description with surrounding whitespace removed.
    pub fn cleaned(&self) -> (&str, &str) {
        (self.title.trim(), self.description.trim())
    }
}

// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::{error::FormErrors, models::not_blank};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub question_text: String,
}

/// Represents the 'options' table in the database.
/// Named `AnswerOption` to stay clear of `std::option::Option`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
}

/// A question with all of its options, correct flags included.
/// Only ever sent to staff.
#[derive(Debug, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

/// A choice as shown to a participant (no correctness flag).
#[derive(Debug, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub option_text: String,
}

/// One radio-choice field of the quiz form.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    /// Form field name, `question_<id>`.
    pub field: String,
    pub question_text: String,
    pub choices: Vec<PublicChoice>,
}

/// One row of the inline option formset.
///
/// Rows without an `id` are new; rows with one edit an existing option.
/// A blank new row is ignored, a blank existing row is an error.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[validate(schema(function = validate_option_row))]
pub struct OptionForm {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    #[validate(length(max = 300, message = "Ensure this value has at most 300 characters."))]
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub delete: bool,
}

impl OptionForm {
    pub fn is_blank(&self) -> bool {
        self.option_text.trim().is_empty()
    }

    /// Whether the row takes part in the formset count: kept and filled in.
    pub fn is_counted(&self) -> bool {
        !self.delete && !self.is_blank()
    }
}

fn validate_option_row(row: &OptionForm) -> Result<(), ValidationError> {
    if row.id.is_some() && !row.delete && row.is_blank() {
        return Err(ValidationError::new("required").with_message("This field is required.".into()));
    }
    Ok(())
}

/// Question form with its nested option formset.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionForm {
    #[validate(
        length(max = 5000, message = "Ensure this value has at most 5000 characters."),
        custom(function = not_blank)
    )]
    pub question_text: String,
    #[serde(default)]
    #[validate(nested)]
    pub options: Vec<OptionForm>,
}

impl QuestionForm {
    /// Runs field validation, the formset rules and the ownership check in
    /// one pass so that every problem is reported together.
    ///
    /// `existing` holds the options currently attached to the question
    /// (empty when creating). Existing options the formset leaves out are
    /// kept unchanged, so they count toward the formset rules.
    pub fn check(&self, existing: &[AnswerOption]) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        let known: HashSet<i64> = existing.iter().map(|option| option.id).collect();
        let mut seen = HashSet::new();
        for (index, row) in self.options.iter().enumerate() {
            let Some(id) = row.id else {
                continue;
            };
            if !known.contains(&id) {
                errors.add(
                    format!("options[{index}].id"),
                    "Select a valid choice. That choice is not one of the available choices.",
                );
            } else if !seen.insert(id) {
                errors.add(format!("options[{index}].id"), "Select a valid choice.");
            }
        }

        let untouched = existing
            .iter()
            .filter(|option| !seen.contains(&option.id))
            .map(|option| OptionForm {
                id: Some(option.id),
                option_text: option.option_text.clone(),
                is_correct: option.is_correct,
                delete: false,
            });
        let resulting: Vec<OptionForm> = self.options.iter().cloned().chain(untouched).collect();

        if let Err(e) = validate_option_formset(&resulting) {
            errors.add("options", e.message.as_deref().unwrap_or("invalid_options"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Formset-level rules: at least two options left after deletions and blank
/// rows are skipped, and exactly one of them marked correct.
pub fn validate_option_formset(rows: &[OptionForm]) -> Result<(), ValidationError> {
    let counted: Vec<&OptionForm> = rows.iter().filter(|row| row.is_counted()).collect();

    if counted.len() < 2 {
        return Err(ValidationError::new("too_few_options")
            .with_message("At least 2 options are required.".into()));
    }

    let correct = counted.iter().filter(|row| row.is_correct).count();
    if correct != 1 {
        return Err(ValidationError::new("correct_count")
            .with_message("Exactly 1 option must be marked as correct.".into()));
    }

    Ok(())
}

// src/models/participant.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use crate::models::not_blank;

/// Accepted values for `gender`, paired with their display labels.
pub const GENDER_CHOICES: [(&str, &str); 3] =
    [("male", "Male"), ("female", "Female"), ("other", "Other")];

/// Represents the 'participants' table.
/// One row per non-staff account that completed its profile.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub student_class: String,
    pub age: i64,
    pub gender: String,
    pub institution: String,
}

/// Profile form, used for both creating and updating.
#[derive(Debug, Deserialize, Validate)]
pub struct ParticipantForm {
    #[validate(
        length(max = 150, message = "Ensure this value has at most 150 characters."),
        custom(function = not_blank)
    )]
    pub name: String,
    #[validate(
        length(max = 100, message = "Ensure this value has at most 100 characters."),
        custom(function = not_blank)
    )]
    pub student_class: String,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub age: i64,
    #[validate(custom(function = validate_gender))]
    pub gender: String,
    #[validate(
        length(max = 200, message = "Ensure this value has at most 200 characters."),
        custom(function = not_blank)
    )]
    pub institution: String,
}

fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    if GENDER_CHOICES.iter().any(|(value, _)| *value == gender) {
        return Ok(());
    }
    Err(ValidationError::new("invalid_choice").with_message(
        format!("Select a valid choice. {gender} is not one of the available choices.").into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(age: i64, gender: &str) -> ParticipantForm {
        ParticipantForm {
            name: "Ada".into(),
            student_class: "10".into(),
            age,
            gender: gender.into(),
            institution: "Central High".into(),
        }
    }

    #[test]
    fn accepts_known_gender() {
        assert!(form(15, "female").validate().is_ok());
    }

    #[test]
    fn rejects_unknown_gender_and_negative_age() {
        let errors = form(-1, "robot").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("gender"));
        assert!(fields.contains_key("age"));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Input structure for creating a task.
///
/// An attachment is supplied as a pair of fields: `file_name` (the local
/// filename; only its base name is used as the object key) and
/// `file_content` (base64-encoded bytes). Either both are present or
/// neither is.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Filename of an attachment to store alongside the task.
    pub file_name: Option<String>,

    /// Base64-encoded attachment content.
    pub file_content: Option<String>,
}

/// Partial update for an existing task. Only the supplied fields are
/// applied; absent fields keep their current value.
#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub completed: Option<bool>,

    /// Replacement attachment; the previously stored object is removed
    /// once the new one is in place.
    pub file_name: Option<String>,

    pub file_content: Option<String>,
}

/// A task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: i32,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
    /// The title of the task.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Object name of the stored attachment, if any.
    pub file_name: Option<String>,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_input_validation() {
        let valid_input = TaskInput {
            title: "Valid Task".to_string(),
            description: Some("Valid Description".to_string()),
            file_name: None,
            file_content: None,
        };
        assert!(valid_input.validate().is_ok());

        let invalid_input_empty_title = TaskInput {
            title: "".to_string(),
            description: Some("Test Description".to_string()),
            file_name: None,
            file_content: None,
        };
        assert!(
            invalid_input_empty_title.validate().is_err(),
            "Validation should fail for empty title."
        );

        let invalid_input_long_title = TaskInput {
            title: "a".repeat(201),
            description: None,
            file_name: None,
            file_content: None,
        };
        assert!(
            invalid_input_long_title.validate().is_err(),
            "Validation should fail for overly long title."
        );

        let invalid_input_long_desc = TaskInput {
            title: "Valid title for desc test".to_string(),
            description: Some("b".repeat(1001)),
            file_name: None,
            file_content: None,
        };
        assert!(
            invalid_input_long_desc.validate().is_err(),
            "Validation should fail for overly long description."
        );
    }

    #[test]
    fn test_task_update_validation() {
        // All fields absent is a valid (no-op) update payload.
        let empty = TaskUpdate::default();
        assert!(empty.validate().is_ok());

        let completed_only = TaskUpdate {
            completed: Some(true),
            ..TaskUpdate::default()
        };
        assert!(completed_only.validate().is_ok());

        let empty_title = TaskUpdate {
            title: Some("".to_string()),
            ..TaskUpdate::default()
        };
        assert!(
            empty_title.validate().is_err(),
            "A supplied title must still be non-empty."
        );
    }
}

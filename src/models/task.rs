use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Input structure for creating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 3 and 100 characters.
    #[validate(length(min = 3, max = 100))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 500 characters if provided.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Input structure for updating a task. Every field is optional; omitted
/// fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskUpdate {
    /// A new title, subject to the same bounds as at creation.
    #[validate(length(min = 3, max = 100))]
    pub title: Option<String>,

    /// A new description, bounded to 500 characters.
    #[validate(length(max = 500))]
    pub description: Option<String>,

    /// The completion flag. Toggles freely; there are no transition rules.
    pub completed: Option<bool>,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// The title of the task.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new `Task` instance from `TaskInput` and the owner's `user_id`.
    /// Sets `created_at` and `updated_at` to the current time, `completed` to
    /// false, and `id` to a new UUID.
    pub fn new(input: TaskInput, user_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            completed: false,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

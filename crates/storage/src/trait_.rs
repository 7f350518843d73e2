//! Storage trait abstractions.

use async_trait::async_trait;
use learnpath_core::{Course, CourseId, CurriculumError, ProgressEvent, UserId, UserProgress};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Curriculum failed validation
    #[error("invalid curriculum: {0}")]
    Curriculum(#[from] CurriculumError),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Persistent store for user progress documents.
///
/// The store holds one `UserProgress` document per user. Writers replace
/// the whole document; last write wins.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load a user's progress document.
    async fn load_user_progress(&self, user: &UserId) -> Result<Option<UserProgress>>;

    /// Save (create or replace) a user's progress document.
    async fn save_user_progress(&mut self, user: &UserId, progress: &UserProgress) -> Result<()>;

    /// Append an event to the activity log.
    async fn append_event(&mut self, event: &ProgressEvent) -> Result<()>;

    /// List a user's events, oldest first.
    async fn list_events(&self, user: &UserId) -> Result<Vec<ProgressEvent>>;
}

/// Read-only source of course curricula.
#[async_trait]
pub trait CurriculumSource: Send + Sync {
    /// Load a course by ID.
    async fn load_course(&self, id: &CourseId) -> Result<Option<Course>>;

    /// List all courses.
    async fn list_courses(&self) -> Result<Vec<Course>>;
}

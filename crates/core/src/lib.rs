//! learnpath core data models.
//!
//! This crate defines the curriculum structure supplied by the course
//! provider and the per-user progress records the tracker maintains.

#![warn(missing_docs)]

// Identities
mod id;

// Read-only course structure
mod curriculum;

// Mutable learner state
mod progress;
mod event;

// Re-exports
pub use id::*;

pub use curriculum::{ContentItem, ContentType, Course, CurriculumError, Video, WeekPlan};
pub use progress::{CourseProgress, UserProgress, WeekItems};
pub use event::{ProgressEvent, ProgressEventKind};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

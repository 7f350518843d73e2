//! Progress Tracking
//!
//! Per-course completion state: marking items complete, counting video
//! views, week completion, percentages and quiz gating.

#![warn(missing_docs)]

pub mod policy;
pub mod tracker;
pub mod service;

pub use policy::{ProgressPolicy, DEFAULT_QUIZ_UNLOCK_THRESHOLD, DEFAULT_VIDEO_COMPLETION_THRESHOLD};
pub use tracker::{
    CourseSummary, MarkOutcome, ProgressTracker, QuizGate, WatchOutcome, WeekCompletion, WeekSummary,
};
pub use service::{Applied, ProgressService, Result, ServiceError, Session};

//! Progress events - append-only activity log.

use serde::{Deserialize, Serialize};
use crate::curriculum::ContentType;
use crate::id::{CourseId, EventId, UserId, WeekNumber};
use crate::Time;

/// A state change recorded for one user in one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Unique identifier
    pub id: EventId,

    /// Whose progress changed
    pub user_id: UserId,

    /// Which course
    pub course_id: CourseId,

    /// When it happened
    pub timestamp: Time,

    /// What happened
    pub kind: ProgressEventKind,
}

impl ProgressEvent {
    /// Create a new event stamped now.
    pub fn new(user_id: UserId, course_id: CourseId, kind: ProgressEventKind) -> Self {
        Self {
            id: EventId::new(),
            user_id,
            course_id,
            timestamp: chrono::Utc::now(),
            kind,
        }
    }
}

/// Kinds of progress events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEventKind {
    /// User enrolled in the course
    Enrolled,

    /// An item was marked complete
    #[serde(rename_all = "camelCase")]
    ItemCompleted {
        /// Week
        week: WeekNumber,
        /// Content type
        content_type: ContentType,
        /// Item identifier
        item_id: String,
    },

    /// A video view was counted
    #[serde(rename_all = "camelCase")]
    VideoWatched {
        /// Week
        week: WeekNumber,
        /// Video identifier
        video_id: String,
        /// View count after this view
        count: u32,
    },

    /// Every video of a week is complete
    WeekCompleted {
        /// Week
        week: WeekNumber,
    },

    /// The user opened a week
    WeekOpened {
        /// Week
        week: WeekNumber,
    },
}

impl std::fmt::Display for ProgressEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressEventKind::Enrolled => write!(f, "enrolled"),
            ProgressEventKind::ItemCompleted { week, content_type, item_id } => {
                write!(f, "week {week}: completed {content_type} {item_id:?}")
            }
            ProgressEventKind::VideoWatched { week, video_id, count } => {
                write!(f, "week {week}: watched {video_id:?} ({count})")
            }
            ProgressEventKind::WeekCompleted { week } => write!(f, "week {week} completed"),
            ProgressEventKind::WeekOpened { week } => write!(f, "opened week {week}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = ProgressEvent::new(
            UserId::parse("u1").unwrap(),
            CourseId::parse("rust").unwrap(),
            ProgressEventKind::ItemCompleted {
                week: 2,
                content_type: ContentType::Lessons,
                item_id: "Intro".to_string(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["kind"]["type"], "itemCompleted");
        assert_eq!(json["kind"]["contentType"], "lessons");
        assert_eq!(json["kind"]["itemId"], "Intro");

        let back: ProgressEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_display() {
        let kind = ProgressEventKind::VideoWatched {
            week: 1,
            video_id: "V1".to_string(),
            count: 3,
        };
        assert_eq!(kind.to_string(), "week 1: watched \"V1\" (3)");
    }
}

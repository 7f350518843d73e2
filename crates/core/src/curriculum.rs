//! Curriculum model - read-only course structure supplied by the provider.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use crate::id::{CourseId, WeekNumber};

/// Kind of content inside a curriculum week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Lessons
    Lessons,
    /// Readings
    Readings,
    /// Videos
    Videos,
    /// Assignments
    Assignments,
}

impl ContentType {
    /// All content types, in display order.
    pub const ALL: [ContentType; 4] = [
        ContentType::Lessons,
        ContentType::Readings,
        ContentType::Videos,
        ContentType::Assignments,
    ];

    /// Wire name of the content type.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Lessons => "lessons",
            ContentType::Readings => "readings",
            ContentType::Videos => "videos",
            ContentType::Assignments => "assignments",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = CurriculumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lessons" | "lesson" => Ok(ContentType::Lessons),
            "readings" | "reading" => Ok(ContentType::Readings),
            "videos" | "video" => Ok(ContentType::Videos),
            "assignments" | "assignment" => Ok(ContentType::Assignments),
            other => Err(CurriculumError::UnknownContentType(other.to_string())),
        }
    }
}

/// Errors found while validating a curriculum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurriculumError {
    /// Two weeks share a number
    #[error("course {course}: week {week} appears more than once")]
    DuplicateWeek {
        /// Course
        course: CourseId,
        /// Week number
        week: WeekNumber,
    },

    /// Two items of one type in one week share an identifier
    #[error("course {course}: week {week} has duplicate {content_type} item {item:?}")]
    DuplicateItem {
        /// Course
        course: CourseId,
        /// Week number
        week: WeekNumber,
        /// Content type
        content_type: ContentType,
        /// Identifier
        item: String,
    },

    /// Unrecognised content type name
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
}

/// A lesson, reading or assignment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Display title
    pub title: String,

    /// Explicit stable id; the title is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ContentItem {
    /// Item keyed by its title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: None,
        }
    }

    /// Identifier used in progress records.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.title)
    }
}

/// A video entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    /// Display title
    pub title: String,

    /// Where the video is hosted
    #[serde(default)]
    pub url: String,

    /// Explicit stable id; the title is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Video {
    /// Video keyed by its title.
    pub fn titled(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            id: None,
        }
    }

    /// Identifier used in progress records.
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.title)
    }
}

/// One week of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlan {
    /// Week number
    pub week: WeekNumber,

    /// Week title
    #[serde(default)]
    pub title: String,

    /// Lessons
    #[serde(default)]
    pub lessons: Vec<ContentItem>,

    /// Readings
    #[serde(default)]
    pub readings: Vec<ContentItem>,

    /// Videos
    #[serde(default)]
    pub videos: Vec<Video>,

    /// Assignments
    #[serde(default)]
    pub assignments: Vec<ContentItem>,

    /// Quiz attached to this week, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
}

impl WeekPlan {
    /// Empty week with the given number and title.
    pub fn new(week: WeekNumber, title: impl Into<String>) -> Self {
        Self {
            week,
            title: title.into(),
            lessons: Vec::new(),
            readings: Vec::new(),
            videos: Vec::new(),
            assignments: Vec::new(),
            quiz_id: None,
        }
    }

    /// Identifiers of all items of one content type, in curriculum order.
    pub fn item_keys(&self, content_type: ContentType) -> Vec<&str> {
        match content_type {
            ContentType::Lessons => self.lessons.iter().map(ContentItem::key).collect(),
            ContentType::Readings => self.readings.iter().map(ContentItem::key).collect(),
            ContentType::Videos => self.videos.iter().map(Video::key).collect(),
            ContentType::Assignments => self.assignments.iter().map(ContentItem::key).collect(),
        }
    }

    /// Whether the week enumerates the given item.
    pub fn contains(&self, content_type: ContentType, item: &str) -> bool {
        self.item_keys(content_type).contains(&item)
    }
}

/// A course curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course id
    pub id: CourseId,

    /// Course title
    #[serde(default)]
    pub title: String,

    /// Ordered weeks
    #[serde(default)]
    pub weeks: Vec<WeekPlan>,
}

impl Course {
    /// Create an empty course.
    pub fn new(id: CourseId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            weeks: Vec::new(),
        }
    }

    /// Add a week (builder style).
    pub fn with_week(mut self, week: WeekPlan) -> Self {
        self.weeks.push(week);
        self
    }

    /// Look up a week by number.
    pub fn week(&self, week: WeekNumber) -> Option<&WeekPlan> {
        self.weeks.iter().find(|w| w.week == week)
    }

    /// Check week numbers and per-type identifiers are unique.
    pub fn validate(&self) -> Result<(), CurriculumError> {
        let mut weeks = BTreeSet::new();
        for plan in &self.weeks {
            if !weeks.insert(plan.week) {
                return Err(CurriculumError::DuplicateWeek {
                    course: self.id.clone(),
                    week: plan.week,
                });
            }
            for content_type in ContentType::ALL {
                let mut seen = BTreeSet::new();
                for key in plan.item_keys(content_type) {
                    if !seen.insert(key) {
                        return Err(CurriculumError::DuplicateItem {
                            course: self.id.clone(),
                            week: plan.week,
                            content_type,
                            item: key.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> Course {
        let mut week = WeekPlan::new(1, "Basics");
        week.lessons.push(ContentItem::titled("Intro"));
        week.lessons.push(ContentItem {
            title: "Intro".to_string(),
            id: Some("intro-2".to_string()),
        });
        week.videos.push(Video::titled("V1", "https://example.com/v1"));
        Course::new(CourseId::parse("rust").unwrap(), "Rust").with_week(week)
    }

    #[test]
    fn test_item_keys_prefer_explicit_id() {
        let course = course();
        let week = course.week(1).unwrap();
        assert_eq!(week.item_keys(ContentType::Lessons), vec!["Intro", "intro-2"]);
        assert!(week.contains(ContentType::Videos, "V1"));
        assert!(!week.contains(ContentType::Readings, "V1"));
    }

    #[test]
    fn test_validate_accepts_unique_ids() {
        assert!(course().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut dup_item = course();
        dup_item.weeks[0].videos.push(Video::titled("V1", ""));
        assert!(matches!(
            dup_item.validate(),
            Err(CurriculumError::DuplicateItem { content_type: ContentType::Videos, .. })
        ));

        let dup_week = course().with_week(WeekPlan::new(1, "Again"));
        assert!(matches!(
            dup_week.validate(),
            Err(CurriculumError::DuplicateWeek { week: 1, .. })
        ));
    }

    #[test]
    fn test_week_plan_deserializes_with_defaults() {
        let json = r#"{"week": 3, "title": "Async", "videos": [{"title": "Futures", "url": "u"}], "quizId": "q3"}"#;
        let week: WeekPlan = serde_json::from_str(json).unwrap();
        assert_eq!(week.week, 3);
        assert!(week.lessons.is_empty());
        assert_eq!(week.quiz_id.as_deref(), Some("q3"));
        assert_eq!(week.item_keys(ContentType::Videos), vec!["Futures"]);
    }

    #[test]
    fn test_content_type_parse() {
        assert_eq!("Videos".parse::<ContentType>().unwrap(), ContentType::Videos);
        assert_eq!("lesson".parse::<ContentType>().unwrap(), ContentType::Lessons);
        assert!("quiz".parse::<ContentType>().is_err());
    }
}

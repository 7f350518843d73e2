//! Progress records - per-user, per-course completion state.
//!
//! Records are append-only: items, weeks and watch counts are only ever
//! added or increased. Every nested level defaults on construction, so a
//! missing week or content type is simply an empty set.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use crate::curriculum::ContentType;
use crate::id::{CourseId, WeekNumber};

/// Completed item identifiers of one week, one ordered set per content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekItems {
    /// Completed lessons
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub lessons: BTreeSet<String>,

    /// Completed readings
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub readings: BTreeSet<String>,

    /// Completed videos
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub videos: BTreeSet<String>,

    /// Completed assignments
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub assignments: BTreeSet<String>,
}

impl WeekItems {
    /// Completed identifiers of one content type.
    pub fn get(&self, content_type: ContentType) -> &BTreeSet<String> {
        match content_type {
            ContentType::Lessons => &self.lessons,
            ContentType::Readings => &self.readings,
            ContentType::Videos => &self.videos,
            ContentType::Assignments => &self.assignments,
        }
    }

    fn get_mut(&mut self, content_type: ContentType) -> &mut BTreeSet<String> {
        match content_type {
            ContentType::Lessons => &mut self.lessons,
            ContentType::Readings => &mut self.readings,
            ContentType::Videos => &mut self.videos,
            ContentType::Assignments => &mut self.assignments,
        }
    }
}

/// Progress of one user in one course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    /// Weeks fully finished
    #[serde(default)]
    pub completed_weeks: BTreeSet<WeekNumber>,

    /// Last week the user opened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed_week: Option<WeekNumber>,

    /// week -> content type -> completed identifiers
    #[serde(default)]
    pub completed_items: BTreeMap<WeekNumber, WeekItems>,

    /// week -> video identifier -> view count
    #[serde(default)]
    pub video_watch_counts: BTreeMap<WeekNumber, BTreeMap<String, u32>>,
}

impl CourseProgress {
    /// Empty skeleton.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the item is recorded as complete.
    pub fn is_item_complete(&self, week: WeekNumber, content_type: ContentType, item: &str) -> bool {
        self.completed_items
            .get(&week)
            .is_some_and(|items| items.get(content_type).contains(item))
    }

    /// Completed identifiers for a (week, type) pair; empty when absent.
    pub fn completed(&self, week: WeekNumber, content_type: ContentType) -> impl Iterator<Item = &str> {
        self.completed_items
            .get(&week)
            .into_iter()
            .flat_map(move |items| items.get(content_type).iter().map(String::as_str))
    }

    /// Insert an item. Returns `false` when it was already present.
    pub fn insert_item(&mut self, week: WeekNumber, content_type: ContentType, item: &str) -> bool {
        let set = self.completed_items.entry(week).or_default().get_mut(content_type);
        if set.contains(item) {
            return false;
        }
        set.insert(item.to_string())
    }

    /// Current view count of a video (0 when never watched).
    pub fn watch_count(&self, week: WeekNumber, video: &str) -> u32 {
        self.video_watch_counts
            .get(&week)
            .and_then(|counts| counts.get(video))
            .copied()
            .unwrap_or(0)
    }

    /// Increment a video's view count and return the new value.
    pub fn increment_watch(&mut self, week: WeekNumber, video: &str) -> u32 {
        let count = self
            .video_watch_counts
            .entry(week)
            .or_default()
            .entry(video.to_string())
            .or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Add a finished week. Returns `false` when it was already present.
    pub fn insert_week(&mut self, week: WeekNumber) -> bool {
        self.completed_weeks.insert(week)
    }
}

/// All course progress of one user (the `userProgress` document).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Courses in enrollment order
    #[serde(default)]
    pub enrolled_courses: Vec<CourseId>,

    /// course id -> progress
    #[serde(default, rename = "userProgress")]
    pub courses: BTreeMap<CourseId, CourseProgress>,
}

impl UserProgress {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress for a course, if any was recorded.
    pub fn course(&self, course: &CourseId) -> Option<&CourseProgress> {
        self.courses.get(course)
    }

    /// Progress for a course, created (and the course enrolled) when absent.
    pub fn course_mut(&mut self, course: &CourseId) -> &mut CourseProgress {
        self.enroll(course);
        self.courses.entry(course.clone()).or_default()
    }

    /// Record enrollment. Returns `false` when already enrolled.
    pub fn enroll(&mut self, course: &CourseId) -> bool {
        if self.enrolled_courses.contains(course) {
            return false;
        }
        self.enrolled_courses.push(course.clone());
        true
    }

    /// Whether the user is enrolled in the course.
    pub fn is_enrolled(&self, course: &CourseId) -> bool {
        self.enrolled_courses.contains(course)
    }
}

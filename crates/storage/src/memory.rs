//! In-memory storage, for embedding and tests.

use std::collections::BTreeMap;

use learnpath_core::{Course, CourseId, ProgressEvent, UserId, UserProgress};
use super::{CurriculumSource, ProgressStore, Result, StorageError};

/// Progress store backed by maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: BTreeMap<UserId, UserProgress>,
    events: Vec<ProgressEvent>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of stored user documents.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(StorageError::Other("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProgressStore for MemoryStore {
    async fn load_user_progress(&self, user: &UserId) -> Result<Option<UserProgress>> {
        Ok(self.users.get(user).cloned())
    }

    async fn save_user_progress(&mut self, user: &UserId, progress: &UserProgress) -> Result<()> {
        self.check_writable()?;
        self.users.insert(user.clone(), progress.clone());
        Ok(())
    }

    async fn append_event(&mut self, event: &ProgressEvent) -> Result<()> {
        self.check_writable()?;
        self.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, user: &UserId) -> Result<Vec<ProgressEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| &e.user_id == user)
            .cloned()
            .collect())
    }
}

/// Fixed set of curricula held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticCurriculum {
    courses: BTreeMap<CourseId, Course>,
}

impl StaticCurriculum {
    /// Build from validated courses.
    pub fn new(courses: impl IntoIterator<Item = Course>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for course in courses {
            course.validate()?;
            map.insert(course.id.clone(), course);
        }
        Ok(Self { courses: map })
    }
}

#[async_trait::async_trait]
impl CurriculumSource for StaticCurriculum {
    async fn load_course(&self, id: &CourseId) -> Result<Option<Course>> {
        Ok(self.courses.get(id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.courses.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::{Video, WeekPlan};

    #[tokio::test]
    async fn test_fail_writes_keeps_previous_document() {
        let mut store = MemoryStore::new();
        let alice = UserId::parse("alice").unwrap();
        let rust = CourseId::parse("rust").unwrap();

        let mut progress = UserProgress::new();
        progress.enroll(&rust);
        store.save_user_progress(&alice, &progress).await.unwrap();

        store.set_fail_writes(true);
        progress.course_mut(&rust).insert_week(1);
        assert!(store.save_user_progress(&alice, &progress).await.is_err());

        let stored = store.load_user_progress(&alice).await.unwrap().unwrap();
        assert!(stored.course(&rust).is_none());
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_static_curriculum_rejects_duplicates() {
        let mut week = WeekPlan::new(1, "Basics");
        week.videos.push(Video::titled("V1", ""));
        week.videos.push(Video::titled("V1", ""));
        let course = Course::new(CourseId::parse("rust").unwrap(), "Rust").with_week(week);

        assert!(matches!(
            StaticCurriculum::new([course]),
            Err(StorageError::Curriculum(_))
        ));
    }
}

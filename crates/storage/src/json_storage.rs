//! JSON file storage implementation.
//!
//! Stores data as JSON files under a data directory and keeps small
//! per-object meta markers (version + updated_at):
//!
//! ```text
//! <root>/users/<user>.json            userProgress document
//! <root>/meta/users/<user>.meta.json  version marker
//! <root>/events/<ulid>.json           activity log
//! <root>/courses/<course>.json        curriculum (read-only)
//! ```

use std::path::{Path, PathBuf};

use learnpath_core::{Course, CourseId, ProgressEvent, UserId, UserProgress};
use super::{CurriculumSource, ProgressStore, Result};
use tokio::fs;
use tracing::{debug, warn};

/// File-based JSON progress store.
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Create storage. This will create the subdirectories needed for data
    /// and meta markers.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("users")).await?;
        fs::create_dir_all(root.join("events")).await?;
        fs::create_dir_all(root.join("meta").join("users")).await?;

        Ok(Self { root })
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_path(&self, id: &UserId) -> PathBuf {
        self.root.join("users").join(format!("{}.json", id))
    }

    fn event_path(&self, event: &ProgressEvent) -> PathBuf {
        self.root.join("events").join(format!("{}.json", event.id))
    }

    fn meta_path(&self, kind: &str, id: &str) -> PathBuf {
        self.root.join("meta").join(kind).join(format!("{}.meta.json", id))
    }

    /// Read and increment per-object version, return new version.
    async fn bump_version(&self, kind: &str, id: &str) -> Result<u64> {
        let path = self.meta_path(kind, id);
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        fs::write(&path, serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        Ok(version)
    }

    /// Current version marker of a user's document (0 when never saved).
    pub async fn user_version(&self, user: &UserId) -> Result<u64> {
        let meta: Option<serde_json::Value> =
            read_json(&self.meta_path("users", user.as_str())).await?;
        Ok(meta
            .and_then(|m| m.get("version").and_then(|v| v.as_u64()))
            .unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl ProgressStore for JsonStore {
    async fn load_user_progress(&self, user: &UserId) -> Result<Option<UserProgress>> {
        read_json(&self.user_path(user)).await
    }

    async fn save_user_progress(&mut self, user: &UserId, progress: &UserProgress) -> Result<()> {
        let path = self.user_path(user);
        write_json(&path, progress).await?;

        let version = self.bump_version("users", user.as_str()).await?;
        debug!("Saved progress for {} (v{})", user, version);
        Ok(())
    }

    async fn append_event(&mut self, event: &ProgressEvent) -> Result<()> {
        write_json(&self.event_path(event), event).await
    }

    async fn list_events(&self, user: &UserId) -> Result<Vec<ProgressEvent>> {
        let all = list_dir(&self.root.join("events")).await?;
        let mut events: Vec<ProgressEvent> = all
            .into_iter()
            .filter(|e: &ProgressEvent| &e.user_id == user)
            .collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(events)
    }
}

/// Curricula read from `<root>/courses/*.json`.
pub struct JsonCurriculum {
    root: PathBuf,
}

impl JsonCurriculum {
    /// Open the curriculum directory under a data root.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().join("courses"),
        }
    }

    fn course_path(&self, id: &CourseId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

#[async_trait::async_trait]
impl CurriculumSource for JsonCurriculum {
    async fn load_course(&self, id: &CourseId) -> Result<Option<Course>> {
        let course: Option<Course> = read_json(&self.course_path(id)).await?;
        if let Some(course) = &course {
            course.validate()?;
        }
        Ok(course)
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        if !fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }
        let mut courses: Vec<Course> = list_dir(&self.root).await?;
        courses.retain(|c| match c.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping course {}: {}", c.id, e);
                false
            }
        });
        courses.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(courses)
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    // Write then rename so readers never see a half-written document.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&entry.path()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable {}: {}", entry.path().display(), e),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::{ContentType, ProgressEventKind, Video, WeekPlan};

    fn user(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_progress_round_trip_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();
        let alice = user("alice");
        let rust = CourseId::parse("rust").unwrap();

        assert!(store.load_user_progress(&alice).await.unwrap().is_none());
        assert_eq!(store.user_version(&alice).await.unwrap(), 0);

        let mut progress = UserProgress::new();
        progress.course_mut(&rust).insert_item(1, ContentType::Lessons, "Intro");
        store.save_user_progress(&alice, &progress).await.unwrap();
        store.save_user_progress(&alice, &progress).await.unwrap();

        let loaded = store.load_user_progress(&alice).await.unwrap().unwrap();
        assert_eq!(loaded, progress);
        assert_eq!(store.user_version(&alice).await.unwrap(), 2);
        assert!(!dir.path().join("users").join("alice.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_events_filtered_by_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();
        let rust = CourseId::parse("rust").unwrap();

        for (who, week) in [("alice", 1), ("bob", 2), ("alice", 3)] {
            let event = ProgressEvent::new(
                user(who),
                rust.clone(),
                ProgressEventKind::WeekOpened { week },
            );
            store.append_event(&event).await.unwrap();
        }

        let events = store.list_events(&user("alice")).await.unwrap();
        let mut weeks: Vec<_> = events
            .iter()
            .map(|e| match e.kind {
                ProgressEventKind::WeekOpened { week } => week,
                _ => 0,
            })
            .collect();
        weeks.sort_unstable();
        assert_eq!(weeks, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_curriculum_loading_validates() {
        let dir = tempfile::tempdir().unwrap();
        let courses = dir.path().join("courses");
        std::fs::create_dir_all(&courses).unwrap();

        let mut week = WeekPlan::new(1, "Basics");
        week.videos.push(Video::titled("V1", "u"));
        let good = Course::new(CourseId::parse("good").unwrap(), "Good").with_week(week.clone());
        std::fs::write(courses.join("good.json"), serde_json::to_string(&good).unwrap()).unwrap();

        week.videos.push(Video::titled("V1", "u"));
        let bad = Course::new(CourseId::parse("bad").unwrap(), "Bad").with_week(week);
        std::fs::write(courses.join("bad.json"), serde_json::to_string(&bad).unwrap()).unwrap();

        let source = JsonCurriculum::new(dir.path());
        assert_eq!(source.load_course(&good.id).await.unwrap(), Some(good.clone()));
        assert!(matches!(
            source.load_course(&bad.id).await,
            Err(crate::StorageError::Curriculum(_))
        ));
        assert!(source
            .load_course(&CourseId::parse("missing").unwrap())
            .await
            .unwrap()
            .is_none());

        let listed = source.list_courses().await.unwrap();
        assert_eq!(listed, vec![good]);
    }

    #[tokio::test]
    async fn test_list_courses_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonCurriculum::new(dir.path());
        assert!(source.list_courses().await.unwrap().is_empty());
    }
}

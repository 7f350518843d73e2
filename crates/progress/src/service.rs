//! Progress service - applies tracker operations against the stores.
//!
//! The caller passes the session and course explicitly. Each mutation loads
//! the user's document (cached after the first read), applies one tracker
//! operation, queues progress events and writes the whole document back.
//! A failed write leaves the change applied in memory; the next mutation or
//! an explicit [`ProgressService::flush`] retries it.

use std::collections::HashMap;

use learnpath_core::{
    ContentType, Course, CourseId, CourseProgress, ProgressEvent, ProgressEventKind, UserId,
    UserProgress, WeekNumber,
};
use learnpath_storage::{CurriculumSource, ProgressStore, StorageError};
use tracing::{debug, info, warn};

use crate::policy::ProgressPolicy;
use crate::tracker::{CourseSummary, MarkOutcome, ProgressTracker, WatchOutcome};

/// Error type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors returned by [`ProgressService`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The curriculum source has no such course
    #[error("unknown course: {0}")]
    UnknownCourse(CourseId),

    /// Reading progress or curriculum failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The change is applied in memory but could not be written
    #[error("progress for {user} not saved (kept in memory, retry later): {source}")]
    Persistence {
        /// Affected user
        user: UserId,
        /// Underlying store failure
        #[source]
        source: StorageError,
    },
}

impl ServiceError {
    /// Whether retrying (e.g. [`ProgressService::flush`]) may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Persistence { .. })
    }
}

/// Identity of the user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Current user
    pub user_id: UserId,
}

impl Session {
    /// Session for a user.
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Outcome of a mutation plus the user's full updated document.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    /// Operation outcome
    pub outcome: T,
    /// The document as written back to the store
    pub progress: UserProgress,
}

#[derive(Debug, Default)]
struct CachedUser {
    progress: UserProgress,
    pending_events: Vec<ProgressEvent>,
    dirty: bool,
}

impl CachedUser {
    fn needs_flush(&self) -> bool {
        self.dirty || !self.pending_events.is_empty()
    }
}

/// Progress service over a store and a curriculum source.
pub struct ProgressService<S: ProgressStore, C: CurriculumSource> {
    store: S,
    curriculum: C,
    policy: ProgressPolicy,
    cache: HashMap<UserId, CachedUser>,
}

impl<S: ProgressStore, C: CurriculumSource> ProgressService<S, C> {
    /// Create a new service with the default (gated) policy.
    pub fn new(store: S, curriculum: C) -> Self {
        Self {
            store,
            curriculum,
            policy: ProgressPolicy::default(),
            cache: HashMap::new(),
        }
    }

    /// Set the policy.
    pub fn with_policy(mut self, policy: ProgressPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The policy in effect.
    pub fn policy(&self) -> &ProgressPolicy {
        &self.policy
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Underlying store (mutable).
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Curriculum of a course.
    pub async fn course(&self, id: &CourseId) -> Result<Course> {
        self.curriculum
            .load_course(id)
            .await?
            .ok_or_else(|| ServiceError::UnknownCourse(id.clone()))
    }

    /// All courses offered by the curriculum source.
    pub async fn courses(&self) -> Result<Vec<Course>> {
        Ok(self.curriculum.list_courses().await?)
    }

    /// Enroll the user, creating an empty record. Returns `false` when
    /// already enrolled.
    pub async fn enroll(&mut self, session: &Session, course_id: &CourseId) -> Result<Applied<bool>> {
        self.course(course_id).await?;
        let user = &session.user_id;
        let cached = self.load(user).await?;

        let newly = cached.progress.enroll(course_id);
        if cached.progress.course(course_id).is_none() {
            cached.progress.course_mut(course_id);
            cached.dirty = true;
        }
        if newly {
            info!("{} enrolled in {}", user, course_id);
            cached
                .pending_events
                .push(ProgressEvent::new(user.clone(), course_id.clone(), ProgressEventKind::Enrolled));
            cached.dirty = true;
        }
        let progress = cached.progress.clone();

        self.persist(user).await?;
        Ok(Applied { outcome: newly, progress })
    }

    /// Mark an item complete. See [`ProgressTracker::mark_item_complete`].
    pub async fn mark_item_complete(
        &mut self,
        session: &Session,
        course_id: &CourseId,
        week: WeekNumber,
        content_type: ContentType,
        item: &str,
    ) -> Result<Applied<MarkOutcome>> {
        self.apply(session, course_id, |tracker, progress| {
            let outcome = tracker.mark_item_complete(progress, week, content_type, item);
            let mut events = Vec::new();
            if let MarkOutcome::Completed { week_completed } = outcome {
                events.push(ProgressEventKind::ItemCompleted {
                    week,
                    content_type,
                    item_id: item.to_string(),
                });
                if week_completed {
                    events.push(ProgressEventKind::WeekCompleted { week });
                }
            }
            (outcome, events)
        })
        .await
    }

    /// Count a video view. See [`ProgressTracker::record_video_watch`].
    pub async fn record_video_watch(
        &mut self,
        session: &Session,
        course_id: &CourseId,
        week: WeekNumber,
        video: &str,
    ) -> Result<Applied<WatchOutcome>> {
        self.apply(session, course_id, |tracker, progress| {
            let outcome = tracker.record_video_watch(progress, week, video);
            let mut events = Vec::new();
            match outcome {
                WatchOutcome::Counted { count } => {
                    events.push(ProgressEventKind::VideoWatched {
                        week,
                        video_id: video.to_string(),
                        count,
                    });
                }
                WatchOutcome::Completed { week_completed } => {
                    events.push(ProgressEventKind::VideoWatched {
                        week,
                        video_id: video.to_string(),
                        count: progress.watch_count(week, video),
                    });
                    events.push(ProgressEventKind::ItemCompleted {
                        week,
                        content_type: ContentType::Videos,
                        item_id: video.to_string(),
                    });
                    if week_completed {
                        events.push(ProgressEventKind::WeekCompleted { week });
                    }
                }
                WatchOutcome::AlreadyComplete | WatchOutcome::MissingReference => {}
            }
            (outcome, events)
        })
        .await
    }

    /// Record the week the user opened. Returns `false` for an unknown week.
    pub async fn open_week(
        &mut self,
        session: &Session,
        course_id: &CourseId,
        week: WeekNumber,
    ) -> Result<Applied<bool>> {
        self.apply(session, course_id, |tracker, progress| {
            let opened = tracker.open_week(progress, week);
            let events = if opened {
                vec![ProgressEventKind::WeekOpened { week }]
            } else {
                Vec::new()
            };
            (opened, events)
        })
        .await
    }

    /// Progress summary of one course (empty record when never touched).
    pub async fn summary(&mut self, session: &Session, course_id: &CourseId) -> Result<CourseSummary> {
        let course = self.course(course_id).await?;
        let policy = self.policy;
        let cached = self.load(&session.user_id).await?;
        let empty = CourseProgress::new();
        let progress = cached.progress.course(course_id).unwrap_or(&empty);
        Ok(ProgressTracker::new(&course, policy).summary(progress))
    }

    /// Whether the week's quiz may be taken.
    pub async fn quiz_unlocked(
        &mut self,
        session: &Session,
        course_id: &CourseId,
        week: WeekNumber,
    ) -> Result<bool> {
        let course = self.course(course_id).await?;
        let policy = self.policy;
        let cached = self.load(&session.user_id).await?;
        let empty = CourseProgress::new();
        let progress = cached.progress.course(course_id).unwrap_or(&empty);
        Ok(ProgressTracker::new(&course, policy).quiz_unlocked(progress, week))
    }

    /// The user's current document, including unsaved changes.
    pub async fn user_progress(&mut self, session: &Session) -> Result<UserProgress> {
        Ok(self.load(&session.user_id).await?.progress.clone())
    }

    /// Whether the user has changes that were not written yet.
    pub fn has_unsaved_changes(&self, session: &Session) -> bool {
        self.cache
            .get(&session.user_id)
            .is_some_and(CachedUser::needs_flush)
    }

    /// Retry writing unsaved changes.
    pub async fn flush(&mut self, session: &Session) -> Result<()> {
        self.persist(&session.user_id).await
    }

    /// The user's activity log, oldest first.
    pub async fn events(&self, session: &Session) -> Result<Vec<ProgressEvent>> {
        Ok(self.store.list_events(&session.user_id).await?)
    }

    async fn apply<T, F>(&mut self, session: &Session, course_id: &CourseId, op: F) -> Result<Applied<T>>
    where
        F: FnOnce(&ProgressTracker<'_>, &mut CourseProgress) -> (T, Vec<ProgressEventKind>),
    {
        let course = self.course(course_id).await?;
        let policy = self.policy;
        let user = &session.user_id;
        let cached = self.load(user).await?;

        // Work on a copy so no-ops leave the document untouched.
        let mut progress = cached.progress.course(course_id).cloned().unwrap_or_default();
        let tracker = ProgressTracker::new(&course, policy);
        let (outcome, kinds) = op(&tracker, &mut progress);

        if !kinds.is_empty() {
            if cached.progress.enroll(course_id) {
                info!("{} enrolled in {}", user, course_id);
                cached
                    .pending_events
                    .push(ProgressEvent::new(user.clone(), course_id.clone(), ProgressEventKind::Enrolled));
            }
            *cached.progress.course_mut(course_id) = progress;
            cached.pending_events.extend(
                kinds
                    .into_iter()
                    .map(|kind| ProgressEvent::new(user.clone(), course_id.clone(), kind)),
            );
            cached.dirty = true;
        }
        let snapshot = cached.progress.clone();

        self.persist(user).await?;
        Ok(Applied { outcome, progress: snapshot })
    }

    async fn load(&mut self, user: &UserId) -> Result<&mut CachedUser> {
        if !self.cache.contains_key(user) {
            let progress = self.store.load_user_progress(user).await?.unwrap_or_default();
            debug!("Loaded progress for {} ({} courses)", user, progress.courses.len());
            self.cache.insert(
                user.clone(),
                CachedUser {
                    progress,
                    ..CachedUser::default()
                },
            );
        }
        Ok(self.cache.entry(user.clone()).or_default())
    }

    async fn persist(&mut self, user: &UserId) -> Result<()> {
        let Some(cached) = self.cache.get_mut(user) else {
            return Ok(());
        };
        if !cached.needs_flush() {
            return Ok(());
        }

        if cached.dirty {
            if let Err(source) = self.store.save_user_progress(user, &cached.progress).await {
                warn!("Saving progress for {} failed: {}", user, source);
                return Err(ServiceError::Persistence {
                    user: user.clone(),
                    source,
                });
            }
            cached.dirty = false;
        }

        let events = std::mem::take(&mut cached.pending_events);
        for (i, event) in events.iter().enumerate() {
            if let Err(source) = self.store.append_event(event).await {
                warn!("Appending event for {} failed: {}", user, source);
                cached.pending_events = events[i..].to_vec();
                return Err(ServiceError::Persistence {
                    user: user.clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::{ContentItem, Video, WeekPlan};
    use learnpath_storage::{MemoryStore, StaticCurriculum};

    fn rust() -> CourseId {
        CourseId::parse("rust").unwrap()
    }

    fn session() -> Session {
        Session::new(UserId::parse("alice").unwrap())
    }

    fn service() -> ProgressService<MemoryStore, StaticCurriculum> {
        let mut week1 = WeekPlan::new(1, "Ownership");
        week1.videos = vec![Video::titled("V1", "u1"), Video::titled("V2", "u2")];
        let mut week2 = WeekPlan::new(2, "Traits");
        week2.lessons = vec![ContentItem::titled("Intro")];
        week2.quiz_id = Some("q2".to_string());
        let course = Course::new(rust(), "Rust").with_week(week1).with_week(week2);

        let curriculum = StaticCurriculum::new([course]).unwrap();
        ProgressService::new(MemoryStore::new(), curriculum)
    }

    #[tokio::test]
    async fn test_mark_creates_skeleton_and_persists() {
        let mut service = service();
        let session = session();

        let applied = service
            .mark_item_complete(&session, &rust(), 2, ContentType::Lessons, "Intro")
            .await
            .unwrap();
        assert_eq!(applied.outcome, MarkOutcome::Completed { week_completed: false });
        assert!(applied.progress.is_enrolled(&rust()));

        let stored = service
            .store()
            .load_user_progress(&session.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, applied.progress);
        let course = stored.course(&rust()).unwrap();
        assert!(course.is_item_complete(2, ContentType::Lessons, "Intro"));
        assert!(course.completed_weeks.is_empty());

        assert!(service.quiz_unlocked(&session, &rust(), 2).await.unwrap());
    }

    #[tokio::test]
    async fn test_watch_to_week_completion_emits_events() {
        let mut service = service();
        let session = session();

        for _ in 0..10 {
            service.record_video_watch(&session, &rust(), 1, "V1").await.unwrap();
        }
        let mut last = None;
        for _ in 0..10 {
            last = Some(service.record_video_watch(&session, &rust(), 1, "V2").await.unwrap());
        }
        let applied = last.unwrap();
        assert_eq!(applied.outcome, WatchOutcome::Completed { week_completed: true });

        let course = applied.progress.course(&rust()).unwrap();
        let videos: Vec<_> = course.completed(1, ContentType::Videos).collect();
        assert_eq!(videos, vec!["V1", "V2"]);
        assert_eq!(course.completed_weeks.iter().copied().collect::<Vec<_>>(), vec![1]);

        let events = service.events(&session).await.unwrap();
        assert_eq!(events.first().map(|e| &e.kind), Some(&ProgressEventKind::Enrolled));
        assert_eq!(events.last().map(|e| &e.kind), Some(&ProgressEventKind::WeekCompleted { week: 1 }));
        // enrolled + 20 views + 2 item completions + 1 week
        assert_eq!(events.len(), 24);

        let again = service.record_video_watch(&session, &rust(), 1, "V2").await.unwrap();
        assert_eq!(again.outcome, WatchOutcome::AlreadyComplete);
        assert_eq!(service.events(&session).await.unwrap().len(), 24);

        let summary = service.summary(&session, &rust()).await.unwrap();
        assert_eq!(summary.overall_percentage, 50);
    }

    #[tokio::test]
    async fn test_missing_reference_does_not_enroll() {
        let mut service = service();
        let session = session();

        let applied = service
            .mark_item_complete(&session, &rust(), 7, ContentType::Lessons, "Intro")
            .await
            .unwrap();
        assert_eq!(applied.outcome, MarkOutcome::MissingReference);
        assert_eq!(applied.progress, UserProgress::new());
        assert_eq!(service.store().user_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_course() {
        let mut service = service();
        let err = service
            .record_video_watch(&session(), &CourseId::parse("go").unwrap(), 1, "V1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnknownCourse(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_change_in_memory() {
        let mut service = service();
        let session = session();
        service.store_mut().set_fail_writes(true);

        let err = service
            .mark_item_complete(&session, &rust(), 1, ContentType::Videos, "V1")
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(service.has_unsaved_changes(&session));

        let in_memory = service.user_progress(&session).await.unwrap();
        assert!(in_memory
            .course(&rust())
            .unwrap()
            .is_item_complete(1, ContentType::Videos, "V1"));
        assert!(service
            .store()
            .load_user_progress(&session.user_id)
            .await
            .unwrap()
            .is_none());

        // Repeating the mutation is a no-op on the in-memory record.
        let retry = service
            .mark_item_complete(&session, &rust(), 1, ContentType::Videos, "V1")
            .await;
        assert!(retry.is_err());

        service.store_mut().set_fail_writes(false);
        service.flush(&session).await.unwrap();
        assert!(!service.has_unsaved_changes(&session));

        let stored = service
            .store()
            .load_user_progress(&session.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, in_memory);
        let kinds: Vec<_> = service
            .events(&session)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0], ProgressEventKind::Enrolled);
    }

    #[tokio::test]
    async fn test_enroll_and_open_week() {
        let mut service = service();
        let session = session();

        assert!(service.enroll(&session, &rust()).await.unwrap().outcome);
        assert!(!service.enroll(&session, &rust()).await.unwrap().outcome);

        let opened = service.open_week(&session, &rust(), 2).await.unwrap();
        assert!(opened.outcome);
        assert_eq!(opened.progress.course(&rust()).unwrap().last_accessed_week, Some(2));
        assert!(!service.open_week(&session, &rust(), 5).await.unwrap().outcome);

        let summary = service.summary(&session, &rust()).await.unwrap();
        assert_eq!(summary.last_accessed_week, Some(2));
        assert_eq!(summary.weeks[1].quiz.as_ref().map(|q| q.unlocked), Some(false));
    }

    #[tokio::test]
    async fn test_ungated_policy() {
        let mut service = service().with_policy(ProgressPolicy::ungated());
        let session = session();
        for video in ["V1", "V2"] {
            service
                .mark_item_complete(&session, &rust(), 1, ContentType::Videos, video)
                .await
                .unwrap();
        }
        let summary = service.summary(&session, &rust()).await.unwrap();
        assert!(summary.completed_weeks.is_empty());
        assert!(summary.weeks[0].complete);
        assert_eq!(summary.overall_percentage, 0);
    }
}

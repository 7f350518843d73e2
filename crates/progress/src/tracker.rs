//! Progress tracker - mutation rules and completion arithmetic.
//!
//! The tracker borrows the curriculum of one course and applies a
//! [`ProgressPolicy`] to that course's [`CourseProgress`]. Every operation is
//! synchronous and works on the in-memory record only; persisting the result
//! is the caller's job.
//!
//! References to weeks or items the curriculum does not enumerate are logged
//! and ignored, since curriculum data may lag behind stored progress.

use learnpath_core::{ContentType, Course, CourseId, CourseProgress, WeekNumber, WeekPlan};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::policy::ProgressPolicy;

/// Result of [`ProgressTracker::mark_item_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The item was newly recorded
    Completed {
        /// Whether this also completed the week
        week_completed: bool,
    },
    /// The item was already recorded; nothing changed
    AlreadyComplete,
    /// The curriculum has no such week or item; nothing changed
    MissingReference,
}

/// Result of [`ProgressTracker::record_video_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The view was counted without reaching the threshold
    Counted {
        /// View count after this view
        count: u32,
    },
    /// The view reached the threshold and completed the video
    Completed {
        /// Whether this also completed the week
        week_completed: bool,
    },
    /// The video was already complete; the count was not touched
    AlreadyComplete,
    /// The curriculum has no such week or video; nothing changed
    MissingReference,
}

/// Video completion of one week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCompletion {
    /// Videos complete (explicitly or by views)
    pub completed_videos: usize,
    /// Videos in the curriculum week
    pub total_videos: usize,
}

impl WeekCompletion {
    /// A week is complete when it has videos and all of them are complete.
    pub fn is_complete(&self) -> bool {
        self.total_videos > 0 && self.completed_videos == self.total_videos
    }

    /// Rounded percentage of complete videos; 0 for a week without videos.
    pub fn percentage(&self) -> u8 {
        percent(self.completed_videos, self.total_videos)
    }
}

/// Quiz reference and its gate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGate {
    /// Quiz identifier for the external quiz subsystem
    pub quiz_id: String,
    /// Whether enough lessons are complete
    pub unlocked: bool,
}

/// Display summary of one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    /// Week number
    pub week: WeekNumber,
    /// Week title
    pub title: String,
    /// Video completion
    pub videos: WeekCompletion,
    /// Rounded video percentage
    pub percentage: u8,
    /// Whether every video is complete
    pub complete: bool,
    /// Completed lessons enumerated by the curriculum
    pub lessons_completed: usize,
    /// Lessons in the curriculum week
    pub total_lessons: usize,
    /// Quiz gate, when the week has a quiz
    pub quiz: Option<QuizGate>,
}

/// Display summary of one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    /// Course id
    pub course_id: CourseId,
    /// Course title
    pub title: String,
    /// Rounded percentage of completed weeks
    pub overall_percentage: u8,
    /// Completed weeks, ascending
    pub completed_weeks: Vec<WeekNumber>,
    /// Last opened week
    pub last_accessed_week: Option<WeekNumber>,
    /// Per-week summaries in curriculum order
    pub weeks: Vec<WeekSummary>,
}

/// Applies progress rules for one course.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker<'a> {
    course: &'a Course,
    policy: ProgressPolicy,
}

impl<'a> ProgressTracker<'a> {
    /// Create a tracker over a course curriculum.
    pub fn new(course: &'a Course, policy: ProgressPolicy) -> Self {
        Self { course, policy }
    }

    /// The policy in effect.
    pub fn policy(&self) -> &ProgressPolicy {
        &self.policy
    }

    /// Mark an item complete.
    ///
    /// Idempotent: a second call reports [`MarkOutcome::AlreadyComplete`].
    /// Completing a video records the week as last accessed and, under a
    /// week-tracking policy, re-evaluates week completion.
    pub fn mark_item_complete(
        &self,
        progress: &mut CourseProgress,
        week: WeekNumber,
        content_type: ContentType,
        item: &str,
    ) -> MarkOutcome {
        let Some(plan) = self.lookup(week, content_type, item) else {
            return MarkOutcome::MissingReference;
        };

        if !progress.insert_item(week, content_type, item) {
            debug!(
                "{}: {} {:?} in week {} already complete",
                self.course.id, content_type, item, week
            );
            return MarkOutcome::AlreadyComplete;
        }

        let mut week_completed = false;
        if content_type == ContentType::Videos {
            progress.last_accessed_week = Some(week);
            if self.policy.tracks_week_completion
                && self.completion_of(progress, plan).is_complete()
                && progress.insert_week(week)
            {
                info!("{}: week {} completed", self.course.id, week);
                week_completed = true;
            }
        }

        MarkOutcome::Completed { week_completed }
    }

    /// Count one view of a video.
    ///
    /// Views of a complete video are ignored. The view that reaches the
    /// policy threshold marks the video complete.
    pub fn record_video_watch(
        &self,
        progress: &mut CourseProgress,
        week: WeekNumber,
        video: &str,
    ) -> WatchOutcome {
        if self.lookup(week, ContentType::Videos, video).is_none() {
            return WatchOutcome::MissingReference;
        }

        if self.is_video_complete(progress, week, video) {
            debug!("{}: video {:?} in week {} already complete", self.course.id, video, week);
            return WatchOutcome::AlreadyComplete;
        }

        let count = progress.increment_watch(week, video);
        if count < self.policy.video_threshold() {
            return WatchOutcome::Counted { count };
        }

        let week_completed = matches!(
            self.mark_item_complete(progress, week, ContentType::Videos, video),
            MarkOutcome::Completed { week_completed: true }
        );
        WatchOutcome::Completed { week_completed }
    }

    /// Record that the user opened a week. Returns `false` for an unknown week.
    pub fn open_week(&self, progress: &mut CourseProgress, week: WeekNumber) -> bool {
        if self.course.week(week).is_none() {
            warn!("{}: week {} is not in the curriculum", self.course.id, week);
            return false;
        }
        progress.last_accessed_week = Some(week);
        true
    }

    /// Whether a video is complete, explicitly or by reaching the view threshold.
    pub fn is_video_complete(&self, progress: &CourseProgress, week: WeekNumber, video: &str) -> bool {
        progress.is_item_complete(week, ContentType::Videos, video)
            || progress.watch_count(week, video) >= self.policy.video_threshold()
    }

    /// Video completion of a week; all zeros for a week missing from the curriculum.
    pub fn week_completion(&self, progress: &CourseProgress, week: WeekNumber) -> WeekCompletion {
        match self.course.week(week) {
            Some(plan) => self.completion_of(progress, plan),
            None => {
                warn!("{}: week {} is not in the curriculum", self.course.id, week);
                WeekCompletion::default()
            }
        }
    }

    /// Rounded percentage of complete videos in a week.
    pub fn weekly_percentage(&self, progress: &CourseProgress, week: WeekNumber) -> u8 {
        self.week_completion(progress, week).percentage()
    }

    /// Rounded percentage of curriculum weeks recorded as complete.
    pub fn overall_percentage(&self, progress: &CourseProgress) -> u8 {
        let completed = self
            .course
            .weeks
            .iter()
            .filter(|w| progress.completed_weeks.contains(&w.week))
            .count();
        percent(completed, self.course.weeks.len())
    }

    /// Whether the week's lesson completion meets the quiz threshold.
    ///
    /// Read-only. A week without lessons has ratio 0.
    pub fn quiz_unlocked(&self, progress: &CourseProgress, week: WeekNumber) -> bool {
        let Some(plan) = self.course.week(week) else {
            warn!("{}: week {} is not in the curriculum", self.course.id, week);
            return false;
        };
        let (done, total) = lesson_counts(progress, plan);
        meets_threshold(done, total, self.policy.quiz_threshold())
    }

    /// Summarise every curriculum week.
    pub fn summary(&self, progress: &CourseProgress) -> CourseSummary {
        let weeks = self
            .course
            .weeks
            .iter()
            .map(|plan| {
                let videos = self.completion_of(progress, plan);
                let (lessons_completed, total_lessons) = lesson_counts(progress, plan);
                WeekSummary {
                    week: plan.week,
                    title: plan.title.clone(),
                    videos,
                    percentage: videos.percentage(),
                    complete: videos.is_complete(),
                    lessons_completed,
                    total_lessons,
                    quiz: plan.quiz_id.as_ref().map(|quiz_id| QuizGate {
                        quiz_id: quiz_id.clone(),
                        unlocked: meets_threshold(
                            lessons_completed,
                            total_lessons,
                            self.policy.quiz_threshold(),
                        ),
                    }),
                }
            })
            .collect();

        CourseSummary {
            course_id: self.course.id.clone(),
            title: self.course.title.clone(),
            overall_percentage: self.overall_percentage(progress),
            completed_weeks: progress.completed_weeks.iter().copied().collect(),
            last_accessed_week: progress.last_accessed_week,
            weeks,
        }
    }

    fn lookup(&self, week: WeekNumber, content_type: ContentType, item: &str) -> Option<&'a WeekPlan> {
        let Some(plan) = self.course.week(week) else {
            warn!("{}: week {} is not in the curriculum", self.course.id, week);
            return None;
        };
        if !plan.contains(content_type, item) {
            warn!(
                "{}: week {} has no {} item {:?}",
                self.course.id, week, content_type, item
            );
            return None;
        }
        Some(plan)
    }

    fn completion_of(&self, progress: &CourseProgress, plan: &WeekPlan) -> WeekCompletion {
        let keys = plan.item_keys(ContentType::Videos);
        WeekCompletion {
            completed_videos: keys
                .iter()
                .filter(|key| self.is_video_complete(progress, plan.week, key))
                .count(),
            total_videos: keys.len(),
        }
    }
}

fn lesson_counts(progress: &CourseProgress, plan: &WeekPlan) -> (usize, usize) {
    let keys = plan.item_keys(ContentType::Lessons);
    let done = keys
        .iter()
        .filter(|key| progress.is_item_complete(plan.week, ContentType::Lessons, key))
        .count();
    (done, keys.len())
}

/// `done / total >= threshold%` in exact integer arithmetic.
fn meets_threshold(done: usize, total: usize, threshold: u8) -> bool {
    // An empty week has ratio 0.
    let ratio_scaled = if total == 0 { 0 } else { done as u64 * 100 };
    ratio_scaled >= u64::from(threshold) * total.max(1) as u64
}

/// Round-half-up percentage, 0 when `whole` is 0.
fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (part.min(whole) as u64, whole as u64);
    ((part * 200 + whole) / (whole * 2)) as u8
}

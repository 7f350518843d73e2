//! Progress policy - the knobs that differ between course page profiles.

use serde::{Deserialize, Serialize};

/// Views after which a video counts as complete.
pub const DEFAULT_VIDEO_COMPLETION_THRESHOLD: u32 = 10;

/// Lesson completion percentage needed to unlock a week's quiz.
pub const DEFAULT_QUIZ_UNLOCK_THRESHOLD: u8 = 80;

/// Rules the tracker applies when mutating and evaluating progress.
///
/// Two profiles exist: [`ProgressPolicy::gated`] rolls finished videos up
/// into completed weeks, [`ProgressPolicy::ungated`] never touches
/// `completed_weeks`. Both share watch-count completion and quiz gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressPolicy {
    /// Whether completing a week's videos adds the week to `completed_weeks`
    pub tracks_week_completion: bool,

    /// Percent of lessons (0-100) that unlocks the week's quiz
    pub quiz_unlock_threshold: u8,

    /// Views after which a video is complete
    pub video_completion_threshold: u32,
}

impl ProgressPolicy {
    /// Week-gated profile (default).
    pub fn gated() -> Self {
        Self {
            tracks_week_completion: true,
            quiz_unlock_threshold: DEFAULT_QUIZ_UNLOCK_THRESHOLD,
            video_completion_threshold: DEFAULT_VIDEO_COMPLETION_THRESHOLD,
        }
    }

    /// Profile that records items but never completes weeks.
    pub fn ungated() -> Self {
        Self {
            tracks_week_completion: false,
            ..Self::gated()
        }
    }

    /// Look up a profile by name.
    pub fn profile(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gated" => Some(Self::gated()),
            "ungated" => Some(Self::ungated()),
            _ => None,
        }
    }

    /// Set the video completion threshold.
    pub fn with_video_threshold(mut self, views: u32) -> Self {
        self.video_completion_threshold = views;
        self
    }

    /// Set the quiz unlock threshold.
    pub fn with_quiz_threshold(mut self, percent: u8) -> Self {
        self.quiz_unlock_threshold = percent;
        self
    }

    /// Effective video threshold; a video needs at least one view.
    pub fn video_threshold(&self) -> u32 {
        self.video_completion_threshold.max(1)
    }

    /// Effective quiz threshold, capped at 100%.
    pub fn quiz_threshold(&self) -> u8 {
        self.quiz_unlock_threshold.min(100)
    }
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self::gated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let gated = ProgressPolicy::gated();
        assert!(gated.tracks_week_completion);
        assert_eq!(gated.video_threshold(), 10);
        assert_eq!(gated.quiz_threshold(), 80);

        let ungated = ProgressPolicy::profile("Ungated").unwrap();
        assert!(!ungated.tracks_week_completion);
        assert_eq!(ungated.video_threshold(), 10);

        assert!(ProgressPolicy::profile("strict").is_none());
        assert_eq!(ProgressPolicy::default(), gated);
    }

    #[test]
    fn test_effective_thresholds_are_clamped() {
        let policy = ProgressPolicy::gated()
            .with_video_threshold(0)
            .with_quiz_threshold(150);
        assert_eq!(policy.video_threshold(), 1);
        assert_eq!(policy.quiz_threshold(), 100);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let policy: ProgressPolicy =
            serde_json::from_str(r#"{"tracksWeekCompletion": false}"#).unwrap();
        assert_eq!(policy, ProgressPolicy::ungated());
    }
}

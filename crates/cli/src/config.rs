//! CLI configuration file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use learnpath_progress::ProgressPolicy;
use serde::{Deserialize, Serialize};

/// Name of the config file looked up inside the data directory.
pub const CONFIG_FILE: &str = "learnpath.json";

/// Settings read from `learnpath.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Where progress, events and curricula live
    pub data_dir: PathBuf,

    /// Tracker policy
    pub policy: ProgressPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".learnpath"),
            policy: ProgressPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load an explicit config file; it must exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolve configuration: explicit file, else `<data>/learnpath.json`
    /// when present, else defaults. A `--data` flag always wins.
    pub fn resolve(explicit: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let dir = data_dir
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| Self::default().data_dir);
                let candidate = dir.join(CONFIG_FILE);
                if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::resolve(None, Some(dir.path())).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.policy, ProgressPolicy::gated());
    }

    #[test]
    fn test_config_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"dataDir": "elsewhere", "policy": {"tracksWeekCompletion": false, "videoCompletionThreshold": 5}}"#,
        )
        .unwrap();

        let config = AppConfig::resolve(None, Some(dir.path())).unwrap();
        assert_eq!(config.data_dir, dir.path());
        assert!(!config.policy.tracks_week_completion);
        assert_eq!(config.policy.video_completion_threshold, 5);
        assert_eq!(config.policy.quiz_unlock_threshold, 80);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::resolve(Some(&dir.path().join("missing.json")), None).is_err());
    }
}

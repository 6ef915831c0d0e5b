use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::RetryPolicy;
use crate::skip::SkipList;
use crate::waiter::WaitPolicy;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Engine tunables. Every field may be omitted from the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_grace_delay")]
    pub grace_delay_secs: u64,

    #[serde(default = "default_retry_delays")]
    pub retry_delays_ms: Vec<u64>,

    #[serde(default = "default_skip_files")]
    pub skip_files: Vec<String>,
}

fn default_wait_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    500
}

fn default_grace_delay() -> u64 {
    2
}

fn default_retry_delays() -> Vec<u64> {
    vec![0, 1000, 1000, 1000, 1000]
}

fn default_skip_files() -> Vec<String> {
    ["update", "updater", "update.exe", "updater.exe"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout(),
            poll_interval_ms: default_poll_interval(),
            grace_delay_secs: default_grace_delay(),
            retry_delays_ms: default_retry_delays(),
            skip_files: default_skip_files(),
        }
    }
}

impl EngineSettings {
    /// Load settings from a JSON file, falling back to defaults per field.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_secs(self.wait_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    #[must_use]
    pub fn grace_delay(&self) -> Duration {
        Duration::from_secs(self.grace_delay_secs)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_delays_ms
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        )
    }

    #[must_use]
    pub fn skip_list(&self) -> SkipList {
        SkipList::new(&self.skip_files)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::{EngineSettings, SettingsError};

    #[test]
    fn defaults_match_documented_values() {
        let settings = EngineSettings::default();
        let wait = settings.wait_policy();

        assert_eq!(wait.timeout, Duration::from_secs(30));
        assert_eq!(wait.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.grace_delay(), Duration::from_secs(2));
        assert_eq!(settings.retry_policy().attempts(), 5);
        assert!(settings.skip_list().matches(Path::new("Updater.exe")));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("updater.json");
        std::fs::write(&path, r#"{"grace_delay_secs": 0, "retry_delays_ms": []}"#)
            .expect("settings should be written");

        let settings = EngineSettings::load(&path).expect("settings should load");

        assert_eq!(settings.grace_delay_secs, 0);
        assert_eq!(settings.retry_policy().attempts(), 1);
        assert_eq!(settings.wait_timeout_secs, 30);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("updater.json");
        std::fs::write(&path, "[1, 2").expect("settings should be written");

        assert!(matches!(
            EngineSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
        assert!(matches!(
            EngineSettings::load(&temp.path().join("missing.json")),
            Err(SettingsError::Read { .. })
        ));
    }
}

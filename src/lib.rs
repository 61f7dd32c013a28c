pub mod catalog;
pub mod chat;
pub mod error;
pub mod gemini;
pub mod mcp;
pub mod studio;
pub mod tasks;
pub mod video;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use video::{JobOptions, ReferencePolicy};

/// Environment variable that overrides `apiKey` from settings.json.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Lower bound on the configured poll interval.
const MIN_POLL_INTERVAL_SECS: u64 = 1;

// ---------------------------------------------------------------------------
// Settings: read from {dataDir}/settings.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    #[serde(alias = "baseURL")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    /// Send the transcript with every chat call instead of only the new message.
    #[serde(default)]
    pub multi_turn_chat: bool,
    /// Fail instead of truncating when more than three reference images are supplied.
    #[serde(default)]
    pub reject_excess_references: bool,
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,
    /// Finished video jobs kept before the oldest are evicted.
    #[serde(default = "default_finished_job_limit")]
    pub finished_job_limit: usize,
}

fn default_base_url() -> String {
    gemini::DEFAULT_BASE_URL.to_string()
}

fn default_chat_model() -> String {
    chat::DEFAULT_CHAT_MODEL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    video::job::POLL_INTERVAL.as_secs()
}

fn default_finished_job_limit() -> usize {
    tasks::DEFAULT_FINISHED_LIMIT
}

fn default_max_wait_secs() -> u64 {
    video::job::MAX_WAIT.as_secs()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            multi_turn_chat: false,
            reject_excess_references: false,
            assets_dir: None,
            finished_job_limit: default_finished_job_limit(),
        }
    }
}

impl Settings {
    /// Let a non-empty `GEMINI_API_KEY` take precedence over the file.
    pub fn with_env_override(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
        self
    }

    pub fn job_options(&self, data_dir: &Path) -> JobOptions {
        let assets_dir = self
            .assets_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("assets"));
        JobOptions {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS)),
            max_wait: Duration::from_secs(self.max_wait_secs),
            reference_policy: if self.reject_excess_references {
                ReferencePolicy::Reject
            } else {
                ReferencePolicy::Truncate
            },
            assets_dir,
        }
    }
}

/// Missing file means defaults; a malformed file is logged and ignored.
pub fn load_settings(data_dir: &Path) -> Settings {
    let path = data_dir.join("settings.json");
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), "ignoring malformed settings: {e}");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

/// Resolve the app data directory cross-platform.
pub fn resolve_data_dir() -> Result<PathBuf> {
    let data = dirs::data_dir().context("could not determine data directory")?;
    Ok(data.join("com.greenfield.agrostudio"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(dir.path());
        assert_eq!(s.base_url, gemini::DEFAULT_BASE_URL);
        assert_eq!(s.chat_model, chat::DEFAULT_CHAT_MODEL);
        assert_eq!(s.poll_interval_secs, 10);
        assert!(!s.multi_turn_chat);
    }

    #[test]
    fn settings_accept_camel_case_and_base_url_alias() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"apiKey":"abc","baseURL":"http://localhost:8080","multiTurnChat":true,"rejectExcessReferences":true}"#,
        )
        .unwrap();

        let s = load_settings(dir.path());
        assert_eq!(s.api_key, "abc");
        assert_eq!(s.base_url, "http://localhost:8080");
        assert!(s.multi_turn_chat);

        let opts = s.job_options(dir.path());
        assert_eq!(opts.reference_policy, ReferencePolicy::Reject);
        assert_eq!(opts.assets_dir, dir.path().join("assets"));
        assert_eq!(opts.max_wait, video::job::MAX_WAIT);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"pollIntervalSecs":0,"finishedJobLimit":3}"#,
        )
        .unwrap();

        let s = load_settings(dir.path());
        assert_eq!(s.finished_job_limit, 3);
        let opts = s.job_options(dir.path());
        assert_eq!(opts.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        let s = load_settings(dir.path());
        assert!(s.api_key.is_empty());
    }
}

//! Runner configuration from environment variables (PRD-2).
//!
//! `.env` loading happens in `main` before [`RunnerConfig::from_env`] is
//! called; the engine itself never reads the environment. `validate`
//! rejects unusable credential material before any session is opened, so
//! a misconfigured run fails in seconds instead of at the first submit.

use std::path::PathBuf;
use std::time::Duration;

use retake_core::checkpoint::DEFAULT_CHECKPOINT_FILE;
use retake_core::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const DEFAULT_SCENE_FILE: &str = "scene_prompts.json";
const DEFAULT_ARTIFACT_DIR: &str = "scene_videos";

/// Credential values shipped in sample configuration; never usable.
const PLACEHOLDER_CREDENTIALS: &[&str] = &["YOUR_API_KEY", "changeme"];

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Configuration loading or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{name} environment variable is required")]
    Missing { name: &'static str },

    /// A variable is set but does not parse or is out of range.
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    /// A credential still carries its sample-file placeholder value.
    #[error("{name} is a placeholder value; set a real credential")]
    Placeholder { name: &'static str },
}

// ---------------------------------------------------------------------------
// RunnerConfig
// ---------------------------------------------------------------------------

/// Everything the runner needs, loaded once at startup and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Scene prompt file (JSON map of label to payload).
    pub scene_file: PathBuf,
    /// Directory for downloaded artifacts; created if absent.
    pub artifact_dir: PathBuf,
    /// Checkpoint path.
    pub checkpoint_file: PathBuf,
    /// Generation service base URL.
    pub api_url: String,
    /// Primary session credential.
    pub api_key: String,
    /// Optional backup session credential.
    pub backup_api_key: Option<String>,
    /// Attempt budget per scene.
    pub max_retries_per_scene: u32,
    /// Failed attempts between failovers; `0` disables failover.
    pub switch_after_retries: u32,
    /// Successes between scheduled restarts; `0` disables them.
    pub restart_after_videos: u32,
    /// Cooldown before a scheduled relaunch.
    pub restart_pause: Duration,
    /// Base wait between retry attempts, before jitter.
    pub retry_wait: Duration,
    /// Pause between a successful scene and the next submission.
    pub scene_wait: Duration,
    /// Per-attempt generation timeout.
    pub generation_timeout: Duration,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Required | Default |
    /// |----------------------------|-----|----------------------------------|
    /// | `STUDIO_API_URL`           | yes | -- |
    /// | `STUDIO_API_KEY`           | yes | -- |
    /// | `STUDIO_BACKUP_API_KEY`    | no  | unset (no failover session) |
    /// | `SCENE_FILE`               | no  | `scene_prompts.json` |
    /// | `ARTIFACT_DIR`             | no  | `scene_videos` |
    /// | `CHECKPOINT_FILE`          | no  | `video_progress_checkpoint.json` |
    /// | `MAX_RETRIES_PER_SCENE`    | no  | `25` |
    /// | `SWITCH_AFTER_RETRIES`     | no  | `1` |
    /// | `RESTART_AFTER_VIDEOS`     | no  | `3` (`0` disables) |
    /// | `RESTART_PAUSE_MINUTES`    | no  | `10` |
    /// | `RETRY_WAIT_SECS`          | no  | `22` |
    /// | `SCENE_WAIT_SECS`          | no  | `30` |
    /// | `GENERATION_TIMEOUT_SECS`  | no  | `200` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            scene_file: optional_var("SCENE_FILE")
                .unwrap_or_else(|| DEFAULT_SCENE_FILE.to_string())
                .into(),
            artifact_dir: optional_var("ARTIFACT_DIR")
                .unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.to_string())
                .into(),
            checkpoint_file: optional_var("CHECKPOINT_FILE")
                .unwrap_or_else(|| DEFAULT_CHECKPOINT_FILE.to_string())
                .into(),
            api_url: required_var("STUDIO_API_URL")?,
            api_key: required_var("STUDIO_API_KEY")?,
            backup_api_key: optional_var("STUDIO_BACKUP_API_KEY"),
            max_retries_per_scene: parsed_var("MAX_RETRIES_PER_SCENE", 25)?,
            switch_after_retries: parsed_var("SWITCH_AFTER_RETRIES", 1)?,
            restart_after_videos: parsed_var("RESTART_AFTER_VIDEOS", 3)?,
            restart_pause: Duration::from_secs(
                parsed_var::<u64>("RESTART_PAUSE_MINUTES", 10)? * 60,
            ),
            retry_wait: Duration::from_secs(parsed_var("RETRY_WAIT_SECS", 22)?),
            scene_wait: Duration::from_secs(parsed_var("SCENE_WAIT_SECS", 30)?),
            generation_timeout: Duration::from_secs(parsed_var("GENERATION_TIMEOUT_SECS", 200)?),
        })
    }

    /// Reject configurations that could not possibly produce a scene.
    ///
    /// Placeholder credentials come from copying the sample environment
    /// file without editing it; catching them here beats a 401 after the
    /// first submit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "STUDIO_API_URL",
            });
        }
        check_credential("STUDIO_API_KEY", &self.api_key)?;
        if let Some(backup) = &self.backup_api_key {
            check_credential("STUDIO_BACKUP_API_KEY", backup)?;
        }
        if self.max_retries_per_scene == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_RETRIES_PER_SCENE",
                value: "0".to_string(),
            });
        }
        if self.generation_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "GENERATION_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Retry tunables in the shape the engine consumes.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries_per_scene: self.max_retries_per_scene,
            switch_after_retries: self.switch_after_retries,
            base_wait: self.retry_wait,
            attempt_timeout: self.generation_timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Env helpers (shared with the notifier config)
// ---------------------------------------------------------------------------

/// A set, non-empty variable; whitespace-only counts as unset.
pub(crate) fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn required_var(name: &'static str) -> Result<String, ConfigError> {
    optional_var(name).ok_or(ConfigError::Missing { name })
}

pub(crate) fn parsed_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match optional_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

fn check_credential(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing { name });
    }
    if PLACEHOLDER_CREDENTIALS.contains(&value) {
        return Err(ConfigError::Placeholder { name });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

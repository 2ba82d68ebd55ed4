//! Runtime configuration.
//!
//! All fields have defaults, so an empty TOML document is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VttyError};

/// Default admission ceiling for non-privileged tasks.
pub const DEFAULT_MAX_TASKS: usize = 20;

/// Default maximum length (bytes) of one unterminated input line.
pub const DEFAULT_COMMAND_LEN_MAX: usize = 1024;

/// Default idle time before a partial line is abandoned.
pub const DEFAULT_INPUT_TIMEOUT_MS: u64 = 10 * 1000;

/// Default sleep between transport polls when no bytes are available.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default time `shutdown` waits for running tasks.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1000;

/// Shell runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VttyConfig {
    /// Admission ceiling for concurrently active non-privileged tasks.
    pub max_tasks: usize,
    /// Maximum length of an unterminated input line before it is cut.
    pub command_len_max: usize,
    /// Idle time after which a pending partial line is emitted as timed out.
    pub input_timeout_ms: u64,
    /// Transport poll interval while idle.
    pub poll_interval_ms: u64,
    /// Commands exempt from the admission ceiling.
    pub privileged_commands: Vec<String>,
    /// Stack size for task threads (platform default when unset).
    pub task_stack_size: Option<usize>,
    /// How long shutdown waits for running tasks to return.
    pub shutdown_grace_ms: u64,
    /// Run the dispatch loop on its own thread.
    pub detach: bool,
}

impl Default for VttyConfig {
    fn default() -> Self {
        Self {
            max_tasks: DEFAULT_MAX_TASKS,
            command_len_max: DEFAULT_COMMAND_LEN_MAX,
            input_timeout_ms: DEFAULT_INPUT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            privileged_commands: vec!["kill".to_string(), "ps".to_string()],
            task_stack_size: None,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
            detach: true,
        }
    }
}

impl VttyConfig {
    /// Parse and validate a config from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)
            .map_err(|e| VttyError::Config(format!("{}: {e}", path.display())))?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_tasks == 0 {
            return Err(VttyError::Config("max_tasks must be positive".into()));
        }
        if self.command_len_max == 0 {
            return Err(VttyError::Config("command_len_max must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(VttyError::Config("poll_interval_ms must be positive".into()));
        }
        if self.task_stack_size == Some(0) {
            return Err(VttyError::Config("task_stack_size must be positive".into()));
        }
        Ok(())
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Whether `name` bypasses the admission ceiling.
    pub fn is_privileged(&self, name: &str) -> bool {
        self.privileged_commands.iter().any(|p| p == name)
    }
}

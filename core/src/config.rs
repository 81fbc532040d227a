//! Configuration for the process terminator.
//!
//! Stored in JSON format at `~/.dms/process-manager.json`. Every field has a
//! default, so a missing file or a partial file is always usable.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// Windows API `CTRL_C_EVENT`.
pub const CTRL_C_EVENT: u32 = 0;

/// Windows API `CTRL_BREAK_EVENT`.
pub const CTRL_BREAK_EVENT: u32 = 1;

/// Settings of the process terminator and the helper programs it may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminatorConfig {
    /// Path to `ctrlsender.exe`, used to deliver Ctrl+C to console programs.
    #[serde(default, rename = "ctrlSender")]
    pub ctrl_sender: Option<PathBuf>,

    /// Path to `taskkill.exe`. Discovered under `%SystemRoot%` when unset.
    #[serde(default, rename = "taskKill")]
    pub task_kill: Option<PathBuf>,

    /// Maximum time to wait for a helper program to finish.
    #[serde(default = "default_helper_timeout", rename = "helperTimeoutMs")]
    pub helper_timeout_ms: u64,

    /// Process names matching this pattern get `SIGALRM` before `SIGKILL`.
    #[serde(
        default = "default_transcoder_pattern",
        rename = "interactiveTranscoderPattern"
    )]
    pub interactive_transcoder_pattern: String,

    /// Lower bound applied to the terminate timeout of new processes.
    #[serde(default = "default_min_terminate", rename = "minTerminateTimeoutMs")]
    pub min_terminate_timeout_ms: u64,

    /// Upper bound applied to terminate timeouts while shutting down.
    #[serde(default = "default_shutdown_terminate", rename = "shutdownTerminateTimeoutMs")]
    pub shutdown_terminate_timeout_ms: u64,

    /// Lower bound on the wait after the last, most forceful technique.
    #[serde(default = "default_final_step", rename = "finalStepMinTimeoutMs")]
    pub final_step_min_timeout_ms: u64,

    /// Offset between processes rescheduled together on shutdown.
    #[serde(default = "default_stagger", rename = "shutdownStaggerMs")]
    pub shutdown_stagger_ms: u64,
}

fn default_helper_timeout() -> u64 {
    2000
}

fn default_transcoder_pattern() -> String {
    "(?i)mencoder|mplayer".to_string()
}

fn default_min_terminate() -> u64 {
    100
}

fn default_shutdown_terminate() -> u64 {
    500
}

fn default_final_step() -> u64 {
    500
}

fn default_stagger() -> u64 {
    1
}

impl Default for TerminatorConfig {
    fn default() -> Self {
        Self {
            ctrl_sender: None,
            task_kill: None,
            helper_timeout_ms: default_helper_timeout(),
            interactive_transcoder_pattern: default_transcoder_pattern(),
            min_terminate_timeout_ms: default_min_terminate(),
            shutdown_terminate_timeout_ms: default_shutdown_terminate(),
            final_step_min_timeout_ms: default_final_step(),
            shutdown_stagger_ms: default_stagger(),
        }
    }
}

impl TerminatorConfig {
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_millis(self.helper_timeout_ms)
    }

    pub fn min_terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.min_terminate_timeout_ms)
    }

    pub fn shutdown_terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_terminate_timeout_ms)
    }

    pub fn final_step_min_timeout(&self) -> Duration {
        Duration::from_millis(self.final_step_min_timeout_ms)
    }

    pub fn shutdown_stagger(&self) -> Duration {
        Duration::from_millis(self.shutdown_stagger_ms)
    }

    /// Compile the interactive transcoder pattern.
    pub fn transcoder_pattern(&self) -> Result<Regex> {
        Ok(Regex::new(&self.interactive_transcoder_pattern)?)
    }

    /// The `taskkill` helper to use, if any.
    ///
    /// An explicitly configured path wins. On Windows the system copy is used
    /// when it exists.
    pub fn resolve_task_kill(&self) -> Option<PathBuf> {
        if self.task_kill.is_some() {
            return self.task_kill.clone();
        }
        if cfg!(windows) {
            let root = std::env::var_os("SystemRoot")?;
            let path = PathBuf::from(root).join("System32").join("taskkill.exe");
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }

    /// Check that the configuration can be used.
    pub fn validate(&self) -> Result<()> {
        self.transcoder_pattern()?;
        if self.helper_timeout_ms == 0 {
            return Err(Error::Config(
                "helperTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.shutdown_terminate_timeout_ms == 0 {
            return Err(Error::Config(
                "shutdownTerminateTimeoutMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration store for the process manager settings.
///
/// Handles reading and writing configuration to `~/.dms/process-manager.json`.
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.dms/process-manager.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        let config_path = home.join(".dms").join("process-manager.json");

        Ok(Self { config_path })
    }

    /// Create a config store with a custom path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// The path of the configuration file.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk.
    ///
    /// Returns default config if the file doesn't exist.
    pub async fn load(&self) -> Result<TerminatorConfig> {
        if !self.config_path.exists() {
            return Ok(TerminatorConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: TerminatorConfig = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, config: &TerminatorConfig) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).await.map_err(|e| {
                    Error::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(config)?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }
}

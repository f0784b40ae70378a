use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::worktrees::state::STATE_DIR;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory managed worktrees live in; relative paths resolve against
    /// the repository root
    #[serde(default = "default_worktree_dir")]
    pub worktree_dir: String,
}

fn default_worktree_dir() -> String {
    ".worktrees".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            worktree_dir: default_worktree_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// History window in days for mergeback activity scanning (default: 14)
    #[serde(default = "default_activity_window_days")]
    pub activity_window_days: u32,
}

fn default_activity_window_days() -> u32 {
    14
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            activity_window_days: default_activity_window_days(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to log to a file under the state directory instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    /// Path to the tool config file inside the state directory
    pub fn tool_config_path() -> PathBuf {
        PathBuf::from(STATE_DIR).join("config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the tool works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // Repo-local config in .stagehand/ (primary config location)
        let repo_config = Self::tool_config_path();
        if repo_config.exists() {
            builder = builder.add_source(config::File::from(repo_config));
        }

        // User config in ~/.config/stagehand/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("stagehand").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with STAGEHAND_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("STAGEHAND")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Logs directory under the repository's state dir
    pub fn logs_path(repo_root: &std::path::Path) -> PathBuf {
        repo_root.join(STATE_DIR).join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            planner: PlannerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.paths.worktree_dir, ".worktrees");
        assert_eq!(config.planner.activity_window_days, 14);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.to_file);
    }

    #[test]
    fn default_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.paths.worktree_dir, config.paths.worktree_dir);
    }
}

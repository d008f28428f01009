//! Project Tracker
//!
//! Business core of a dashboard for multi-stage client implementation projects:
//! - Stage readiness rules over the six-stage pipeline
//! - Bottleneck detection for stalled in-progress stages
//! - Debounced auto-save with retries and reconciliation of external updates
//! - Activity log with an injected logger and a cached current user

pub mod activity;
pub mod autosave;
pub mod project;

use anyhow::Result;
use autosave::{AutoSaveConfig, Backoff, RetryPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub autosave: AutoSaveYamlConfig,
    pub store: StoreYamlConfig,
    pub activity: ActivityYamlConfig,
}

/// Auto-save timing section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoSaveYamlConfig {
    pub debounce_ms: u64,
    /// How long the success indicator stays before reverting to idle
    pub success_reset_ms: u64,
    /// Total save attempts, including the first
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub backoff: Backoff,
}

impl Default for AutoSaveYamlConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            success_reset_ms: 3000,
            max_attempts: 3,
            backoff_ms: 500,
            backoff: Backoff::Linear,
        }
    }
}

/// Project store section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreYamlConfig {
    pub data_dir: String,
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".into(),
        }
    }
}

/// Activity log section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActivityYamlConfig {
    pub user_cache_ttl_secs: u64,
    /// User recorded on activity entries when nothing else identifies one
    pub default_user: Option<String>,
}

impl Default for ActivityYamlConfig {
    fn default() -> Self {
        Self {
            user_cache_ttl_secs: 60,
            default_user: None,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub autosave: AutoSaveConfig,
    pub data_dir: PathBuf,
    pub user_cache_ttl: Duration,
    pub default_user: Option<String>,
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "tracker.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let debounce_ms = env_parse("TRACKER_DEBOUNCE_MS").unwrap_or(yaml.autosave.debounce_ms);
        let success_reset_ms =
            env_parse("TRACKER_SUCCESS_RESET_MS").unwrap_or(yaml.autosave.success_reset_ms);
        let max_attempts = env_parse("TRACKER_MAX_ATTEMPTS").unwrap_or(yaml.autosave.max_attempts);
        let backoff_ms = env_parse("TRACKER_BACKOFF_MS").unwrap_or(yaml.autosave.backoff_ms);

        if max_attempts == 0 {
            anyhow::bail!("autosave.max_attempts must be at least 1");
        }

        Ok(Self {
            autosave: AutoSaveConfig {
                debounce: Duration::from_millis(debounce_ms),
                success_reset: Duration::from_millis(success_reset_ms),
                retry: RetryPolicy {
                    max_attempts,
                    base_delay: Duration::from_millis(backoff_ms),
                    backoff: yaml.autosave.backoff,
                },
            },
            data_dir: std::env::var("TRACKER_DATA_DIR")
                .unwrap_or(yaml.store.data_dir)
                .into(),
            user_cache_ttl: Duration::from_secs(yaml.activity.user_cache_ttl_secs),
            default_user: std::env::var("TRACKER_USER")
                .ok()
                .or(yaml.activity.default_user),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("tracker.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

// ============================================================================
// Tests
// ============================================================================

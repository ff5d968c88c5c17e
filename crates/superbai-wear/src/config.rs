//! Runtime configuration for the wearable shell.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use superbai_core::config::SyncSettings;
use superbai_core::util::normalize_text_option;

use crate::error::WearError;

const RUNTIME_CONFIG_FILE: &str = "wear-config.json";
const DEFAULT_SPLASH_MS: u64 = 2500;
const DEFAULT_RESPONSE_WAIT_MS: u64 = 1500;

pub const SNAPSHOT_ENV: &str = "SUPERBAI_SNAPSHOT";
pub const SPLASH_ENV: &str = "SUPERBAI_SPLASH_MS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WearRuntimeConfig {
    /// How long the splash screen stays up
    pub splash_duration_ms: u64,
    /// How long to wait for the phone to answer a refresh request
    pub response_wait_ms: u64,
    pub snapshot_path: Option<PathBuf>,
    pub sync: SyncSettings,
}

impl Default for WearRuntimeConfig {
    fn default() -> Self {
        Self {
            splash_duration_ms: DEFAULT_SPLASH_MS,
            response_wait_ms: DEFAULT_RESPONSE_WAIT_MS,
            snapshot_path: None,
            sync: SyncSettings::default(),
        }
    }
}

impl WearRuntimeConfig {
    pub const fn splash_duration(&self) -> Duration {
        Duration::from_millis(self.splash_duration_ms)
    }

    pub const fn response_wait(&self) -> Duration {
        Duration::from_millis(self.response_wait_ms)
    }

    /// Apply environment overrides. Unparseable values are ignored with a warning.
    pub fn with_env_overrides(mut self, snapshot: Option<String>, splash_ms: Option<String>) -> Self {
        if let Some(snapshot) = normalize_text_option(snapshot) {
            self.snapshot_path = Some(PathBuf::from(snapshot));
        }
        if let Some(raw) = normalize_text_option(splash_ms) {
            match raw.parse::<u64>() {
                Ok(splash_ms) => self.splash_duration_ms = splash_ms,
                Err(error) => tracing::warn!("Ignoring {SPLASH_ENV}={raw}: {error}"),
            }
        }
        self
    }

    /// Validate sync settings, failing on addresses the phone would not match.
    pub fn validated(self) -> Result<Self, WearError> {
        let sync = self
            .sync
            .validated()
            .map_err(|error| WearError::Config(error.to_string()))?;
        Ok(Self { sync, ..self })
    }
}

pub fn default_runtime_config_path() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("superbai")
        .join(RUNTIME_CONFIG_FILE)
}

pub fn load_runtime_config_from_path(path: &Path) -> WearRuntimeConfig {
    if !path.exists() {
        return WearRuntimeConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<WearRuntimeConfig>(&content) {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(
                    "Failed to parse wear runtime config at {}: {}",
                    path.display(),
                    error
                );
                WearRuntimeConfig::default()
            }
        },
        Err(error) => {
            tracing::warn!(
                "Failed to read wear runtime config at {}: {}",
                path.display(),
                error
            );
            WearRuntimeConfig::default()
        }
    }
}

/// Resolve config from file, environment, then the CLI snapshot flag.
pub fn resolve_runtime_config(
    config_path: Option<&Path>,
    snapshot_flag: Option<PathBuf>,
) -> Result<WearRuntimeConfig, WearError> {
    let path = config_path.map_or_else(default_runtime_config_path, Path::to_path_buf);
    let mut config = load_runtime_config_from_path(&path).with_env_overrides(
        std::env::var(SNAPSHOT_ENV).ok(),
        std::env::var(SPLASH_ENV).ok(),
    );
    if let Some(snapshot) = snapshot_flag {
        config.snapshot_path = Some(snapshot);
    }
    config.validated()
}

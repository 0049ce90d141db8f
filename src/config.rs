// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for kubeq
//!
//! User defaults live under ~/.kubeq/:
//! - ~/.kubeq/config.json - user configuration
//! - ~/.kubeq/log/ - rolling log files
//!
//! Cluster address and credentials are not stored here; they come from kubeconfig.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::kubernetes::Backoff;

/// Get the base kubeq directory (~/.kubeq/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kubeq"))
        .context("Could not determine home directory")
}

/// Watch reconnect settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Delay before the first reconnect retry, doubled per consecutive failure
    pub initial_backoff_ms: u64,
    /// Upper bound for the reconnect delay
    pub max_backoff_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let backoff = Backoff::default();
        Self {
            initial_backoff_ms: backoff.initial.as_millis() as u64,
            max_backoff_ms: backoff.max.as_millis() as u64,
        }
    }
}

impl WatchConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            initial: Duration::from_millis(self.initial_backoff_ms),
            max: Duration::from_millis(self.max_backoff_ms.max(self.initial_backoff_ms)),
        }
    }
}

/// kubeq configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Kubeconfig context to use instead of the current one
    #[serde(default)]
    pub context: Option<String>,
    /// Namespace to use instead of the context's default
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the config file path (~/.kubeq/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }
}

//! Runtime configuration.
//!
//! Two sources: a TOML file (`~/.config/torpedo/config.toml` or `--config`)
//! for tunables, and the process environment for the handful of values a CI
//! job injects per run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use envconfig::Envconfig;
use serde::{Deserialize, Serialize};

use crate::scheduler::{TearDownOptions, ValidateOptions};

// ─── File settings ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub kubeconfig: KubeconfigSettings,
    pub validation: ValidationSettings,
    pub teardown: TeardownSettings,
    pub resiliency: ResiliencySettings,
    pub workload: WorkloadSettings,
}

/// Where kubeconfig files named by `KUBECONFIGS` are found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubeconfigSettings {
    pub dir: PathBuf,
    pub configmap: String,
    pub namespace: String,
}

impl Default for KubeconfigSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp"),
            configmap: "kubeconfigs".to_string(),
            namespace: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10 * 60,
            interval_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TeardownSettings {
    pub wait_for_destroy: bool,
    pub wait_for_resource_leak_cleanup: bool,
    pub skip_cluster_scoped_objects: bool,
}

impl Default for TeardownSettings {
    fn default() -> Self {
        Self {
            wait_for_destroy: true,
            wait_for_resource_leak_cleanup: true,
            skip_cluster_scoped_objects: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResiliencySettings {
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
    /// Upper bound for a whole failure scenario (watcher plus injector).
    pub deadline_secs: u64,
}

impl Default for ResiliencySettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            poll_timeout_secs: 10 * 60,
            deadline_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadSettings {
    pub tick_millis: u64,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self { tick_millis: 2_000 }
    }
}

impl Settings {
    /// `~/.config/torpedo/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("torpedo").join("config.toml"))
    }

    /// Load settings from `path`, or from [`Self::default_path`] when `None`.
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate_options(&self) -> ValidateOptions {
        ValidateOptions {
            timeout: Duration::from_secs(self.validation.timeout_secs),
            retry_interval: Duration::from_secs(self.validation.interval_secs),
        }
    }

    pub fn tear_down_options(&self) -> TearDownOptions {
        TearDownOptions {
            wait_for_destroy: self.teardown.wait_for_destroy,
            wait_for_resource_leak_cleanup: self.teardown.wait_for_resource_leak_cleanup,
            skip_cluster_scoped_objects: self.teardown.skip_cluster_scoped_objects,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.resiliency.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.resiliency.poll_timeout_secs)
    }

    pub fn resiliency_deadline(&self) -> Duration {
        Duration::from_secs(self.resiliency.deadline_secs)
    }

    pub fn workload_tick(&self) -> Duration {
        Duration::from_millis(self.workload.tick_millis)
    }
}

// ─── Environment ──────────────────────────────────────────────────────────────

#[derive(Envconfig, Debug, Clone)]
pub struct EnvConfig {
    /// Comma-separated kubeconfig keys: source cluster first, destination second.
    #[envconfig(from = "KUBECONFIGS", default = "")]
    pub kubeconfigs: String,
    #[envconfig(from = "TORPEDO_CONFIG")]
    pub config_path: Option<PathBuf>,
}

impl EnvConfig {
    pub fn kubeconfig_keys(&self) -> Vec<String> {
        self.kubeconfigs
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

//! Config file schema

use crate::error::{ConfigError, Result};
use hcm_cloud::{PollerOption, RetryConfig, RoundInterval};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HcmConfig {
    pub poller: PollerSettings,
    pub retry: RetrySettings,
    pub tcloud: TCloudSettings,
    /// Project root under which the resource store keeps `.hcm/state.json`
    pub state_root: PathBuf,
}

/// Poller tuning; a multiplier of 1.0 or less means a fixed interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    pub initial_delay_ms: u64,
    pub round_interval_ms: u64,
    pub backoff_multiplier: f64,
    pub max_interval_ms: u64,
    pub max_elapsed_secs: Option<u64>,
    pub max_rounds: Option<u32>,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            round_interval_ms: 1000,
            backoff_multiplier: 1.0,
            max_interval_ms: 10_000,
            max_elapsed_secs: Some(60),
            max_rounds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TCloudSettings {
    pub endpoint: String,
    /// Name of the environment variable holding the gateway bearer token
    pub token_env: String,
}

impl Default for TCloudSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://clb.tencentcloudapi.com".to_string(),
            token_env: "HCM_TCLOUD_TOKEN".to_string(),
        }
    }
}

impl HcmConfig {
    /// Parse and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // an empty document deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the discovered config file, or defaults when there is none
    pub fn discover() -> Result<Self> {
        match crate::find_config_file() {
            Ok(path) => Self::load(path),
            Err(ConfigError::ConfigFileNotFound) => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.poller_option().validate().map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.backoff_multiplier must be at least 1.0".into(),
            ));
        }
        if !self.tcloud.endpoint.starts_with("http://")
            && !self.tcloud.endpoint.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "tcloud.endpoint must be an http(s) url: {}",
                self.tcloud.endpoint
            )));
        }
        Ok(())
    }

    pub fn poller_option(&self) -> PollerOption {
        let p = &self.poller;
        let interval = Duration::from_millis(p.round_interval_ms);
        let round_interval = if p.backoff_multiplier <= 1.0 {
            RoundInterval::Fixed(interval)
        } else {
            RoundInterval::Exponential {
                initial: interval,
                multiplier: p.backoff_multiplier,
                max: Duration::from_millis(p.max_interval_ms.max(p.round_interval_ms)),
            }
        };
        PollerOption {
            initial_delay: Duration::from_millis(p.initial_delay_ms),
            round_interval,
            max_elapsed: p.max_elapsed_secs.map(Duration::from_secs),
            max_rounds: p.max_rounds,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
        }
    }

    /// Store root, resolved against `base` when relative
    pub fn state_root(&self, base: &Path) -> PathBuf {
        if self.state_root.is_absolute() {
            self.state_root.clone()
        } else {
            base.join(&self.state_root)
        }
    }
}

//! HCM configuration
//!
//! Locates the `hcm` YAML config file and turns it into the option types the
//! cloud crates consume.

pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{HcmConfig, PollerSettings, RetrySettings, TCloudSettings};

use std::path::PathBuf;

/// Environment variable that points directly at a config file
pub const CONFIG_PATH_ENV: &str = "HCM_CONFIG_PATH";

const CANDIDATES: [&str; 4] = ["hcm.local.yaml", ".hcm.local.yaml", "hcm.yaml", ".hcm.yaml"];

/// Directory for HCM's global configuration, created on demand
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("hcm");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Find the config file to use
///
/// Search order:
/// 1. `HCM_CONFIG_PATH` (direct path)
/// 2. current directory: hcm.local.yaml, .hcm.local.yaml, hcm.yaml, .hcm.yaml
/// 3. the same names inside `./.hcm/`
/// 4. `~/.config/hcm/config.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "{CONFIG_PATH_ENV} points at a missing file");
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let hcm_dir = current_dir.join(".hcm");
    if hcm_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = hcm_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("hcm").join("config.yaml");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

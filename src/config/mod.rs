pub mod log_config;
pub mod remote_config;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

pub use crate::config::log_config::LogConfig;
pub use crate::config::remote_config::RemoteConfig;
use crate::utils::ensure_directory_exists;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_PATH_ENV: &str = "RC_REMOTE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub logging: LogConfig,
}

impl AppConfig {
    /// Config file location: `RC_REMOTE_CONFIG` if set, else the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("", "", "esp32-rc-remote")
            .ok_or_else(|| anyhow!("No home directory to place the config in"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the config from the default location.
    pub async fn load_config() -> Result<Self> {
        Self::load_from(&Self::default_path()?).await
    }

    /// Loads the config from a file, falling back to defaults when it does not exist.
    pub async fn load_from(file_path: &Path) -> Result<Self> {
        if !file_path.exists() {
            warn!("Config file not found at {:?}, using default.", file_path);
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path);
        Ok(config)
    }

    pub async fn save_to(&self, file_path: &Path) -> Result<()> {
        if let Some(config_dir) = file_path.parent() {
            ensure_directory_exists(config_dir).await?;
        }

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(file_path, config_json).await?;
        info!("Config saved to {:?}", file_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::UUID_COMMAND_CHAR;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("rc-remote-config-{}-{}", name, std::process::id()))
            .join(CONFIG_FILE_NAME)
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let config = AppConfig::load_from(&scratch_file("missing")).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.remote.command_characteristic_uuid, UUID_COMMAND_CHAR);
        assert_eq!(config.remote.name_filters, vec!["esp32", "car", "remote", "kumanda"]);
    }

    #[tokio::test]
    async fn saved_config_is_loaded_back() {
        let path = scratch_file("saved");
        let mut config = AppConfig::default();
        config.remote.name_filters = vec!["buggy".to_string()];
        config.remote.connect_timeout_ms = None;

        config.save_to(&path).await.unwrap();
        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"remote":{"connect_timeout_ms":null}}"#).unwrap();
        assert_eq!(config.remote.connect_timeout_ms, None);
        assert_eq!(config.remote.write_timeout_ms, Some(2_000));
        assert_eq!(config.logging.level, "info");
    }
}

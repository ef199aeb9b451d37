use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{ConsoleError, Result};
use classifier_common::utils::validate_url;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConsoleConfig {
    pub backend: BackendConfig,
    pub monitor: MonitorConfig,
    pub downloads: DownloadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_sec: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub close_delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadConfig {
    pub output_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl ConsoleConfig {
    /// Layers defaults, the optional config file and `CLASSIFIER_*` environment
    /// variables (nested keys separated by `__`).
    pub fn load(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(Config::try_from(&ConsoleConfig::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("CLASSIFIER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ConsoleConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_url(&self.backend.base_url).map_err(ConsoleError::Config)?;

        if self.monitor.poll_interval_ms == 0 {
            return Err(ConsoleError::Config(
                "monitor.poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            monitor: MonitorConfig::default(),
            downloads: DownloadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_sec: 30,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            close_delay_ms: 3000,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_backend_cadence() {
        let config = ConsoleConfig::default();

        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.monitor.close_delay(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ConsoleConfig::load("config/does-not-exist").unwrap();

        assert_eq!(config.backend.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_rejects_bad_settings() {
        let mut config = ConsoleConfig::default();
        config.backend.base_url = "localhost:5000".to_string();
        assert!(matches!(config.validate(), Err(ConsoleError::Config(_))));

        let mut config = ConsoleConfig::default();
        config.monitor.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}

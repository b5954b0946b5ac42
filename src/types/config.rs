//! Configuration for fibcache.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::FibcacheResult;

/// Main configuration for fibcache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Driver settings.
    #[serde(default)]
    pub driver: DriverConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Recurrence driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Simulated latency of each recurrence evaluation (in milliseconds).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Pre-seed the cache with the base cases 0 and 1.
    #[serde(default = "default_true")]
    pub seed_base_cases: bool,

    /// How long an external caller waits for a result (in milliseconds).
    /// Unset means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout_ms: Option<u64>,
}

impl DriverConfig {
    /// Evaluation delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Caller wait limit as a [`Duration`], if configured.
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            seed_base_cases: true,
            wait_timeout_ms: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_delay_ms() -> u64 {
    5
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> FibcacheResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> FibcacheResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Creates default configuration.
    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig::default(),
            driver: DriverConfig::default(),
        }
    }

    /// Rejects values that parse but make no sense.
    pub fn validate(&self) -> FibcacheResult<()> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(crate::FibcacheError::config(format!(
                "unknown log_format '{}', expected 'text' or 'json'",
                self.general.log_format
            )));
        }
        if self.driver.wait_timeout_ms == Some(0) {
            return Err(crate::FibcacheError::config(
                "wait_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.driver.delay(), Duration::from_millis(5));
        assert!(config.driver.seed_base_cases);
        assert!(config.driver.wait_timeout().is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[driver]\ndelay_ms = 0\n").unwrap();
        assert_eq!(config.driver.delay_ms, 0);
        assert!(config.driver.seed_base_cases);
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fibcache.toml");

        let mut config = Config::default();
        config.driver.wait_timeout_ms = Some(250);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.driver.wait_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.general.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.driver.wait_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }
}

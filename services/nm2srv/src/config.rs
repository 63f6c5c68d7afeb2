//! nm2srv configuration
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. YAML file (`--config`, else `config/nm2srv.yaml` when present)
//! 3. `NM2SRV_` environment, `__` between levels
//!    (`NM2SRV_ENGINE__MAX_SENSORS=16`, `NM2SRV_LOGGING__LEVEL=debug`)

use crate::alarm::snapshot::DEFAULT_MAX_ALARMS;
use crate::error::{Nm2Error, Result};
use crate::keyspace::KeySpace;
use crate::registry::DEFAULT_MAX_SENSORS;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/nm2srv.yaml";

/// Default upper bound on PDU outlets
pub const DEFAULT_MAX_OUTLETS: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Nm2Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `--log-level`/`RUST_LOG` when given
    #[serde(default)]
    pub level: Option<String>,
    /// Directory for the daily rolling log file
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// JSON lines in the log file
    #[serde(default)]
    pub json: bool,
}

/// Limits and naming for the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub keyspace: KeySpace,
    /// Sensors per group per device
    #[serde(default = "default_max_sensors")]
    pub max_sensors: usize,
    #[serde(default = "default_max_outlets")]
    pub max_outlets: usize,
    /// Alarms per snapshot
    #[serde(default = "default_max_alarms")]
    pub max_alarms: usize,
    /// Walk payloads on every topic, not only the NM2 ones
    #[serde(default)]
    pub accept_all_topics: bool,
}

fn default_service_name() -> String {
    "nm2srv".to_string()
}

fn default_max_sensors() -> usize {
    DEFAULT_MAX_SENSORS
}

fn default_max_outlets() -> usize {
    DEFAULT_MAX_OUTLETS
}

fn default_max_alarms() -> usize {
    DEFAULT_MAX_ALARMS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keyspace: KeySpace::default(),
            max_sensors: default_max_sensors(),
            max_outlets: default_max_outlets(),
            max_alarms: default_max_alarms(),
            accept_all_topics: false,
        }
    }
}

impl Nm2Config {
    /// Load from `path`, or from the default location when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Nm2Config::default()));
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Nm2Error::Config(format!(
                        "Configuration file not found: {}",
                        path.display()
                    )));
                }
                figment = figment.merge(Yaml::file(path));
            },
            None => {
                if Path::new(DEFAULT_CONFIG_PATH).exists() {
                    figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
                }
            },
        }
        let config: Nm2Config = figment
            .merge(Env::prefixed("NM2SRV_").split("__"))
            .extract()
            .map_err(|e| Nm2Error::Config(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.name.is_empty() {
            return Err(Nm2Error::Config("Service name cannot be empty".to_string()));
        }
        let engine = &self.engine;
        if engine.max_sensors == 0 {
            return Err(Nm2Error::Config("engine.max_sensors must be at least 1".to_string()));
        }
        if engine.max_outlets == 0 {
            return Err(Nm2Error::Config("engine.max_outlets must be at least 1".to_string()));
        }
        if engine.max_alarms == 0 {
            return Err(Nm2Error::Config("engine.max_alarms must be at least 1".to_string()));
        }
        let ks = &engine.keyspace;
        for (name, value) in [
            ("ambient_prefix", &ks.ambient_prefix),
            ("outlet_prefix", &ks.outlet_prefix),
            ("alarm_key", &ks.alarm_key),
            ("status_key", &ks.status_key),
        ] {
            if value.is_empty() {
                return Err(Nm2Error::Config(format!("engine.keyspace.{} cannot be empty", name)));
            }
        }
        if ks.ambient_prefix == ks.outlet_prefix {
            return Err(Nm2Error::Config(
                "engine.keyspace.ambient_prefix and outlet_prefix must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate default configuration file
    pub fn generate_default_config() -> String {
        serde_yaml::to_string(&Self::default())
            .unwrap_or_else(|_| "# Failed to generate config file".to_string())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Nm2Config::default();
        assert_eq!(config.service.name, "nm2srv");
        assert_eq!(config.engine.max_sensors, 32);
        assert_eq!(config.engine.max_alarms, 256);
        assert_eq!(config.engine.keyspace.alarm_key, "ups.alarm");
        assert!(!config.engine.accept_all_topics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_config_parses_back() {
        let yaml = Nm2Config::generate_default_config();
        let parsed: Nm2Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, Nm2Config::default());
    }

    #[test]
    #[serial]
    fn test_load_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "engine:\n  max_sensors: 8\n  keyspace:\n    ambient_prefix: env\n"
        )
        .unwrap();

        let config = Nm2Config::load(Some(file.path())).unwrap();
        assert_eq!(config.engine.max_sensors, 8);
        assert_eq!(config.engine.keyspace.ambient_prefix, "env");
        // Untouched fields keep their defaults
        assert_eq!(config.engine.keyspace.outlet_prefix, "outlet");
        assert_eq!(config.engine.max_alarms, 256);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "engine:\n  max_alarms: 10\n").unwrap();

        std::env::set_var("NM2SRV_ENGINE__MAX_ALARMS", "20");
        let result = Nm2Config::load(Some(file.path()));
        std::env::remove_var("NM2SRV_ENGINE__MAX_ALARMS");

        assert_eq!(result.unwrap().engine.max_alarms, 20);
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        let result = Nm2Config::load(Some(Path::new("/nonexistent/nm2srv.yaml")));
        assert!(matches!(result, Err(Nm2Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Nm2Config::default();
        config.engine.max_alarms = 0;
        assert!(config.validate().is_err());

        let mut config = Nm2Config::default();
        config.engine.keyspace.outlet_prefix = "ambient".to_string();
        assert!(config.validate().is_err());
    }
}

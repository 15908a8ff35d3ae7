//! Service configuration via `ria.toml`
//!
//! The host reads one config file at startup. On first start a default
//! `ria.toml` with comments is created next to the service. To change
//! settings, edit the file and restart.

use ria_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name placed in the service directory.
pub const CONFIG_FILE_NAME: &str = "ria.toml";

/// When error details (stack traces) are hidden from clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomErrorsMode {
    /// Always hide details
    On,
    /// Never hide details
    Off,
    /// Hide details from remote clients only
    RemoteOnly,
}

impl Default for CustomErrorsMode {
    fn default() -> Self {
        CustomErrorsMode::RemoteOnly
    }
}

/// Service configuration loaded from `ria.toml`.
///
/// # Example
///
/// ```toml
/// custom_errors = "remote_only"
/// # max_change_set_entries = 1000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Stack-trace suppression mode.
    #[serde(default)]
    pub custom_errors: CustomErrorsMode,
    /// Largest accepted change set, unlimited when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_change_set_entries: Option<usize>,
}

impl ServiceConfig {
    /// Whether stack traces are removed from results sent to this caller
    pub fn suppress_stack_traces(&self, is_local: bool) -> bool {
        match self.custom_errors {
            CustomErrorsMode::On => true,
            CustomErrorsMode::Off => false,
            CustomErrorsMode::RemoteOnly => !is_local,
        }
    }

    /// Check a batch size against `max_change_set_entries`
    pub fn check_change_set_size(&self, entries: usize) -> Result<()> {
        match self.max_change_set_entries {
            Some(max) if entries > max => Err(Error::invalid_change_set(format!(
                "change set has {} entries, the limit is {}",
                entries, max
            ))),
            _ => Ok(()),
        }
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# OpenRIA service configuration
#
# Error detail returned to clients: "on", "off" or "remote_only" (default)
#   "on"          = stack traces are always removed from validation errors
#   "off"         = stack traces are always returned
#   "remote_only" = stack traces are returned to local callers only
custom_errors = "remote_only"

# Largest change set accepted in one submit (default: unlimited).
# max_change_set_entries = 1000
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Load `ria.toml` from `dir`, creating the default file first if missing.
    pub fn load_or_create(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        Self::write_default_if_missing(&path)?;
        Self::from_file(&path)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!("Failed to write config file '{}': {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_remote_only() {
        let config = ServiceConfig::default();
        assert_eq!(config.custom_errors, CustomErrorsMode::RemoteOnly);
        assert!(config.suppress_stack_traces(false));
        assert!(!config.suppress_stack_traces(true));
    }

    #[test]
    fn parse_modes() {
        let on: ServiceConfig = toml::from_str("custom_errors = \"on\"").unwrap();
        assert!(on.suppress_stack_traces(true));
        let off: ServiceConfig = toml::from_str("custom_errors = \"off\"").unwrap();
        assert!(!off.suppress_stack_traces(false));
    }

    #[test]
    fn parse_invalid_mode_returns_error() {
        assert!(toml::from_str::<ServiceConfig>("custom_errors = \"sometimes\"").is_err());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn default_toml_parses_correctly() {
        let config: ServiceConfig = toml::from_str(ServiceConfig::default_toml()).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn change_set_limit() {
        let config: ServiceConfig = toml::from_str("max_change_set_entries = 2").unwrap();
        assert!(config.check_change_set_size(2).is_ok());
        assert!(matches!(
            config.check_change_set_size(3),
            Err(Error::InvalidChangeSet { .. })
        ));
        assert!(ServiceConfig::default().check_change_set_size(usize::MAX).is_ok());
    }

    #[test]
    fn load_or_create_writes_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        let config = ServiceConfig::load_or_create(dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "custom_errors = \"off\"\n").unwrap();

        ServiceConfig::write_default_if_missing(&path).unwrap();
        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.custom_errors, CustomErrorsMode::Off);
    }

    #[test]
    fn write_to_file_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ServiceConfig {
            custom_errors: CustomErrorsMode::On,
            max_change_set_entries: Some(10),
        };
        config.write_to_file(&path).unwrap();
        assert_eq!(ServiceConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = ServiceConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}

mod model;
mod raw;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use gob_types::{ControllerSettings, ServiceDefinition};

pub use model::Config;

/// Version assumed when a document does not name one.
pub const CONFIG_VERSION: u32 = 1;

/// Error type for configuration parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[cfg(feature = "toml")]
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "yaml")]
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown config extension `{0}`")]
    UnknownExtension(String),

    #[error("validation error(s): {0}")]
    Validation(String),
}

/// Owner of the loaded configuration; hands out service definitions.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    path: Option<PathBuf>,
    config: Config,
}

impl ConfigManager {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { path: None, config }
    }

    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = load_from_path(path)?;
        tracing::debug!(
            "Loaded {} service definition(s) from {}",
            config.services.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path.to_owned()),
            config,
        })
    }

    /// Like [`ConfigManager::load`], but a missing file yields an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file exists but cannot be read or parsed.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Config file {} not found, continuing without services",
                    path.display()
                );
                Ok(Self {
                    path: Some(path.to_owned()),
                    config: Config::default(),
                })
            }
            other => other,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn get_all_service_definitions(&self) -> &BTreeMap<String, ServiceDefinition> {
        &self.config.services
    }

    /// Definition of `name`, or an empty one if it is not configured.
    #[must_use]
    pub fn get_service_config(&self, name: &str) -> ServiceDefinition {
        self.config.services.get(name).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn controller(&self) -> &ControllerSettings {
        &self.config.controller
    }
}

/// Load a configuration from a file path.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration file cannot be read or parsed.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_auto(&text, path)
}

/// Parse a configuration, picking the format from the path's extension.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration string cannot be parsed.
pub fn parse_auto(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => parse_yaml(text),
        #[cfg(feature = "toml")]
        "toml" => parse_toml(text),
        _ => Err(ConfigError::UnknownExtension(ext.to_owned())),
    }
}

/// Parse a YAML configuration.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration string cannot be parsed.
#[cfg(feature = "yaml")]
pub fn parse_yaml(config: &str) -> Result<Config, ConfigError> {
    if config.trim().is_empty() {
        return Ok(Config::default());
    }
    let raw_config = serde_yaml::from_str::<raw::RawConfig>(config)?;
    raw_config.try_into()
}

/// Parse a TOML configuration.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration string cannot be parsed.
#[cfg(feature = "toml")]
pub fn parse_toml(config: &str) -> Result<Config, ConfigError> {
    let raw_config = toml::from_str::<raw::RawConfig>(config)?;
    raw_config.try_into()
}

#[cfg(test)]
mod tests {
    use std::{io::Write, time::Duration};

    use gob_types::StopPolicy;

    use super::*;

    #[test]
    #[cfg(feature = "toml")]
    fn parse_toml_ok() {
        let txt = r#"
            version = 1
            [services.api]
            start_command = "cargo run --bin api"

            [services.db]
            start_command = "postgres -D .pg"
            working_dir = "/var/lib/pg"
        "#;
        let config = parse_toml(txt).unwrap();
        assert!(config.services.contains_key("api"));
        assert_eq!(
            config.services["api"].start_command.as_deref(),
            Some("cargo run --bin api")
        );
        assert_eq!(
            config.services["db"].working_dir,
            Some(PathBuf::from("/var/lib/pg"))
        );
        assert_eq!(config.version, 1);
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn parse_yaml_ok() {
        let txt = r"
controller:
  name: gob-controller
  grace_period_secs: 1
  stop_policy: graceful
  stop_timeout_secs: 4
services:
  gob-controller:
    start_command: python3 controller.py
  storykeeper:
    start_command: python3 storykeeper.py
    stop_command: touch /tmp/storykeeper.stop
    env:
      LOG_LEVEL: debug
  dashboard: {}
";
        let config = parse_yaml(txt).unwrap();
        assert_eq!(config.services.len(), 3);
        assert_eq!(config.controller.grace_period, Duration::from_secs(1));
        assert_eq!(
            config.controller.stop,
            StopPolicy::Graceful {
                timeout: Duration::from_secs(4)
            }
        );
        assert!(!config.services["dashboard"].is_startable());
        assert_eq!(config.services["storykeeper"].env["LOG_LEVEL"], "debug");
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn parse_yaml_empty_document() {
        let config = parse_yaml("\n").unwrap();
        assert!(config.services.is_empty());
        assert_eq!(config.controller, ControllerSettings::default());
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    #[cfg(all(feature = "yaml", feature = "toml"))]
    fn empty_documents_agree_across_formats() {
        let yaml = parse_yaml("").unwrap();
        let toml = parse_toml("").unwrap();

        assert_eq!(yaml, toml);
        assert_eq!(yaml, Config::default());
        assert_eq!(ConfigManager::default().config().version, 1);
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn parse_yaml_rejects_unknown_policy() {
        let txt = "controller:\n  stop_policy: politely\n";
        assert!(matches!(parse_yaml(txt), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn parse_auto_unknown_extension() {
        let result = parse_auto("", Path::new("gob.ini"));
        assert!(matches!(result, Err(ConfigError::UnknownExtension(ext)) if ext == "ini"));
    }

    #[test]
    #[cfg(feature = "yaml")]
    fn load_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "services:\n  svcA:\n    start_command: sleep 100").unwrap();

        let manager = ConfigManager::load(file.path()).unwrap();
        assert_eq!(manager.path(), Some(file.path()));
        assert_eq!(
            manager.get_service_config("svcA"),
            ServiceDefinition::new("sleep 100")
        );
        assert_eq!(
            manager.get_service_config("missing"),
            ServiceDefinition::default()
        );
        assert_eq!(manager.get_all_service_definitions().len(), 1);
    }

    #[test]
    fn load_or_empty_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gob.yaml");

        assert!(matches!(
            ConfigManager::load(&path),
            Err(ConfigError::Io(_))
        ));

        let manager = ConfigManager::load_or_empty(&path).unwrap();
        assert!(manager.get_all_service_definitions().is_empty());
        assert_eq!(manager.controller(), &ControllerSettings::default());
    }
}

use std::{collections::BTreeMap, time::Duration};

use gob_types::{ControllerSettings, ServiceDefinition, StopPolicy};

use crate::{
    raw::{RawConfig, RawController, RawService, RawStopPolicy},
    ConfigError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub version: u32,
    pub controller: ControllerSettings,
    pub services: BTreeMap<String, ServiceDefinition>,
}

/// An empty configuration: no services, default controller settings.
impl Default for Config {
    fn default() -> Self {
        Self {
            version: crate::CONFIG_VERSION,
            controller: ControllerSettings::default(),
            services: BTreeMap::new(),
        }
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw_config: RawConfig) -> Result<Self, Self::Error> {
        let services = raw_config
            .services
            .into_iter()
            .map(|(name, raw_service)| {
                if name.trim().is_empty() {
                    return Err(ConfigError::Validation(
                        "service name must not be empty".to_owned(),
                    ));
                }
                if name.chars().any(char::is_whitespace) {
                    return Err(ConfigError::Validation(format!(
                        "service `{name}`: name contains whitespace"
                    )));
                }

                let service = service_from_raw(&name, raw_service)?;
                Ok((name, service))
            })
            .collect::<Result<BTreeMap<String, ServiceDefinition>, Self::Error>>()?;

        Ok(Config {
            version: raw_config.version,
            controller: controller_from_raw(raw_config.controller.unwrap_or_default()),
            services,
        })
    }
}

fn service_from_raw(name: &str, raw_service: RawService) -> Result<ServiceDefinition, ConfigError> {
    let working_dir = match raw_service.working_dir {
        Some(dir) if dir.trim().is_empty() => {
            return Err(ConfigError::Validation(format!(
                "service `{name}`: working_dir is empty"
            )));
        }
        Some(dir) => Some(dir.into()),
        None => None,
    };

    Ok(ServiceDefinition {
        start_command: non_blank(raw_service.start_command),
        stop_command: non_blank(raw_service.stop_command),
        working_dir,
        env: raw_service.env.unwrap_or_default(),
    })
}

fn controller_from_raw(raw: RawController) -> ControllerSettings {
    let defaults = ControllerSettings::default();
    let stop_timeout = raw
        .stop_timeout_secs
        .map_or(defaults.stop_timeout, Duration::from_secs);

    let stop = match raw.stop_policy {
        Some(RawStopPolicy::Graceful) => StopPolicy::Graceful {
            timeout: stop_timeout,
        },
        Some(RawStopPolicy::Kill) | None => StopPolicy::Kill,
    };

    ControllerSettings {
        name: raw
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.name),
        grace_period: raw
            .grace_period_secs
            .map_or(defaults.grace_period, Duration::from_secs),
        stop,
        stop_timeout,
    }
}

/// Blank commands count as absent.
fn non_blank(command: Option<String>) -> Option<String> {
    command.filter(|c| !c.trim().is_empty())
}

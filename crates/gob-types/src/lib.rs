use std::{collections::BTreeMap, path::PathBuf, time::Duration};

/// Name the controller registers under unless configured otherwise.
pub const DEFAULT_CONTROLLER_NAME: &str = "gob-controller";

/// How a single managed service is launched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDefinition {
    /// Shell command line. A service without one is listed but never started.
    pub start_command: Option<String>,
    pub stop_command: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl ServiceDefinition {
    #[must_use]
    pub fn new(start_command: impl Into<String>) -> Self {
        Self {
            start_command: Some(start_command.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_startable(&self) -> bool {
        self.start_command.is_some()
    }
}

/// Termination strategy applied to a service's process group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopPolicy {
    /// `SIGKILL` the group immediately.
    #[default]
    Kill,
    /// `SIGTERM` the group, then `SIGKILL` whatever is left after `timeout`.
    Graceful { timeout: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// The controller's own service name; never supervised by itself.
    pub name: String,
    pub grace_period: Duration,
    pub stop: StopPolicy,
    /// Upper bound for running a service's stop command.
    pub stop_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONTROLLER_NAME.to_owned(),
            grace_period: Duration::from_secs(5),
            stop: StopPolicy::Kill,
            stop_timeout: Duration::from_secs(10),
        }
    }
}

use std::{
    collections::BTreeMap,
    io,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, SystemTime},
};

use gob_config::ConfigManager;
use gob_types::{ServiceDefinition, StopPolicy};

use crate::{
    error::{Result, ServiceError},
    process_manager::{CommandSpec, Delivery, ProcessManager},
    types::{Exit, ServiceSnapshot, ServiceStatus, StartOutcome, StopOutcome},
};

/// How long a signalled group leader gets to be reaped.
const REAP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Stopped,
    Running,
}

#[derive(Debug)]
struct ServiceRecord<H> {
    name: String,
    definition: ServiceDefinition,
    state: State,
    handle: Option<H>,
    started_at: Option<SystemTime>,
    last_exit: Option<Exit>,
    last_error: Option<ServiceError>,
}

impl<H> ServiceRecord<H> {
    fn new(name: String, definition: ServiceDefinition) -> Self {
        Self {
            name,
            definition,
            state: State::Stopped,
            handle: None,
            started_at: None,
            last_exit: None,
            last_error: None,
        }
    }

    fn mark_stopped(&mut self, exit: Option<Exit>) {
        self.state = State::Stopped;
        self.handle = None;
        self.started_at = None;
        if exit.is_some() {
            self.last_exit = exit;
        }
    }
}

fn command_spec(definition: &ServiceDefinition, name: String, cmd: String) -> CommandSpec {
    CommandSpec {
        name,
        cmd,
        cwd: definition.working_dir.clone(),
        env: definition
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

/// Owner of the service table and the only component that spawns or signals
/// service processes.
///
/// Each record has its own lock, held for the whole of a start, stop or status
/// call, so concurrent callers never spawn two groups for one service.
#[derive(Debug)]
pub struct ServiceManager<P: ProcessManager> {
    process_manager: P,
    stop_policy: StopPolicy,
    stop_timeout: Duration,
    services: BTreeMap<String, Mutex<ServiceRecord<P::Handle>>>,
}

impl<P: ProcessManager> ServiceManager<P> {
    /// Build the service table. Every service starts out stopped; nothing is spawned.
    pub fn load(process_manager: P, definitions: &BTreeMap<String, ServiceDefinition>) -> Self {
        let services = definitions
            .iter()
            .map(|(name, definition)| {
                (
                    name.clone(),
                    Mutex::new(ServiceRecord::new(name.clone(), definition.clone())),
                )
            })
            .collect();

        tracing::debug!("Loaded {} service(s)", definitions.len());

        Self {
            process_manager,
            stop_policy: StopPolicy::default(),
            stop_timeout: gob_types::ControllerSettings::default().stop_timeout,
            services,
        }
    }

    pub fn from_config(process_manager: P, config: &ConfigManager) -> Self {
        let settings = config.controller();
        Self::load(process_manager, config.get_all_service_definitions())
            .with_stop_policy(settings.stop)
            .with_stop_timeout(settings.stop_timeout)
    }

    #[must_use]
    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    /// Bound for running a service's stop command.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Current status of `name`, re-checked against the OS.
    pub fn get_status(&self, name: &str) -> ServiceStatus {
        match self.record(name) {
            Ok(mut record) => self.refresh(&mut record).into(),
            Err(_) => ServiceStatus::NotFound,
        }
    }

    pub fn get_all_statuses(&self) -> BTreeMap<String, ServiceStatus> {
        self.names()
            .map(|name| (name.to_owned(), self.get_status(name)))
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self, name: &str) -> Option<ServiceSnapshot> {
        let mut record = self.record(name).ok()?;
        let status = self.refresh(&mut record).into();

        Some(ServiceSnapshot {
            name: record.name.clone(),
            status,
            pid: record
                .handle
                .as_ref()
                .map(|handle| self.process_manager.pid(handle)),
            started_at: record.started_at,
            last_exit: record.last_exit,
            last_error: record.last_error.as_ref().map(ToString::to_string),
        })
    }

    /// Start `name`. Returns `true` only if a new process group was spawned.
    pub fn start(&self, name: &str) -> bool {
        match self.try_start(name) {
            Ok(StartOutcome::Started { .. }) => true,
            Ok(StartOutcome::AlreadyRunning) => false,
            Err(err) => {
                tracing::debug!("Service {name:?} not started: {err}");
                false
            }
        }
    }

    /// Start `name`, reporting why nothing was spawned.
    ///
    /// # Errors
    ///
    /// Returns `UnknownService`, `MissingStartCommand` or `SpawnFailure`. A
    /// spawn failure is also kept on the record.
    pub fn try_start(&self, name: &str) -> Result<StartOutcome> {
        let mut record = self.record(name)?;
        if self.refresh(&mut record) == State::Running {
            tracing::debug!("Service {name:?} is already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let Some(cmd) = record.definition.start_command.clone() else {
            return Err(ServiceError::MissingStartCommand(name.to_owned()));
        };
        let spec = command_spec(&record.definition, name.to_owned(), cmd);

        match self.process_manager.spawn(&spec) {
            Ok(handle) => {
                let pid = self.process_manager.pid(&handle);
                tracing::info!("Started service {name:?} (pid {pid}): {}", spec.cmd);

                record.handle = Some(handle);
                record.state = State::Running;
                record.started_at = Some(SystemTime::now());
                record.last_error = None;
                Ok(StartOutcome::Started { pid })
            }
            Err(err) => {
                let err = ServiceError::spawn(name, err);
                tracing::error!("{err}");

                record.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Stop `name` by signalling its whole process group.
    ///
    /// Returns `true` when the service went from running to stopped, including
    /// when its process had already exited before the signal.
    pub fn stop(&self, name: &str) -> bool {
        match self.try_stop(name) {
            Ok(StopOutcome::Stopped | StopOutcome::AlreadyExited) => true,
            Ok(StopOutcome::AlreadyStopped) => false,
            Err(err) => {
                tracing::debug!("Service {name:?} not stopped: {err}");
                false
            }
        }
    }

    /// Stop `name`, reporting how the group went away.
    ///
    /// # Errors
    ///
    /// Returns `UnknownService`, `Signal` if the group could not be signalled
    /// for a reason other than having already exited, or `NotReaped` if the
    /// leader was signalled but no exit was observed. In both of the latter
    /// cases the service is still considered running.
    pub fn try_stop(&self, name: &str) -> Result<StopOutcome> {
        let mut guard = self.record(name)?;
        let record = &mut *guard;

        let Some(handle) = record.handle.as_mut() else {
            record.state = State::Stopped;
            return Ok(StopOutcome::AlreadyStopped);
        };

        let already_exited = matches!(self.process_manager.try_wait(handle), Ok(Some(_)));
        if already_exited {
            tracing::warn!("Service {name:?} exited before it was stopped");
        } else if let Some(cmd) = record.definition.stop_command.clone() {
            let spec = command_spec(&record.definition, format!("{name}:stop"), cmd);
            if let Err(err) = self.run_to_completion(&spec) {
                let err = ServiceError::stop_command(name, err);
                tracing::warn!("{err}");
                record.last_error = Some(err);
            }
        }

        let delivery = match self.terminate(name, handle) {
            Ok(delivery) => delivery,
            Err(err) => {
                let err = ServiceError::signal(name, err);
                tracing::error!("{err}");

                record.last_error = Some(err.clone());
                return Err(err);
            }
        };

        let exit = match self.process_manager.wait(handle, REAP_TIMEOUT) {
            Ok(exit) => exit,
            Err(err) => {
                tracing::warn!("Cannot reap service {name:?}: {err}");
                None
            }
        };
        if exit.is_none() && delivery == Delivery::Delivered {
            // The group may still be alive; keep the handle so it is never orphaned.
            let err = ServiceError::NotReaped(name.to_owned());
            tracing::error!("{err} within {REAP_TIMEOUT:?}");

            record.state = State::Running;
            record.last_error = Some(err.clone());
            return Err(err);
        }
        record.mark_stopped(exit);

        if already_exited || delivery == Delivery::AlreadyExited {
            tracing::info!("Stopped service {name:?} (already exited)");
            Ok(StopOutcome::AlreadyExited)
        } else {
            tracing::info!("Stopped service {name:?}");
            Ok(StopOutcome::Stopped)
        }
    }

    fn record(&self, name: &str) -> Result<MutexGuard<'_, ServiceRecord<P::Handle>>> {
        let record = self
            .services
            .get(name)
            .ok_or_else(|| ServiceError::UnknownService(name.to_owned()))?;

        Ok(record.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Poll the group leader and cache what was observed.
    fn refresh(&self, record: &mut ServiceRecord<P::Handle>) -> State {
        let Some(handle) = record.handle.as_mut() else {
            record.state = State::Stopped;
            return State::Stopped;
        };

        match self.process_manager.try_wait(handle) {
            Ok(None) => record.state = State::Running,
            Ok(Some(exit)) => {
                tracing::warn!("Service {:?} exited on its own ({exit})", record.name);
                record.mark_stopped(Some(exit));
            }
            Err(err) => {
                // Without an observed exit the group may still be alive.
                let err = ServiceError::poll(&record.name, err);
                tracing::error!("{err}");

                record.state = State::Running;
                record.last_error = Some(err);
            }
        }

        record.state
    }

    fn terminate(&self, name: &str, handle: &mut P::Handle) -> io::Result<Delivery> {
        match self.stop_policy {
            StopPolicy::Kill => self.process_manager.kill(handle),
            StopPolicy::Graceful { timeout } => {
                if self.process_manager.shutdown(handle)? == Delivery::AlreadyExited {
                    return Ok(Delivery::AlreadyExited);
                }

                match self.process_manager.wait(handle, timeout) {
                    Ok(Some(_)) => {
                        // Leader is gone; sweep whatever is left of the group.
                        self.process_manager.kill(handle)?;
                        return Ok(Delivery::Delivered);
                    }
                    Ok(None) => tracing::warn!(
                        "Service {name:?} still running {timeout:?} after SIGTERM, sending SIGKILL"
                    ),
                    Err(err) => tracing::warn!("Cannot wait for service {name:?}: {err}"),
                }

                self.process_manager.kill(handle)?;
                Ok(Delivery::Delivered)
            }
        }
    }

    /// Run a one-off command in its own group, bounded by the stop timeout.
    fn run_to_completion(&self, spec: &CommandSpec) -> io::Result<()> {
        tracing::debug!("Running {:?}: {}", spec.name, spec.cmd);

        let mut handle = self.process_manager.spawn(spec)?;
        match self.process_manager.wait(&mut handle, self.stop_timeout)? {
            Some(exit) if exit.success() => Ok(()),
            Some(exit) => Err(io::Error::other(format!("finished with {exit}"))),
            None => {
                self.process_manager.kill(&handle)?;
                let _ = self.process_manager.wait(&mut handle, REAP_TIMEOUT);
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("still running after {:?}", self.stop_timeout),
                ))
            }
        }
    }
}

impl From<State> for ServiceStatus {
    fn from(state: State) -> Self {
        match state {
            State::Stopped => Self::Stopped,
            State::Running => Self::Running,
        }
    }
}

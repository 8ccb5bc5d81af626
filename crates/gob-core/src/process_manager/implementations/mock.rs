use std::{
    collections::HashSet,
    io,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::{
    process_manager::{
        base::ProcessManager,
        types::{CommandSpec, Delivery},
    },
    types::Exit,
};

#[derive(Debug, Default)]
struct MockState {
    spawned: Vec<CommandSpec>,
    exits: Vec<Option<Exit>>,
    signals: Vec<(usize, &'static str)>,
    failing: HashSet<String>,
    instant: HashSet<String>,
    stubborn: HashSet<String>,
    deny_signals: bool,
    fail_poll: bool,
}

/// In-memory process manager. Clones share state, so a test keeps one clone to
/// steer and inspect processes owned by the service manager.
#[derive(Debug, Default, Clone)]
pub(crate) struct MockProcessManager {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug)]
pub(crate) struct MockChild {
    id: usize,
}

impl MockProcessManager {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Spawning `cmd` fails with `NotFound`.
    pub fn fail_spawn(&self, cmd: &str) {
        self.state().failing.insert(cmd.to_owned());
    }

    /// `cmd` exits with code 0 as soon as it is spawned.
    pub fn finish_immediately(&self, cmd: &str) {
        self.state().instant.insert(cmd.to_owned());
    }

    /// `cmd` ignores `SIGTERM`.
    pub fn ignore_term(&self, cmd: &str) {
        self.state().stubborn.insert(cmd.to_owned());
    }

    /// Every signal fails with `EPERM`.
    pub fn deny_signals(&self, deny: bool) {
        self.state().deny_signals = deny;
    }

    /// Polling any process fails with `ECHILD`, as when `SIGCHLD` is ignored.
    pub fn fail_poll(&self, fail: bool) {
        self.state().fail_poll = fail;
    }

    /// Simulate the spawned process `id` exiting on its own.
    pub fn exit(&self, id: usize, exit: Exit) {
        self.state().exits[id] = Some(exit);
    }

    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.state().spawned.clone()
    }

    pub fn signals(&self) -> Vec<(usize, &'static str)> {
        self.state().signals.clone()
    }

    pub fn alive(&self) -> usize {
        self.state().exits.iter().filter(|e| e.is_none()).count()
    }

    fn signal(&self, id: usize, name: &'static str, exit: Exit) -> io::Result<Delivery> {
        let mut state = self.state();
        if state.deny_signals {
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }
        state.signals.push((id, name));

        if state.exits[id].is_some() {
            return Ok(Delivery::AlreadyExited);
        }
        let stubborn = state.stubborn.contains(&state.spawned[id].cmd);
        if !(name == "SIGTERM" && stubborn) {
            state.exits[id] = Some(exit);
        }
        Ok(Delivery::Delivered)
    }
}

impl ProcessManager for MockProcessManager {
    type Handle = MockChild;

    fn spawn(&self, spec: &CommandSpec) -> io::Result<MockChild> {
        let mut state = self.state();
        if state.failing.contains(&spec.cmd) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such command"));
        }

        let exit = state
            .instant
            .contains(&spec.cmd)
            .then_some(Exit::Code(0));
        state.spawned.push(spec.clone());
        state.exits.push(exit);

        Ok(MockChild {
            id: state.spawned.len() - 1,
        })
    }

    fn pid(&self, handle: &MockChild) -> u32 {
        1000 + u32::try_from(handle.id).unwrap()
    }

    fn try_wait(&self, handle: &mut MockChild) -> io::Result<Option<Exit>> {
        let state = self.state();
        if state.fail_poll {
            return Err(io::Error::from_raw_os_error(libc::ECHILD));
        }
        Ok(state.exits[handle.id])
    }

    fn wait(&self, handle: &mut MockChild, _d: Duration) -> io::Result<Option<Exit>> {
        self.try_wait(handle)
    }

    fn shutdown(&self, handle: &MockChild) -> io::Result<Delivery> {
        self.signal(handle.id, "SIGTERM", Exit::Signal(libc::SIGTERM))
    }

    fn kill(&self, handle: &MockChild) -> io::Result<Delivery> {
        self.signal(handle.id, "SIGKILL", Exit::Signal(libc::SIGKILL))
    }
}

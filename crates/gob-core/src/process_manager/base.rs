use std::{fmt::Debug, io, time::Duration};

use crate::{
    process_manager::types::{CommandSpec, Delivery},
    types::Exit,
};

/// OS process control used by the service manager.
///
/// Every spawned command leads a process group of its own, so signals reach
/// the whole tree the command forks.
pub trait ProcessManager: Send + Sync {
    type Handle: Send + Debug;

    /// Spawn a new process group.
    fn spawn(&self, spec: &CommandSpec) -> io::Result<Self::Handle>;
    /// Pid of the group leader.
    fn pid(&self, handle: &Self::Handle) -> u32;
    /// Check whether the group leader has exited, without blocking.
    fn try_wait(&self, handle: &mut Self::Handle) -> io::Result<Option<Exit>>;
    /// Wait up to `d` for the group leader to exit.
    fn wait(&self, handle: &mut Self::Handle, d: Duration) -> io::Result<Option<Exit>>;
    /// Gracefully shutdown the process group.
    fn shutdown(&self, handle: &Self::Handle) -> io::Result<Delivery>;
    /// Forcefully kill the process group.
    fn kill(&self, handle: &Self::Handle) -> io::Result<Delivery>;
}

use std::{
    io,
    os::unix::process::{CommandExt, ExitStatusExt},
    process::{Child, Command, ExitStatus, Stdio},
    thread::sleep,
    time::{Duration, Instant},
};

use libc::{killpg, setsid, ESRCH, SIGKILL, SIGTERM};

use crate::{
    process_manager::{
        base::ProcessManager,
        types::{CommandSpec, Delivery},
    },
    types::Exit,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A spawned group leader together with its process group id.
#[derive(Debug)]
pub struct UnixChild {
    child: Child,
    pgid: libc::pid_t,
}

impl UnixChild {
    #[must_use]
    pub fn pgid(&self) -> libc::pid_t {
        self.pgid
    }
}

/// Unix-specific process manager. Runs every command through `sh -c`.
#[derive(Debug)]
pub struct UnixProcessManager {
    shell: String,
}

impl Default for UnixProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UnixProcessManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shell: "sh".to_owned(),
        }
    }

    /// Use another POSIX shell to interpret command lines.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> io::Result<Delivery> {
        #[allow(unsafe_code)]
        let rc = unsafe { killpg(pgid, signal) };
        if rc == -1 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(ESRCH) {
                return Ok(Delivery::AlreadyExited);
            }
            return Err(err);
        }

        Ok(Delivery::Delivered)
    }
}

fn exit_from_status(status: ExitStatus) -> Exit {
    match (status.code(), status.signal()) {
        (Some(code), _) => Exit::Code(code),
        (None, Some(signal)) => Exit::Signal(signal),
        (None, None) => Exit::Code(-1),
    }
}

impl ProcessManager for UnixProcessManager {
    type Handle = UnixChild;

    fn spawn(&self, spec: &CommandSpec) -> io::Result<UnixChild> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(&spec.cmd);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }

        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(|| {
                if setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        cmd.stdin(Stdio::null());

        let child = cmd.spawn()?;
        let pgid = libc::pid_t::try_from(child.id())
            .map_err(|_| io::Error::other("pid does not fit into pid_t"))?;

        Ok(UnixChild { child, pgid })
    }

    fn pid(&self, handle: &UnixChild) -> u32 {
        handle.child.id()
    }

    fn try_wait(&self, handle: &mut UnixChild) -> io::Result<Option<Exit>> {
        Ok(handle.child.try_wait()?.map(exit_from_status))
    }

    fn wait(&self, handle: &mut UnixChild, d: Duration) -> io::Result<Option<Exit>> {
        let start = Instant::now();
        loop {
            if let Some(exit) = self.try_wait(handle)? {
                return Ok(Some(exit));
            }

            if start.elapsed() >= d {
                return Ok(None);
            }
            sleep(POLL_INTERVAL);
        }
    }

    fn shutdown(&self, handle: &UnixChild) -> io::Result<Delivery> {
        Self::signal_group(handle.pgid, SIGTERM)
    }

    fn kill(&self, handle: &UnixChild) -> io::Result<Delivery> {
        Self::signal_group(handle.pgid, SIGKILL)
    }
}

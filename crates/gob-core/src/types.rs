use std::{fmt, time::SystemTime};

use serde::Serialize;

/// Result of a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// The name is not in the service table.
    NotFound,
    Stopped,
    Running,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not_found",
            Self::Stopped => "stopped",
            Self::Running => "running",
        })
    }
}

/// How a process group leader terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exit {
    Code(i32),
    Signal(i32),
}

impl Exit {
    #[must_use]
    pub fn success(self) -> bool {
        self == Self::Code(0)
    }
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {code}"),
            Self::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: u32 },
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The group was alive and has been signalled.
    Stopped,
    /// The group was already gone when the signal was sent.
    AlreadyExited,
    AlreadyStopped,
}

/// Point-in-time copy of a service record.
#[derive(Debug, Clone)]
pub struct ServiceSnapshot {
    pub name: String,
    pub status: ServiceStatus,
    pub pid: Option<u32>,
    pub started_at: Option<SystemTime>,
    pub last_exit: Option<Exit>,
    pub last_error: Option<String>,
}

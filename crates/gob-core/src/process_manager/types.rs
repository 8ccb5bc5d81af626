use std::path::PathBuf;

/// A shell command line to run as its own process group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub cmd: String,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

/// What happened to a group-wide signal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No process was left in the group (`ESRCH`).
    AlreadyExited,
}

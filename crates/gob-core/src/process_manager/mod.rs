mod base;
mod implementations;
mod types;

pub use base::ProcessManager;
#[cfg(test)]
pub(crate) use implementations::MockProcessManager;
#[cfg(unix)]
pub use implementations::{UnixChild, UnixProcessManager};
pub use types::{CommandSpec, Delivery};

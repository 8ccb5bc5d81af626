#[cfg(test)]
mod mock;
#[cfg(unix)]
mod unix;

#[cfg(test)]
pub(crate) use mock::MockProcessManager;
#[cfg(unix)]
pub use unix::{UnixChild, UnixProcessManager};

mod controller;
mod error;
mod health;
mod process_manager;
mod service_manager;
mod types;

pub use controller::{Controller, Session};
pub use error::{Result, ServiceError};
pub use health::{HealthEntry, HealthMonitor, HealthReport, HealthStatus};
#[cfg(unix)]
pub use process_manager::{UnixChild, UnixProcessManager};
pub use process_manager::{CommandSpec, Delivery, ProcessManager};
pub use service_manager::ServiceManager;
pub use types::{Exit, ServiceSnapshot, ServiceStatus, StartOutcome, StopOutcome};

use std::sync::Arc;

pub type Result<R, E = ServiceError> = std::result::Result<R, E>;

/// Failures of a single service operation.
///
/// Cloneable so the same error can be returned to the caller and kept on the
/// service record.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("service `{0}` is not configured")]
    UnknownService(String),

    #[error("service `{0}` has no start command")]
    MissingStartCommand(String),

    #[error("failed to spawn service `{service}`: {source}")]
    SpawnFailure {
        service: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("stop command of service `{service}` failed: {source}")]
    StopCommand {
        service: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to signal process group of service `{service}`: {source}")]
    Signal {
        service: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to poll process of service `{service}`: {source}")]
    Poll {
        service: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("process of service `{0}` was signalled but not reaped")]
    NotReaped(String),
}

impl ServiceError {
    pub(crate) fn spawn(service: &str, source: std::io::Error) -> Self {
        Self::SpawnFailure {
            service: service.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn stop_command(service: &str, source: std::io::Error) -> Self {
        Self::StopCommand {
            service: service.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn signal(service: &str, source: std::io::Error) -> Self {
        Self::Signal {
            service: service.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn poll(service: &str, source: std::io::Error) -> Self {
        Self::Poll {
            service: service.to_owned(),
            source: Arc::new(source),
        }
    }
}

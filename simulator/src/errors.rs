use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(#[from] reqwest::Error),

    #[error("Service rejected request ({status}): {body}")]
    ServiceRejected { status: StatusCode, body: String },

    #[error("Service degraded ({0})")]
    ServiceDegraded(StatusCode),

    #[error("Persistence failure at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt backlog at {}: {source}", .path.display())]
    CorruptBacklog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure is expected to clear up by the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::NetworkUnavailable(_) => true,
            Error::ServiceDegraded(_) => true,

            Error::ServiceRejected { .. } => false,
            Error::Persistence { .. } => false,
            Error::CorruptBacklog { .. } => false,
            Error::Serialization(_) => false,
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

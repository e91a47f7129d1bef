use std::time::Duration;

use thiserror::Error;

/// Failure to complete a process or HTTP call at all.
///
/// A process that exits non-zero or an HTTP response with a non-2xx status is
/// not an error at this level; the calling step classifies those.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for `{command}`")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout after {after:?} waiting for {operation}")]
    Timeout { operation: String, after: Duration },

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("HTTP {method} request to '{url}' failed")]
    Http {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("'{url}' is unreachable")]
    Unreachable {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("response from '{url}' is not valid JSON")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether the target did not accept a connection, e.g. a container
    /// that is still starting.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

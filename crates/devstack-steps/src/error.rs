use std::path::PathBuf;

use devstack_gateway::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config at '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config is not valid TOML")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// A required tool is unusable; detected before any step runs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PrerequisiteError {
    #[error("required tool `{tool}` is not installed or not on PATH")]
    Missing {
        tool: String,
        #[source]
        source: GatewayError,
    },

    #[error("`{tool} --version` failed with {detail}")]
    ProbeFailed { tool: String, detail: String },

    #[error("could not probe `{tool}`")]
    Probe {
        tool: String,
        #[source]
        source: GatewayError,
    },
}

impl PrerequisiteError {
    #[must_use]
    pub fn tool(&self) -> &str {
        match self {
            Self::Missing { tool, .. }
            | Self::ProbeFailed { tool, .. }
            | Self::Probe { tool, .. } => tool,
        }
    }
}

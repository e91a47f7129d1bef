use std::time::Duration;

use devstack_gateway::{GatewayError, ProcessRequest, ToolGateway};
use tracing::info;

use crate::config::DevstackConfig;
use crate::error::PrerequisiteError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// A tool that answered its version probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    pub tool: String,
    /// First line of the tool's `--version` output.
    pub version: String,
}

/// Tools a run needs for `config`, in probe order.
#[must_use]
pub fn required_tools(config: &DevstackConfig) -> Vec<&'static str> {
    let mut tools = vec![config.runtime().engine.program()];
    if !config.repositories().is_empty() {
        tools.push("git");
    }
    tools
}

/// Probe every required tool before any step runs.
///
/// Nothing is mutated here, so a failure needs no rollback.
///
/// # Errors
///
/// Returns a [`PrerequisiteError`] for the first tool that is missing or
/// whose `--version` probe fails.
pub fn check_prerequisites(
    gateway: &dyn ToolGateway,
    config: &DevstackConfig,
) -> Result<Vec<ToolVersion>, PrerequisiteError> {
    required_tools(config)
        .into_iter()
        .map(|tool| probe(gateway, tool))
        .collect()
}

fn probe(gateway: &dyn ToolGateway, tool: &str) -> Result<ToolVersion, PrerequisiteError> {
    let request = ProcessRequest::new(tool)
        .arg("--version")
        .timeout(PROBE_TIMEOUT);
    let output = gateway.run_process(&request).map_err(|source| match source {
        GatewayError::Spawn { .. } => PrerequisiteError::Missing {
            tool: tool.to_string(),
            source,
        },
        source => PrerequisiteError::Probe {
            tool: tool.to_string(),
            source,
        },
    })?;

    if !output.succeeded() {
        return Err(PrerequisiteError::ProbeFailed {
            tool: tool.to_string(),
            detail: output.failure_summary(),
        });
    }

    let version = output.stdout.lines().next().unwrap_or_default().trim().to_string();
    info!(tool, version = %version, "prerequisite found");
    Ok(ToolVersion {
        tool: tool.to_string(),
        version,
    })
}

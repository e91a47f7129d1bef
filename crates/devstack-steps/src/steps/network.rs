use std::time::Duration;

use devstack_gateway::{ProcessRequest, ToolGateway};
use devstack_saga::{Step, StepFailure};
use tracing::info;

use super::run_tolerating;
use crate::config::ContainerEngine;

/// Creates the bridge network every container joins.
pub struct CreateNetworkStep {
    name: String,
    engine: ContainerEngine,
    network: String,
    timeout: Duration,
}

impl CreateNetworkStep {
    #[must_use]
    pub fn new(engine: ContainerEngine, network: &str, timeout: Duration) -> Self {
        Self {
            name: format!("create network {network}"),
            engine,
            network: network.to_string(),
            timeout,
        }
    }

    fn request(&self, args: &[&str]) -> ProcessRequest {
        ProcessRequest::new(self.engine.program())
            .args(args.iter().copied())
            .timeout(self.timeout)
    }
}

impl Step<dyn ToolGateway> for CreateNetworkStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let request = self.request(&["network", "create", &self.network]);
        let output = run_tolerating(gateway, &request, &["already exists"])?;

        if output.succeeded() {
            Ok(format!("created network {}", self.network))
        } else {
            info!(network = %self.network, "network already exists, reusing it");
            Ok(format!("network {} already exists", self.network))
        }
    }

    fn has_compensation(&self) -> bool {
        true
    }

    fn compensate(&self, gateway: &dyn ToolGateway) -> Result<(), StepFailure> {
        let request = self.request(&["network", "rm", &self.network]);
        run_tolerating(gateway, &request, &["not found", "no such network"])?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        format!("remove network {}", self.network)
    }
}

use std::time::Duration;

use devstack_gateway::{ProcessRequest, ToolGateway};
use devstack_saga::{Step, StepFailure};
use tracing::debug;

use super::{command_failed, run, run_tolerating};
use crate::config::{ContainerConfig, ContainerEngine};

const NO_SUCH_CONTAINER: &[&str] = &["no such container"];

/// Starts a detached container on the stack network, replacing any stale
/// container with the same name.
pub struct StartContainerStep {
    name: String,
    engine: ContainerEngine,
    network: String,
    container: ContainerConfig,
    timeout: Duration,
}

impl StartContainerStep {
    #[must_use]
    pub fn new(
        engine: ContainerEngine,
        network: &str,
        container: &ContainerConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            name: format!("start container {}", container.name),
            engine,
            network: network.to_string(),
            container: container.clone(),
            timeout,
        }
    }

    fn request(&self) -> ProcessRequest {
        ProcessRequest::new(self.engine.program()).timeout(self.timeout)
    }

    fn run_request(&self) -> ProcessRequest {
        let mut request = self.request().args([
            "run",
            "-d",
            "--name",
            self.container.name.as_str(),
            "--network",
            self.network.as_str(),
        ]);
        for port in &self.container.ports {
            request = request.arg("-p").arg(port);
        }
        for volume in &self.container.volumes {
            request = request.arg("-v").arg(volume);
        }
        for (key, value) in &self.container.env {
            request = request.arg("-e").arg(format!("{key}={value}"));
        }
        request.arg(&self.container.image)
    }
}

impl Step<dyn ToolGateway> for StartContainerStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.container.critical
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let stale = self.request().args(["rm", "-f", self.container.name.as_str()]);
        let removed = run(gateway, &stale)?;
        if removed.succeeded() {
            debug!(container = %self.container.name, "removed stale container");
        }

        let request = self.run_request();
        let output = run(gateway, &request)?;
        if !output.succeeded() {
            return Err(command_failed(&request, &output));
        }

        let id: String = output.stdout.trim().chars().take(12).collect();
        if id.is_empty() {
            Ok(format!("started {}", self.container.name))
        } else {
            Ok(format!("started {} ({id})", self.container.name))
        }
    }

    fn has_compensation(&self) -> bool {
        true
    }

    fn compensate(&self, gateway: &dyn ToolGateway) -> Result<(), StepFailure> {
        let stop = self.request().args(["stop", self.container.name.as_str()]);
        run_tolerating(gateway, &stop, NO_SUCH_CONTAINER)?;

        let remove = self.request().args(["rm", "-f", self.container.name.as_str()]);
        run_tolerating(gateway, &remove, NO_SUCH_CONTAINER)?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        format!("stop and remove container {}", self.container.name)
    }
}

//! Provisioning steps, each built from configuration values and executed
//! against a [`ToolGateway`].

mod container;
mod network;
mod readiness;
mod release;
mod repository;
mod solr;

pub use container::StartContainerStep;
pub use network::CreateNetworkStep;
pub use readiness::WaitForHttpStep;
pub use release::ResolveReleaseStep;
pub use repository::CloneRepositoryStep;
pub use solr::{ConfigureSolrSchemaStep, CreateSolrCoreStep, EnableSolrAuthStep};

use devstack_gateway::{HttpRequest, HttpResponse, ProcessOutput, ProcessRequest, ToolGateway};
use devstack_saga::StepFailure;

/// Run a process, turning gateway faults into a step failure. The exit code
/// is left for the caller to classify.
fn run(gateway: &dyn ToolGateway, request: &ProcessRequest) -> Result<ProcessOutput, StepFailure> {
    gateway
        .run_process(request)
        .map_err(StepFailure::from_error)
}

/// Run a process that must exit 0, or whose output mentions one of
/// `tolerated`.
fn run_tolerating(
    gateway: &dyn ToolGateway,
    request: &ProcessRequest,
    tolerated: &[&str],
) -> Result<ProcessOutput, StepFailure> {
    let output = run(gateway, request)?;
    if output.succeeded() || tolerated.iter().any(|needle| output.mentions(needle)) {
        Ok(output)
    } else {
        Err(command_failed(request, &output))
    }
}

fn command_failed(request: &ProcessRequest, output: &ProcessOutput) -> StepFailure {
    StepFailure::new(format!(
        "`{}` failed with {}",
        request.command_line(),
        output.failure_summary()
    ))
}

fn send(gateway: &dyn ToolGateway, request: &HttpRequest) -> Result<HttpResponse, StepFailure> {
    gateway
        .http_request(request)
        .map_err(StepFailure::from_error)
}

fn http_failed(request: &HttpRequest, response: &HttpResponse) -> StepFailure {
    StepFailure::new(format!(
        "{} answered HTTP {}: {}",
        request.describe(),
        response.status,
        response.body_excerpt(200)
    ))
}

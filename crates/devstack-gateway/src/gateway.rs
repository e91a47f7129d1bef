use crate::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::process::{ProcessOutput, ProcessRequest};

/// Blocking access to external tools.
///
/// Both calls block the calling thread until completion or until the
/// request's timeout elapses; an elapsed timeout is always reported as
/// [`GatewayError::Timeout`](crate::GatewayError::Timeout).
pub trait ToolGateway: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the process cannot be started, cannot be waited
    /// on, or outlives its timeout. A non-zero exit code is returned as
    /// output, not as an error.
    fn run_process(&self, request: &ProcessRequest) -> Result<ProcessOutput>;

    /// # Errors
    ///
    /// Returns an error if the request cannot be sent, times out, or its
    /// body cannot be read. Non-2xx statuses are returned as responses.
    fn http_request(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<G: ToolGateway + ?Sized> ToolGateway for &G {
    fn run_process(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        (**self).run_process(request)
    }

    fn http_request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).http_request(request)
    }
}

impl<G: ToolGateway + ?Sized> ToolGateway for std::sync::Arc<G> {
    fn run_process(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        (**self).run_process(request)
    }

    fn http_request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).http_request(request)
    }
}

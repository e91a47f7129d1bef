//! Boundary between provisioning steps and the outside world.
//!
//! Steps never spawn processes or open sockets themselves; they go through a
//! [`ToolGateway`]. [`SystemGateway`] talks to the real container runtime,
//! `git` and HTTP endpoints, while `FakeGateway` (behind the `testing`
//! feature) replays scripted responses and records every call.

mod error;
#[cfg(any(test, feature = "testing"))]
mod fake;
mod gateway;
mod http;
mod process;
mod system;

pub use error::{GatewayError, Result};
#[cfg(any(test, feature = "testing"))]
pub use fake::{FakeGateway, GatewayCall, Reply};
pub use gateway::ToolGateway;
pub use http::{Credentials, DEFAULT_HTTP_TIMEOUT, HttpMethod, HttpRequest, HttpResponse};
pub use process::{DEFAULT_PROCESS_TIMEOUT, ProcessOutput, ProcessRequest};
pub use system::SystemGateway;

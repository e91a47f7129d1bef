use std::thread;
use std::time::{Duration, Instant};

use devstack_gateway::{Credentials, HttpRequest, ToolGateway};
use devstack_saga::{Step, StepFailure};
use tracing::debug;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Polls a URL until the service behind it answers.
///
/// Any status below 500 counts as ready: a 401 from a secured Solr still
/// proves the server is up.
pub struct WaitForHttpStep {
    name: String,
    url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitForHttpStep {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            credentials: None,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Step<dyn ToolGateway> for WaitForHttpStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let remaining = self.timeout.saturating_sub(started.elapsed());
            let request = HttpRequest::get(&self.url)
                .credentials(self.credentials.clone())
                .timeout(remaining.min(PROBE_TIMEOUT).max(Duration::from_millis(1)));

            let last = match gateway.http_request(&request) {
                Ok(response) if response.status < 500 => {
                    return Ok(format!(
                        "{} answered HTTP {} after {attempts} attempt(s)",
                        self.url, response.status
                    ));
                }
                Ok(response) => format!("HTTP {}", response.status),
                Err(e) => StepFailure::from_error(e).into_message(),
            };
            debug!(url = %self.url, attempts, last = %last, "service not ready yet");

            if started.elapsed() + self.poll_interval > self.timeout {
                return Err(StepFailure::new(format!(
                    "timeout after {:?} waiting for {} to answer (last error: {last})",
                    self.timeout, self.url
                )));
            }
            thread::sleep(self.poll_interval);
        }
    }
}

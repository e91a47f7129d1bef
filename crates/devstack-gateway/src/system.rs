use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::gateway::ToolGateway;
use crate::http::{HttpRequest, HttpResponse};
use crate::process::{ProcessOutput, ProcessRequest};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Gateway backed by real child processes and a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct SystemGateway {
    client: Client,
}

impl SystemGateway {
    /// # Errors
    ///
    /// Returns [`GatewayError::Client`] if the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("devstack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GatewayError::Client)?;
        Ok(Self { client })
    }
}

impl ToolGateway for SystemGateway {
    fn run_process(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        let command_line = request.command_line();
        debug!(command = %command_line, timeout = ?request.timeout, "running process");

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| GatewayError::Spawn {
            program: request.program.clone(),
            source,
        })?;

        let deadline = Instant::now() + request.timeout;
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = wait_with_deadline(&mut child, deadline, request.timeout, &command_line)?;

        // A background grandchild can keep the pipes open after the child exits.
        let output = ProcessOutput {
            exit_code: status.code(),
            stdout: collect_reader(stdout, deadline, request.timeout, &command_line)?,
            stderr: collect_reader(stderr, deadline, request.timeout, &command_line)?,
        };
        debug!(command = %command_line, exit_code = ?output.exit_code, "process finished");
        Ok(output)
    }

    fn http_request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(request = %request.describe(), timeout = ?request.timeout, "sending HTTP request");

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .timeout(request.timeout);
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }

        let map_err = |source: reqwest::Error| {
            if source.is_timeout() {
                GatewayError::Timeout {
                    operation: request.describe(),
                    after: request.timeout,
                }
            } else if source.is_connect() {
                GatewayError::Unreachable {
                    url: request.url.clone(),
                    source: Box::new(source),
                }
            } else {
                GatewayError::Http {
                    method: request.method.to_string(),
                    url: request.url.clone(),
                    source,
                }
            }
        };

        let response = builder.send().map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(map_err)?;
        debug!(request = %request.describe(), status, "HTTP response received");
        Ok(HttpResponse { status, body })
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<Receiver<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            // A read error leaves whatever was captured so far.
            let _ = pipe.read_to_end(&mut buf);
            let _ = sender.send(String::from_utf8_lossy(&buf).into_owned());
        });
        receiver
    })
}

/// Wait for a pipe reader to hit end-of-file, but no later than `deadline`.
/// A reader still blocked at the deadline is left detached.
fn collect_reader(
    reader: Option<Receiver<String>>,
    deadline: Instant,
    timeout: Duration,
    command_line: &str,
) -> Result<String> {
    let Some(reader) = reader else {
        return Ok(String::new());
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Ok(text),
        Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
        Err(RecvTimeoutError::Timeout) => {
            debug!(command = %command_line, "output still open at deadline");
            Err(GatewayError::Timeout {
                operation: format!("output of `{command_line}`"),
                after: timeout,
            })
        }
    }
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
    command_line: &str,
) -> Result<std::process::ExitStatus> {
    loop {
        let polled = child.try_wait().map_err(|source| GatewayError::Wait {
            command: command_line.to_string(),
            source,
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            debug!(command = %command_line, "process timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(GatewayError::Timeout {
                operation: format!("`{command_line}`"),
                after: timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

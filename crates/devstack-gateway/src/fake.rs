use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use crate::error::{GatewayError, Result};
use crate::gateway::ToolGateway;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::process::{ProcessOutput, ProcessRequest};

/// A scripted answer to one gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Respond(T),
    /// Fail with [`GatewayError::Timeout`] using the request's timeout.
    Timeout,
    /// Fail as if the program were missing or the host refused the
    /// connection.
    Unavailable,
}

/// A call observed by [`FakeGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Process {
        program: String,
        args: Vec<String>,
    },
    Http {
        method: HttpMethod,
        url: String,
        body: Option<serde_json::Value>,
    },
}

struct ProcessRule {
    prefix: Vec<String>,
    replies: VecDeque<Reply<ProcessOutput>>,
}

impl ProcessRule {
    fn matches(&self, request: &ProcessRequest) -> bool {
        let argv = std::iter::once(&request.program).chain(request.args.iter());
        self.prefix.len() <= request.args.len() + 1
            && self.prefix.iter().zip(argv).all(|(want, got)| want == got)
    }
}

struct HttpRule {
    method: HttpMethod,
    url_fragment: String,
    replies: VecDeque<Reply<HttpResponse>>,
}

impl HttpRule {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.method == request.method && request.url.contains(&self.url_fragment)
    }
}

/// Pops the next reply, repeating the last one once the queue is down to it.
fn next_reply<T: Clone>(replies: &mut VecDeque<Reply<T>>) -> Option<Reply<T>> {
    if replies.len() > 1 {
        replies.pop_front()
    } else {
        replies.front().cloned()
    }
}

/// In-memory [`ToolGateway`] with scripted replies.
///
/// Rules are matched in registration order and the first match wins.
/// Process rules match on an argv prefix, HTTP rules on method plus a URL
/// substring. Unmatched processes exit 0 with empty output and unmatched
/// HTTP calls answer `200 {}`.
#[derive(Default)]
pub struct FakeGateway {
    process_rules: Mutex<Vec<ProcessRule>>,
    http_rules: Mutex<Vec<HttpRule>>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_process(self, prefix: &[&str], reply: Reply<ProcessOutput>) -> Self {
        self.on_process_sequence(prefix, vec![reply])
    }

    /// Replies are handed out in order; the last one repeats.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn on_process_sequence(
        self,
        prefix: &[&str],
        replies: Vec<Reply<ProcessOutput>>,
    ) -> Self {
        self.process_rules
            .lock()
            .expect("lock poisoned")
            .push(ProcessRule {
                prefix: prefix.iter().map(ToString::to_string).collect(),
                replies: replies.into(),
            });
        self
    }

    #[must_use]
    pub fn on_http(
        self,
        method: HttpMethod,
        url_fragment: &str,
        reply: Reply<HttpResponse>,
    ) -> Self {
        self.on_http_sequence(method, url_fragment, vec![reply])
    }

    /// Replies are handed out in order; the last one repeats.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn on_http_sequence(
        self,
        method: HttpMethod,
        url_fragment: &str,
        replies: Vec<Reply<HttpResponse>>,
    ) -> Self {
        self.http_rules
            .lock()
            .expect("lock poisoned")
            .push(HttpRule {
                method,
                url_fragment: url_fragment.to_string(),
                replies: replies.into(),
            });
        self
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Every process call as a space-joined command line, in call order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Process { program, args } => Some(
                    std::iter::once(program)
                        .chain(args)
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
                GatewayCall::Http { .. } => None,
            })
            .collect()
    }

    /// Every HTTP call as `METHOD url`, in call order.
    #[must_use]
    pub fn http_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Http { method, url, .. } => Some(format!("{method} {url}")),
                GatewayCall::Process { .. } => None,
            })
            .collect()
    }

    /// Number of process or HTTP calls whose rendered form contains `needle`.
    #[must_use]
    pub fn count_matching(&self, needle: &str) -> usize {
        self.commands()
            .iter()
            .chain(self.http_calls().iter())
            .filter(|call| call.contains(needle))
            .count()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().expect("lock poisoned").push(call);
    }
}

impl ToolGateway for FakeGateway {
    fn run_process(&self, request: &ProcessRequest) -> Result<ProcessOutput> {
        self.record(GatewayCall::Process {
            program: request.program.clone(),
            args: request.args.clone(),
        });

        let reply = {
            let mut rules = self.process_rules.lock().expect("lock poisoned");
            rules
                .iter_mut()
                .find(|rule| rule.matches(request))
                .and_then(|rule| next_reply(&mut rule.replies))
        };

        match reply {
            None => Ok(ProcessOutput::success("")),
            Some(Reply::Respond(output)) => Ok(output),
            Some(Reply::Timeout) => Err(GatewayError::Timeout {
                operation: format!("`{}`", request.command_line()),
                after: request.timeout,
            }),
            Some(Reply::Unavailable) => Err(GatewayError::Spawn {
                program: request.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "program not found"),
            }),
        }
    }

    fn http_request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.record(GatewayCall::Http {
            method: request.method,
            url: request.url.clone(),
            body: request.json_body.clone(),
        });

        let reply = {
            let mut rules = self.http_rules.lock().expect("lock poisoned");
            rules
                .iter_mut()
                .find(|rule| rule.matches(request))
                .and_then(|rule| next_reply(&mut rule.replies))
        };

        match reply {
            None => Ok(HttpResponse::new(200, "{}")),
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Timeout) => Err(GatewayError::Timeout {
                operation: request.describe(),
                after: request.timeout,
            }),
            Some(Reply::Unavailable) => Err(GatewayError::Unreachable {
                url: request.url.clone(),
                source: Box::new(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )),
            }),
        }
    }
}

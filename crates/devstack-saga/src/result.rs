use std::any::Any;
use std::fmt::Write as _;
use std::time::Duration;

/// Why a step (or a compensation) did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StepFailure {
    message: String,
}

impl StepFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build a failure from an error, flattening its `source()` chain into
    /// the message.
    #[must_use]
    pub fn from_error<E: std::error::Error>(error: E) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            let _ = write!(message, ": {cause}");
            source = cause.source();
        }
        Self { message }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn into_message(self) -> String {
        self.message
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let detail = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::new(format!("panicked: {detail}"))
    }
}

/// Outcome of a single step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded { detail: String },
    Failed { message: String },
}

/// Result of one executed step, as recorded in the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    name: String,
    outcome: StepOutcome,
    duration: Duration,
}

impl StepResult {
    pub(crate) fn new(name: impl Into<String>, outcome: StepOutcome, duration: Duration) -> Self {
        Self {
            name: name.into(),
            outcome,
            duration,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn outcome(&self) -> &StepOutcome {
        &self.outcome
    }

    #[must_use]
    pub fn success(&self) -> bool {
        matches!(self.outcome, StepOutcome::Succeeded { .. })
    }

    /// The success detail or the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        match &self.outcome {
            StepOutcome::Succeeded { detail } => detail,
            StepOutcome::Failed { message } => message,
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

use std::fmt;
use std::time::Duration;

use crate::result::StepResult;
use crate::rollback::{RollbackRecord, RollbackStatus};

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    /// A critical step failed.
    CriticalFailure,
    /// A non-critical step failed and the failure policy chose to abort.
    PolicyAbort,
}

/// The step that stopped a run and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortReason {
    pub step: String,
    pub kind: AbortKind,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AbortKind::CriticalFailure => write!(f, "critical step failed: {}", self.step),
            AbortKind::PolicyAbort => write!(f, "step failed: {}", self.step),
        }
    }
}

/// Ordered record of a completed or aborted run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    steps: Vec<StepResult>,
    rollback: Vec<RollbackRecord>,
    warnings: Vec<String>,
    abort: Option<AbortReason>,
    total_duration: Duration,
}

impl RunReport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_step(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    pub(crate) fn record_rollback(&mut self, records: Vec<RollbackRecord>) {
        for record in &records {
            if let RollbackStatus::Failed { message } = &record.status {
                self.warnings.push(format!(
                    "rollback of '{}' failed ({}): {message}",
                    record.name, record.description
                ));
            }
        }
        self.rollback.extend(records);
    }

    pub(crate) fn set_abort(&mut self, reason: AbortReason) {
        self.abort = Some(reason);
    }

    pub(crate) fn finish(&mut self, total_duration: Duration) {
        self.total_duration = total_duration;
    }

    /// Results of every executed step, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Compensations attempted during rollback, in the order they ran.
    #[must_use]
    pub fn rollback(&self) -> &[RollbackRecord] {
        &self.rollback
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn aborted(&self) -> bool {
        self.abort.is_some()
    }

    #[must_use]
    pub fn abort(&self) -> Option<&AbortReason> {
        self.abort.as_ref()
    }

    #[must_use]
    pub fn abort_reason(&self) -> Option<String> {
        self.abort.as_ref().map(ToString::to_string)
    }

    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// `true` when the run was not aborted and every step succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.aborted() && self.steps.iter().all(StepResult::success)
    }

    /// Results of steps that failed, including absorbed non-critical ones.
    #[must_use]
    pub fn failed_steps(&self) -> Vec<&StepResult> {
        self.steps.iter().filter(|step| !step.success()).collect()
    }

    /// Find the result of a step by name.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|step| step.name() == name)
    }

    /// Get a summary of the run for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for step in &self.steps {
            let status = if step.success() { "✓" } else { "✗" };
            lines.push(format!("{status} {}", step.name()));
        }
        for record in &self.rollback {
            let status = if record.succeeded() { "↩" } else { "⚠" };
            lines.push(format!("{status} {}", record.name));
        }
        if let Some(reason) = &self.abort {
            lines.push(format!("aborted: {reason}"));
        }
        lines.join("\n")
    }
}

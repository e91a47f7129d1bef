use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::logger::{RunLogger, TracingLogger};
use crate::plan::Plan;
use crate::policy::FailurePolicy;
use crate::report::{AbortKind, AbortReason, RunReport};
use crate::result::{StepFailure, StepOutcome, StepResult};
use crate::rollback::{RollbackRegistry, RollbackStatus};
use crate::step::Step;

/// Runs plans one step at a time under a single failure policy.
///
/// Steps execute strictly sequentially on the calling thread. When a step
/// fails and the run aborts, compensations of the steps completed so far are
/// run in reverse order (LIFO) and no later step is invoked.
pub struct Orchestrator {
    policy: FailurePolicy,
    logger: Box<dyn RunLogger>,
}

impl Orchestrator {
    /// Create an orchestrator logging through `tracing`.
    #[must_use]
    pub fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            logger: Box::new(TracingLogger),
        }
    }

    #[must_use]
    pub fn with_logger<L: RunLogger + 'static>(mut self, logger: L) -> Self {
        self.logger = Box::new(logger);
        self
    }

    #[must_use]
    pub fn policy(&self) -> &FailurePolicy {
        &self.policy
    }

    /// Execute `plan` against `ctx` and report every outcome.
    ///
    /// Faults inside a step, including panics, are recorded as failed results
    /// and never escape this call.
    pub fn run<Ctx: ?Sized>(&self, plan: &Plan<Ctx>, ctx: &Ctx) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new();
        let mut registry = RollbackRegistry::new();

        self.logger
            .info(&format!("starting run of {} step(s)", plan.len()));

        for step in plan.steps() {
            let step: &dyn Step<Ctx> = step.as_ref();
            let result = self.execute_step(step, ctx);
            let succeeded = result.success();
            let message = result.message().to_string();
            report.record_step(result);

            if succeeded {
                if step.has_compensation() {
                    registry.register(
                        step.name(),
                        step.compensation_description(),
                        move |ctx: &Ctx| step.compensate(ctx),
                    );
                }
                continue;
            }

            if let Some(reason) = self.abort_reason(step, &message) {
                self.logger.error(&format!("{reason}; aborting run"));
                self.roll_back(&mut registry, ctx, &mut report);
                report.set_abort(reason);
                break;
            }

            self.logger.warn(&format!(
                "continuing past failed non-critical step '{}'",
                step.name()
            ));
        }

        report.finish(started.elapsed());
        self.logger.info(&format!(
            "run finished in {:.2?} ({} step(s) executed, aborted: {})",
            report.total_duration(),
            report.steps().len(),
            report.aborted()
        ));
        report
    }

    fn execute_step<Ctx: ?Sized>(&self, step: &dyn Step<Ctx>, ctx: &Ctx) -> StepResult {
        self.logger.info(&format!("running step '{}'", step.name()));

        let started = Instant::now();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| step.execute(ctx))) {
            Ok(Ok(detail)) => StepOutcome::Succeeded { detail },
            Ok(Err(failure)) => StepOutcome::Failed {
                message: failure.into_message(),
            },
            Err(payload) => StepOutcome::Failed {
                message: StepFailure::from_panic(payload.as_ref()).into_message(),
            },
        };
        let result = StepResult::new(step.name(), outcome, started.elapsed());

        if result.success() {
            self.logger.info(&format!(
                "step '{}' succeeded in {:.2?}",
                result.name(),
                result.duration()
            ));
        } else {
            self.logger.error(&format!(
                "step '{}' failed after {:.2?}: {}",
                result.name(),
                result.duration(),
                result.message()
            ));
        }

        result
    }

    /// `Some` when the failure of `step` must end the run.
    fn abort_reason<Ctx: ?Sized>(
        &self,
        step: &dyn Step<Ctx>,
        message: &str,
    ) -> Option<AbortReason> {
        if step.is_critical() {
            return Some(AbortReason {
                step: step.name().to_string(),
                kind: AbortKind::CriticalFailure,
            });
        }

        if self.policy.continue_after(step.name(), message) {
            None
        } else {
            Some(AbortReason {
                step: step.name().to_string(),
                kind: AbortKind::PolicyAbort,
            })
        }
    }

    fn roll_back<Ctx: ?Sized>(
        &self,
        registry: &mut RollbackRegistry<'_, Ctx>,
        ctx: &Ctx,
        report: &mut RunReport,
    ) {
        if registry.is_empty() {
            return;
        }

        self.logger
            .warn(&format!("rolling back {} completed step(s)", registry.len()));
        let records = registry.drain_reverse(ctx);
        for record in &records {
            match &record.status {
                RollbackStatus::Compensated => self
                    .logger
                    .info(&format!("rolled back '{}': {}", record.name, record.description)),
                RollbackStatus::Failed { message } => self.logger.warn(&format!(
                    "rollback of '{}' failed: {message}",
                    record.name
                )),
            }
        }
        report.record_rollback(records);
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(FailurePolicy::default())
    }
}

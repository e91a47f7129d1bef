//! Sequential step orchestration with best-effort rollback.
//!
//! A [`Plan`] is an ordered list of named [`Step`]s. The [`Orchestrator`] runs
//! them one at a time, registers each successful step's compensation in a
//! [`RollbackRegistry`], and on abort undoes completed steps in reverse order.
//! Non-critical failures are resolved by a [`FailurePolicy`]. Every run yields
//! a [`RunReport`].

mod error;
mod fn_step;
mod logger;
mod orchestrator;
mod plan;
mod policy;
mod report;
mod result;
mod rollback;
mod step;

pub use error::PlanError;
pub use fn_step::FnStep;
pub use logger::{LogLevel, LogLine, RecordingLogger, RunLogger, TracingLogger};
pub use orchestrator::Orchestrator;
pub use plan::{Empty, HasSteps, Plan, PlanBuilder};
pub use policy::{ContinuePrompt, FailurePolicy};
pub use report::{AbortKind, AbortReason, RunReport};
pub use result::{StepFailure, StepOutcome, StepResult};
pub use rollback::{RollbackRecord, RollbackRegistry, RollbackStatus};
pub use step::Step;

use thiserror::Error;

/// Error from assembling a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PlanError {
    /// The plan contains no steps.
    #[error("a plan needs at least one step")]
    Empty,

    /// Two steps share the same name.
    #[error("duplicate step name '{name}'")]
    DuplicateStepName {
        /// The repeated name.
        name: String,
    },
}

use crate::result::StepFailure;
use crate::step::Step;

type Action<Ctx> = Box<dyn Fn(&Ctx) -> Result<String, StepFailure>>;
type Compensation<Ctx> = Box<dyn Fn(&Ctx) -> Result<(), StepFailure>>;

/// A [`Step`] assembled from closures.
///
/// ```
/// use devstack_saga::{FnStep, StepFailure};
///
/// let step: FnStep<()> = FnStep::new("ping", |_ctx: &()| Ok("pong".to_string()))
///     .non_critical()
///     .with_compensation("forget ping", |_ctx: &()| Ok(()));
/// # let _ = step;
/// ```
pub struct FnStep<Ctx: ?Sized> {
    name: String,
    critical: bool,
    action: Action<Ctx>,
    compensation: Option<(String, Compensation<Ctx>)>,
}

impl<Ctx: ?Sized> FnStep<Ctx> {
    /// Create a critical step without compensation.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&Ctx) -> Result<String, StepFailure> + 'static,
    {
        Self {
            name: name.into(),
            critical: true,
            action: Box::new(action),
            compensation: None,
        }
    }

    /// Mark the step as non-critical; its failure is resolved by the run's
    /// failure policy.
    #[must_use]
    pub fn non_critical(mut self) -> Self {
        self.critical = false;
        self
    }

    /// Undo the step with `compensate` when a later step aborts the run.
    #[must_use]
    pub fn with_compensation<F>(mut self, description: impl Into<String>, compensate: F) -> Self
    where
        F: Fn(&Ctx) -> Result<(), StepFailure> + 'static,
    {
        self.compensation = Some((description.into(), Box::new(compensate)));
        self
    }
}

impl<Ctx: ?Sized> Step<Ctx> for FnStep<Ctx> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.critical
    }

    fn execute(&self, ctx: &Ctx) -> Result<String, StepFailure> {
        (self.action)(ctx)
    }

    fn has_compensation(&self) -> bool {
        self.compensation.is_some()
    }

    fn compensate(&self, ctx: &Ctx) -> Result<(), StepFailure> {
        match &self.compensation {
            Some((_, compensate)) => compensate(ctx),
            None => Ok(()),
        }
    }

    fn compensation_description(&self) -> String {
        match &self.compensation {
            Some((description, _)) => description.clone(),
            None => format!("undo {}", self.name),
        }
    }
}

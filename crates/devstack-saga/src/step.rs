use crate::result::StepFailure;

/// A named unit of provisioning work.
///
/// Steps run strictly in plan order. A step may register a compensation that
/// undoes its side effects; the orchestrator only calls it after `execute`
/// succeeded and a later step caused the run to abort.
///
/// # Type Parameters
///
/// - `Ctx`: Shared dependencies (injected, not passed between steps), usually
///   the external tool gateway
pub trait Step<Ctx: ?Sized> {
    /// Human-readable name, unique within a plan.
    fn name(&self) -> &str;

    /// Whether a failure of this step always aborts the run.
    ///
    /// Defaults to `true`.
    fn is_critical(&self) -> bool {
        true
    }

    /// Execute the step.
    ///
    /// Returns a short human-readable detail on success.
    ///
    /// # Errors
    ///
    /// Returns a [`StepFailure`] describing why the step did not complete.
    fn execute(&self, ctx: &Ctx) -> Result<String, StepFailure>;

    /// Whether [`Step::compensate`] should be registered after a successful run.
    ///
    /// The default is `false`, suitable for read-only steps.
    fn has_compensation(&self) -> bool {
        false
    }

    /// Undo the step's side effects.
    ///
    /// Must tolerate partial external state: the resources it removes may
    /// already be gone.
    ///
    /// # Errors
    ///
    /// Returns an error if compensation fails. The failure is reported as a
    /// warning and does not stop the remaining compensations.
    fn compensate(&self, ctx: &Ctx) -> Result<(), StepFailure> {
        let _ = ctx;
        Ok(())
    }

    /// Human-readable description of what compensation will do.
    fn compensation_description(&self) -> String {
        format!("undo {}", self.name())
    }
}

impl<Ctx: ?Sized, S: Step<Ctx> + ?Sized> Step<Ctx> for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_critical(&self) -> bool {
        (**self).is_critical()
    }

    fn execute(&self, ctx: &Ctx) -> Result<String, StepFailure> {
        (**self).execute(ctx)
    }

    fn has_compensation(&self) -> bool {
        (**self).has_compensation()
    }

    fn compensate(&self, ctx: &Ctx) -> Result<(), StepFailure> {
        (**self).compensate(ctx)
    }

    fn compensation_description(&self) -> String {
        (**self).compensation_description()
    }
}

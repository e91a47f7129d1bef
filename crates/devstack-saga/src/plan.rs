use std::collections::HashSet;
use std::marker::PhantomData;

use crate::error::PlanError;
use crate::step::Step;

/// Marker type for a builder with no steps.
pub struct Empty;

/// Marker type for a builder with at least one step.
pub struct HasSteps;

/// An ordered, non-empty list of uniquely named steps.
pub struct Plan<Ctx: ?Sized> {
    steps: Vec<Box<dyn Step<Ctx>>>,
}

impl<Ctx: ?Sized> Plan<Ctx> {
    /// Build a plan from a step list assembled at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Empty`] if `steps` is empty and
    /// [`PlanError::DuplicateStepName`] if two steps share a name.
    pub fn from_steps(steps: Vec<Box<dyn Step<Ctx>>>) -> Result<Self, PlanError> {
        if steps.is_empty() {
            return Err(PlanError::Empty);
        }

        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.name()) {
                return Err(PlanError::DuplicateStepName {
                    name: step.name().to_string(),
                });
            }
        }

        Ok(Self { steps })
    }

    #[must_use]
    pub fn steps(&self) -> &[Box<dyn Step<Ctx>>] {
        &self.steps
    }

    #[must_use]
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Type-state builder for plans.
///
/// A plan cannot be built before its first step is added:
///
/// ```compile_fail
/// use devstack_saga::PlanBuilder;
///
/// let plan = PlanBuilder::<()>::new().build();
/// ```
pub struct PlanBuilder<Ctx: ?Sized, State = Empty> {
    steps: Vec<Box<dyn Step<Ctx>>>,
    _state: PhantomData<State>,
}

impl<Ctx: ?Sized> PlanBuilder<Ctx, Empty> {
    /// Create a new plan builder in the empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Add the first step to the plan.
    #[must_use]
    pub fn first_step<S>(self, step: S) -> PlanBuilder<Ctx, HasSteps>
    where
        S: Step<Ctx> + 'static,
    {
        let mut steps = self.steps;
        steps.push(Box::new(step));
        PlanBuilder {
            steps,
            _state: PhantomData,
        }
    }
}

impl<Ctx: ?Sized> Default for PlanBuilder<Ctx, Empty> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx: ?Sized> PlanBuilder<Ctx, HasSteps> {
    /// Append another step; it runs after every step added before it.
    #[must_use]
    pub fn then<S>(mut self, step: S) -> Self
    where
        S: Step<Ctx> + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    /// Build the plan from the accumulated steps.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateStepName`] if two steps share a name.
    pub fn build(self) -> Result<Plan<Ctx>, PlanError> {
        Plan::from_steps(self.steps)
    }
}

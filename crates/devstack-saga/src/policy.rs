/// Asks an operator whether to continue past a failed non-critical step.
pub trait ContinuePrompt {
    /// Return `true` to continue with the next step, `false` to abort.
    fn should_continue(&self, step: &str, message: &str) -> bool;
}

impl<F> ContinuePrompt for F
where
    F: Fn(&str, &str) -> bool,
{
    fn should_continue(&self, step: &str, message: &str) -> bool {
        self(step, message)
    }
}

/// What to do when a non-critical step fails.
///
/// Critical failures always abort, whatever the policy.
#[derive(Default)]
pub enum FailurePolicy {
    /// Abort the run and roll back.
    #[default]
    AutoAbort,
    /// Record the failure and keep going.
    AutoContinue,
    /// Ask the operator; continuing behaves like `AutoContinue`, declining
    /// like `AutoAbort`.
    Prompt(Box<dyn ContinuePrompt>),
}

impl FailurePolicy {
    /// Convenience constructor for [`FailurePolicy::Prompt`].
    #[must_use]
    pub fn prompt<P: ContinuePrompt + 'static>(prompt: P) -> Self {
        Self::Prompt(Box::new(prompt))
    }

    /// Decide whether the run continues after `step` failed with `message`.
    pub(crate) fn continue_after(&self, step: &str, message: &str) -> bool {
        match self {
            Self::AutoAbort => false,
            Self::AutoContinue => true,
            Self::Prompt(prompt) => prompt.should_continue(step, message),
        }
    }
}

impl std::fmt::Debug for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoAbort => f.write_str("AutoAbort"),
            Self::AutoContinue => f.write_str("AutoContinue"),
            Self::Prompt(_) => f.write_str("Prompt(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn auto_policies_ignore_failure_content() {
        assert!(!FailurePolicy::AutoAbort.continue_after("schema", "HTTP 500"));
        assert!(FailurePolicy::AutoContinue.continue_after("schema", "HTTP 500"));
    }

    #[test]
    fn prompt_policy_forwards_step_and_message() {
        let asked = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&asked);
        let policy = FailurePolicy::prompt(move |step: &str, message: &str| {
            recorded
                .borrow_mut()
                .push(format!("{step}: {message}"));
            step == "schema"
        });

        assert!(policy.continue_after("schema", "HTTP 500"));
        assert!(!policy.continue_after("auth", "HTTP 500"));
        assert_eq!(
            *asked.borrow(),
            vec!["schema: HTTP 500".to_string(), "auth: HTTP 500".to_string()]
        );
    }

    #[test]
    fn default_policy_aborts() {
        assert!(matches!(FailurePolicy::default(), FailurePolicy::AutoAbort));
    }
}

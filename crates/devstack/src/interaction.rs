use devstack_saga::{ContinuePrompt, FailurePolicy};
use dialoguer::Confirm;
use tracing::warn;

use crate::environment::{NonInteractiveReason, non_interactive_reason};

/// Asks on the terminal whether to continue past a non-critical failure.
///
/// Declining, pressing escape, or a broken terminal all mean abort.
pub struct TerminalPrompt;

impl ContinuePrompt for TerminalPrompt {
    fn should_continue(&self, step: &str, message: &str) -> bool {
        warn!(step, "non-critical step failed: {message}");

        match Confirm::new()
            .with_prompt(format!("'{step}' failed. Continue with the remaining steps?"))
            .default(false)
            .interact_opt()
        {
            Ok(answer) => answer.unwrap_or(false),
            Err(err) => {
                warn!(error = %err, "could not read answer, aborting");
                false
            }
        }
    }
}

/// Policy for `--on-failure prompt`, given the current interactivity.
pub(crate) fn prompt_policy() -> FailurePolicy {
    policy_for(non_interactive_reason())
}

fn policy_for(reason: Option<NonInteractiveReason>) -> FailurePolicy {
    match reason {
        None => FailurePolicy::prompt(TerminalPrompt),
        Some(reason) => {
            warn!("cannot prompt ({reason}); non-critical failures will abort");
            FailurePolicy::AutoAbort
        }
    }
}

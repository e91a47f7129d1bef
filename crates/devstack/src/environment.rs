use std::fmt;
use std::io::IsTerminal;

/// Set to any value to refuse interactive prompts.
pub const NO_TTY_VAR: &str = "DEVSTACK_NO_TTY";
/// Set to any value to allow prompts even when a CI variable is present.
pub const FORCE_TTY_VAR: &str = "DEVSTACK_FORCE_TTY";

const CI_ENV_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TF_BUILD",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonInteractiveReason {
    ExplicitDisable,
    CiDetected { env_var: String },
    NoTerminal,
}

impl fmt::Display for NonInteractiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitDisable => write!(f, "{NO_TTY_VAR} is set"),
            Self::CiDetected { env_var } => write!(f, "running under CI ({env_var} is set)"),
            Self::NoTerminal => f.write_str("stdin is not a terminal"),
        }
    }
}

/// Why prompting the operator is impossible in this process, if it is.
pub fn non_interactive_reason() -> Option<NonInteractiveReason> {
    classify(
        |var| std::env::var_os(var).is_some(),
        std::io::stdin().is_terminal(),
    )
}

fn classify(
    is_set: impl Fn(&str) -> bool,
    stdin_is_terminal: bool,
) -> Option<NonInteractiveReason> {
    if is_set(NO_TTY_VAR) {
        return Some(NonInteractiveReason::ExplicitDisable);
    }
    if is_set(FORCE_TTY_VAR) {
        return None;
    }
    if let Some(env_var) = CI_ENV_VARS.iter().copied().find(|&var| is_set(var)) {
        return Some(NonInteractiveReason::CiDetected {
            env_var: env_var.to_string(),
        });
    }
    if !stdin_is_terminal {
        return Some(NonInteractiveReason::NoTerminal);
    }
    None
}

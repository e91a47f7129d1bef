use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error")]
    Config(#[from] devstack_steps::ConfigError),

    #[error("prerequisite check failed")]
    Prerequisite(#[from] devstack_steps::PrerequisiteError),

    #[error("could not build the provisioning plan")]
    Plan(#[from] devstack_saga::PlanError),

    #[error("could not set up the tool gateway")]
    Gateway(#[from] devstack_gateway::GatewayError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("provisioning aborted: {reason}")]
    RunAborted { reason: String },
}

pub type Result<T> = std::result::Result<T, CliError>;

mod check;
mod plan;
mod run;

use std::path::Path;

use clap::Subcommand;
use devstack_steps::{DEFAULT_CONFIG_FILE, DevstackConfig};
use tracing::info;

use crate::error::Result;

pub(crate) use run::RunArgs;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Print the ordered provisioning steps without running them
    Plan,
    /// Check that the required tools are installed
    Check,
    /// Provision the stack, rolling back on abort
    Run(RunArgs),
}

impl Commands {
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        match self {
            Self::Plan => plan::run(&config),
            Self::Check => check::run(&config),
            Self::Run(args) => run::run(&config, &args),
        }
    }
}

/// An explicit path must exist; otherwise `devstack.toml` in the working
/// directory is used when present, else the built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<DevstackConfig> {
    if let Some(path) = explicit {
        return Ok(DevstackConfig::load(path)?);
    }

    let candidate = std::env::current_dir()?.join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        info!(path = %candidate.display(), "loading config");
        return Ok(DevstackConfig::load(&candidate)?);
    }

    info!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
    Ok(DevstackConfig::default())
}

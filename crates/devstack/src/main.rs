mod commands;
mod environment;
mod error;
mod interaction;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};

use crate::commands::Commands;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "devstack", version)]
#[command(about = "Provision the job-search development stack", long_about = None)]
struct Cli {
    /// Config file (default: ./devstack.toml if present, else built-in defaults)
    #[arg(long = "config", short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log more detail to stderr (-v info, -vv debug); DEVSTACK_LOG overrides
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command.execute(cli.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(error: &CliError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = std::error::Error::source(cause);
    }
}

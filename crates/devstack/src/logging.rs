use tracing_subscriber::EnvFilter;

/// Overrides the `-v` derived filter, e.g. `DEVSTACK_LOG=devstack_gateway=trace`.
pub const LOG_ENV_VAR: &str = "DEVSTACK_LOG";

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the stderr subscriber. Safe to call more than once.
pub(crate) fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .try_init();
}

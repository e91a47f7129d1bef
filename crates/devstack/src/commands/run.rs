use clap::{Args, ValueEnum};
use devstack_gateway::{SystemGateway, ToolGateway};
use devstack_saga::{FailurePolicy, Orchestrator, RunReport, TracingLogger};
use devstack_steps::{DevstackConfig, check_prerequisites, plan_from_config};
use tracing::info;

use crate::error::{CliError, Result};
use crate::interaction;
use crate::output::{PlainTextFormatter, ReportFormatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OnFailure {
    /// Roll back and stop
    Abort,
    /// Record the failure and carry on
    Continue,
    /// Ask on the terminal; aborts when no terminal is available
    Prompt,
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// What to do when a non-critical step fails. Critical failures always abort.
    #[arg(long, value_enum, default_value_t = OnFailure::Abort)]
    on_failure: OnFailure,

    /// Do not probe for docker/podman and git before starting
    #[arg(long)]
    skip_prerequisites: bool,

    /// Only print the report when the run aborts
    #[arg(long, short)]
    quiet: bool,
}

pub(crate) fn run(config: &DevstackConfig, args: &RunArgs) -> Result<()> {
    let policy = match args.on_failure {
        OnFailure::Abort => FailurePolicy::AutoAbort,
        OnFailure::Continue => FailurePolicy::AutoContinue,
        OnFailure::Prompt => interaction::prompt_policy(),
    };
    let gateway = SystemGateway::new()?;

    let report = provision(config, &gateway, policy, args)?;
    finish(&report, args.quiet)
}

fn provision(
    config: &DevstackConfig,
    gateway: &(dyn ToolGateway + 'static),
    policy: FailurePolicy,
    args: &RunArgs,
) -> Result<RunReport> {
    if !args.skip_prerequisites {
        let tools = check_prerequisites(gateway, config)?;
        if !args.quiet {
            println!("{}", PlainTextFormatter.format_prerequisites(&tools));
        }
    }

    let plan = plan_from_config(config)?;
    info!(steps = plan.len(), ?policy, "starting provisioning run");

    Ok(Orchestrator::new(policy)
        .with_logger(TracingLogger)
        .run(&plan, gateway))
}

fn finish(report: &RunReport, quiet: bool) -> Result<()> {
    if !quiet || report.aborted() {
        print!("{}", PlainTextFormatter.format_report(report));
    }

    match report.abort_reason() {
        Some(reason) => Err(CliError::RunAborted { reason }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use devstack_gateway::{FakeGateway, HttpMethod, HttpResponse, ProcessOutput, Reply};

    use super::*;

    const RELEASE: &str =
        r#"{"tag_name": "v1.0.0", "assets": [{"name": "build.zip", "browser_download_url": "u"}]}"#;

    fn config() -> anyhow::Result<DevstackConfig> {
        Ok(DevstackConfig::from_toml_str(
            r#"
repositories = []

[[containers]]
name = "web"
image = "httpd:2.4"

[solr]
cores = []
fields = {}
enable_auth = false
"#,
        )?)
    }

    fn args(skip_prerequisites: bool) -> RunArgs {
        RunArgs {
            on_failure: OnFailure::Abort,
            skip_prerequisites,
            quiet: true,
        }
    }

    fn gateway() -> FakeGateway {
        FakeGateway::new().on_http(
            HttpMethod::Get,
            "/releases/latest",
            Reply::Respond(HttpResponse::new(200, RELEASE)),
        )
    }

    #[test]
    fn prerequisites_are_probed_before_any_step() -> anyhow::Result<()> {
        let fake = gateway().on_process(
            &["docker", "--version"],
            Reply::Respond(ProcessOutput::success("Docker version 27.1.1\n")),
        );

        let report = provision(&config()?, &fake, FailurePolicy::AutoAbort, &args(false))?;

        assert!(report.succeeded(), "{}", report.summary());
        assert_eq!(
            fake.commands(),
            vec![
                "docker --version",
                "docker network create mynetwork",
                "docker rm -f web",
                "docker run -d --name web --network mynetwork httpd:2.4",
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_engine_stops_before_mutation() -> anyhow::Result<()> {
        let fake = gateway().on_process(&["docker"], Reply::Unavailable);

        let err = provision(&config()?, &fake, FailurePolicy::AutoAbort, &args(false))
            .expect_err("docker is missing");

        assert!(matches!(err, CliError::Prerequisite(_)));
        assert_eq!(fake.commands(), vec!["docker --version"]);
        Ok(())
    }

    #[test]
    fn skipping_prerequisites_starts_with_the_network() -> anyhow::Result<()> {
        let fake = gateway();

        provision(&config()?, &fake, FailurePolicy::AutoAbort, &args(true))?;

        assert_eq!(
            fake.commands().first().map(String::as_str),
            Some("docker network create mynetwork")
        );
        Ok(())
    }

    #[test]
    fn aborted_run_becomes_an_error() -> anyhow::Result<()> {
        let fake = gateway().on_process(
            &["docker", "run"],
            Reply::Respond(ProcessOutput::failure(125, "port is already allocated")),
        );

        let report = provision(&config()?, &fake, FailurePolicy::AutoAbort, &args(true))?;
        let err = finish(&report, true).expect_err("run aborted");

        assert_eq!(
            err.to_string(),
            "provisioning aborted: critical step failed: start container web"
        );
        assert_eq!(fake.count_matching("docker network rm mynetwork"), 1);
        Ok(())
    }

    #[test]
    fn non_critical_failure_under_continue_still_succeeds() -> anyhow::Result<()> {
        let fake = FakeGateway::new().on_http(
            HttpMethod::Get,
            "/releases/latest",
            Reply::Respond(HttpResponse::new(404, "Not Found")),
        );

        let report = provision(&config()?, &fake, FailurePolicy::AutoContinue, &args(true))?;

        assert_eq!(report.failed_steps().len(), 1);
        assert!(finish(&report, true).is_ok());
        Ok(())
    }
}

use devstack_gateway::ToolGateway;
use devstack_saga::{Plan, PlanError, Step};

use crate::config::DevstackConfig;
use crate::steps::{
    CloneRepositoryStep, ConfigureSolrSchemaStep, CreateNetworkStep, CreateSolrCoreStep,
    EnableSolrAuthStep, ResolveReleaseStep, StartContainerStep, WaitForHttpStep,
};

/// Path polled to decide that Solr accepts admin calls.
pub const SOLR_READINESS_PATH: &str = "/solr/admin/cores?action=STATUS";

type BoxedStep = Box<dyn Step<dyn ToolGateway>>;

/// Assemble the ordered provisioning plan for `config`.
///
/// Order: network, repositories, containers, Solr readiness, cores, schema,
/// authentication, release lookup. Later steps rely on the side effects of
/// earlier ones, so the order is fixed.
///
/// # Errors
///
/// Returns [`PlanError`] if the config yields no steps or two steps share a
/// name.
pub fn plan_from_config(config: &DevstackConfig) -> Result<Plan<dyn ToolGateway>, PlanError> {
    let runtime = config.runtime();
    let timeout = config.command_timeout();
    let solr = config.solr();
    let mut steps: Vec<BoxedStep> = Vec::new();

    steps.push(Box::new(CreateNetworkStep::new(
        runtime.engine,
        &runtime.network,
        timeout,
    )));

    for repository in config.repositories() {
        steps.push(Box::new(CloneRepositoryStep::new(repository, timeout)));
    }

    for container in config.containers() {
        steps.push(Box::new(StartContainerStep::new(
            runtime.engine,
            &runtime.network,
            container,
            timeout,
        )));
    }

    if !solr.cores.is_empty() {
        steps.push(Box::new(
            WaitForHttpStep::new(
                "wait for solr",
                solr.url(SOLR_READINESS_PATH),
                solr.readiness_timeout(),
            )
            .with_credentials(solr.credentials.clone()),
        ));

        for core in &solr.cores {
            steps.push(Box::new(CreateSolrCoreStep::new(
                runtime.engine,
                &solr.container,
                core,
                timeout,
            )));
        }

        for (core, fields) in &solr.fields {
            if !fields.is_empty() {
                steps.push(Box::new(ConfigureSolrSchemaStep::new(
                    solr, core, fields, timeout,
                )));
            }
        }

        if solr.enable_auth {
            if let Some(credentials) = &solr.credentials {
                steps.push(Box::new(EnableSolrAuthStep::new(solr, credentials, timeout)));
            }
        }
    }

    if let Some(frontend) = config.frontend() {
        steps.push(Box::new(ResolveReleaseStep::new(frontend, timeout)));
    }

    Plan::from_steps(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_follows_dependency_order() -> anyhow::Result<()> {
        let plan = plan_from_config(&DevstackConfig::default())?;

        assert_eq!(
            plan.step_names(),
            vec![
                "create network mynetwork",
                "clone search-engine",
                "clone api",
                "start container apache-container",
                "start container solr-container",
                "wait for solr",
                "create core jobs",
                "create core firme",
                "create core auth",
                "configure schema jobs",
                "configure schema firme",
                "enable solr auth",
                "resolve frontend release",
            ]
        );
        Ok(())
    }

    #[test]
    fn criticality_is_assigned_per_step() -> anyhow::Result<()> {
        let plan = plan_from_config(&DevstackConfig::default())?;

        let non_critical: Vec<&str> = plan
            .steps()
            .iter()
            .filter(|step| !step.is_critical())
            .map(|step| step.name())
            .collect();

        assert_eq!(
            non_critical,
            vec![
                "configure schema jobs",
                "configure schema firme",
                "resolve frontend release",
            ]
        );
        Ok(())
    }

    #[test]
    fn solr_steps_are_skipped_without_cores() -> anyhow::Result<()> {
        let config = DevstackConfig::from_toml_str(
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
        )?;

        let plan = plan_from_config(&config)?;

        assert_eq!(
            plan.step_names(),
            vec![
                "create network mynetwork",
                "start container web",
                "resolve frontend release",
            ]
        );
        Ok(())
    }

    #[test]
    fn repository_criticality_comes_from_config() -> anyhow::Result<()> {
        let config = DevstackConfig::from_toml_str(
            r#"
[[repositories]]
name = "docs"
url = "https://example.com/docs.git"
destination = "/tmp/devstack-docs"
critical = false
"#,
        )?;

        let plan = plan_from_config(&config)?;

        let clone = plan
            .steps()
            .iter()
            .find(|step| step.name() == "clone docs")
            .expect("clone step present");
        assert!(!clone.is_critical());
        assert!(clone.has_compensation());
        Ok(())
    }
}

use std::time::Duration;

use devstack_gateway::{Credentials, HttpRequest, ProcessRequest, ToolGateway};
use devstack_saga::{Step, StepFailure};
use serde_json::json;
use tracing::info;

use super::{http_failed, run_tolerating, send};
use crate::config::{ContainerEngine, SolrConfig, SolrField};

/// Creates a core with the `solr` CLI inside the Solr container.
pub struct CreateSolrCoreStep {
    name: String,
    engine: ContainerEngine,
    container: String,
    core: String,
    timeout: Duration,
}

impl CreateSolrCoreStep {
    #[must_use]
    pub fn new(engine: ContainerEngine, container: &str, core: &str, timeout: Duration) -> Self {
        Self {
            name: format!("create core {core}"),
            engine,
            container: container.to_string(),
            core: core.to_string(),
            timeout,
        }
    }

    fn solr_cli(&self, args: &[&str]) -> ProcessRequest {
        ProcessRequest::new(self.engine.program())
            .args(["exec", self.container.as_str(), "solr"])
            .args(args.iter().copied())
            .timeout(self.timeout)
    }
}

impl Step<dyn ToolGateway> for CreateSolrCoreStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let request = self.solr_cli(&["create_core", "-c", &self.core]);
        let output = run_tolerating(gateway, &request, &["already exists"])?;

        if output.succeeded() {
            Ok(format!("created core {}", self.core))
        } else {
            info!(core = %self.core, "core already exists");
            Ok(format!("core {} already exists", self.core))
        }
    }

    fn has_compensation(&self) -> bool {
        true
    }

    fn compensate(&self, gateway: &dyn ToolGateway) -> Result<(), StepFailure> {
        let request = self.solr_cli(&["delete", "-c", &self.core]);
        run_tolerating(
            gateway,
            &request,
            &["non-existent", "not found", "no such container"],
        )?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        format!("delete core {}", self.core)
    }
}

/// Adds fields to a core through the schema API.
///
/// Non-critical by default: a core without custom fields still serves
/// queries.
pub struct ConfigureSolrSchemaStep {
    name: String,
    url: String,
    fields: Vec<SolrField>,
    credentials: Option<Credentials>,
    timeout: Duration,
    critical: bool,
}

impl ConfigureSolrSchemaStep {
    #[must_use]
    pub fn new(solr: &SolrConfig, core: &str, fields: &[SolrField], timeout: Duration) -> Self {
        Self {
            name: format!("configure schema {core}"),
            url: solr.url(&format!("/solr/{core}/schema")),
            fields: fields.to_vec(),
            credentials: solr.credentials.clone(),
            timeout,
            critical: false,
        }
    }

    #[must_use]
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }
}

impl Step<dyn ToolGateway> for ConfigureSolrSchemaStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_critical(&self) -> bool {
        self.critical
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let fields: Vec<serde_json::Value> = self.fields.iter().map(SolrField::to_json).collect();
        let request = HttpRequest::post_json(&self.url, json!({ "add-field": fields }))
            .credentials(self.credentials.clone())
            .timeout(self.timeout);
        let response = send(gateway, &request)?;

        if response.is_success() {
            Ok(format!("added {} field(s)", self.fields.len()))
        } else if response.body.contains("already exists") {
            Ok(String::from("fields already present"))
        } else {
            Err(http_failed(&request, &response))
        }
    }
}

/// Turns on basic authentication and grants the configured user the admin
/// role.
pub struct EnableSolrAuthStep {
    authentication_url: String,
    authorization_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl EnableSolrAuthStep {
    #[must_use]
    pub fn new(solr: &SolrConfig, credentials: &Credentials, timeout: Duration) -> Self {
        Self {
            authentication_url: solr.url("/solr/admin/authentication"),
            authorization_url: solr.url("/solr/admin/authorization"),
            credentials: credentials.clone(),
            timeout,
        }
    }

    fn post(&self, url: &str, body: serde_json::Value) -> HttpRequest {
        HttpRequest::post_json(url, body)
            .credentials(Some(self.credentials.clone()))
            .timeout(self.timeout)
    }
}

impl Step<dyn ToolGateway> for EnableSolrAuthStep {
    fn name(&self) -> &str {
        "enable solr auth"
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let username = &self.credentials.username;
        let mut user = serde_json::Map::new();
        user.insert(username.clone(), json!(self.credentials.password));
        let authentication = self.post(&self.authentication_url, json!({ "set-user": user }));
        let response = send(gateway, &authentication)?;
        // 401 means a security.json is already active and rejected the call.
        if response.status == 401 {
            info!("solr authentication already enabled");
            return Ok(String::from("authentication already enabled"));
        }
        if !response.is_success() {
            return Err(http_failed(&authentication, &response));
        }

        let mut role = serde_json::Map::new();
        role.insert(username.clone(), json!(["admin"]));
        let authorization = self.post(&self.authorization_url, json!({ "set-user-role": role }));
        let response = send(gateway, &authorization)?;
        if !response.is_success() && response.status != 401 {
            return Err(http_failed(&authorization, &response));
        }

        Ok(format!("enabled authentication for user {username}"))
    }
}

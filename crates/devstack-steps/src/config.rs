use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use devstack_gateway::Credentials;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerEngine {
    #[default]
    Docker,
    Podman,
}

impl ContainerEngine {
    /// Name of the CLI binary.
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl std::fmt::Display for ContainerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub engine: ContainerEngine,
    pub network: String,
    pub command_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: ContainerEngine::default(),
            network: String::from("mynetwork"),
            command_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    pub destination: PathBuf,
    #[serde(default = "default_true")]
    pub critical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Passed as `-e KEY=VALUE` in declaration order.
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default = "default_true")]
    pub critical: bool,
}

/// One `add-field` entry for a Solr core's managed schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolrField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default = "default_true")]
    pub stored: bool,
    #[serde(default = "default_true")]
    pub indexed: bool,
    #[serde(default)]
    pub multi_valued: bool,
}

impl SolrField {
    #[must_use]
    pub fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            stored: true,
            indexed: true,
            multi_valued: false,
        }
    }

    #[must_use]
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// The field as Solr's schema API expects it.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "type": self.field_type,
            "stored": self.stored,
            "indexed": self.indexed,
            "multiValued": self.multi_valued,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolrConfig {
    /// Container the `solr` CLI is executed in.
    pub container: String,
    pub base_url: String,
    pub cores: Vec<String>,
    pub credentials: Option<Credentials>,
    /// Schema fields keyed by core name.
    pub fields: IndexMap<String, Vec<SolrField>>,
    pub readiness_timeout_secs: u64,
    pub enable_auth: bool,
}

impl SolrConfig {
    /// `base_url` joined with `path`, without doubled slashes.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    #[must_use]
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }
}

impl Default for SolrConfig {
    fn default() -> Self {
        let mut fields = IndexMap::new();
        fields.insert(
            String::from("jobs"),
            vec![
                SolrField::new("job_title", "text_general"),
                SolrField::new("job_link", "string"),
                SolrField::new("company", "string"),
                SolrField::new("country", "string").multi_valued(),
                SolrField::new("city", "string").multi_valued(),
                SolrField::new("county", "string").multi_valued(),
                SolrField::new("remote", "string").multi_valued(),
            ],
        );
        fields.insert(
            String::from("firme"),
            vec![
                SolrField::new("cui", "string"),
                SolrField::new("denumire", "text_general"),
                SolrField::new("judet", "string"),
            ],
        );

        Self {
            container: String::from("solr-container"),
            base_url: String::from("http://localhost:8983"),
            cores: vec![
                String::from("jobs"),
                String::from("firme"),
                String::from("auth"),
            ],
            credentials: Some(Credentials::new("solr", "SolrRocks")),
            fields,
            readiness_timeout_secs: 120,
            enable_auth: true,
        }
    }
}

/// GitHub repository whose latest release carries the frontend build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrontendConfig {
    pub owner: String,
    pub repo: String,
}

/// Everything a provisioning run needs, loaded once and passed to every
/// step factory by parameter.
///
/// Omitted sections fall back to the job-search stack defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevstackConfig {
    runtime: RuntimeConfig,
    repositories: Vec<RepositoryConfig>,
    containers: Vec<ContainerConfig>,
    solr: SolrConfig,
    frontend: Option<FrontendConfig>,
}

impl Default for DevstackConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            repositories: vec![
                RepositoryConfig {
                    name: String::from("search-engine"),
                    url: String::from("https://github.com/peviitor-ro/search-engine.git"),
                    branch: default_branch(),
                    destination: PathBuf::from("peviitor/search-engine"),
                    critical: true,
                },
                RepositoryConfig {
                    name: String::from("api"),
                    url: String::from("https://github.com/peviitor-ro/api.git"),
                    branch: default_branch(),
                    destination: PathBuf::from("peviitor/api"),
                    critical: true,
                },
            ],
            containers: vec![
                ContainerConfig {
                    name: String::from("apache-container"),
                    image: String::from("httpd:2.4"),
                    ports: vec![String::from("8081:80")],
                    volumes: Vec::new(),
                    env: IndexMap::new(),
                    critical: true,
                },
                ContainerConfig {
                    name: String::from("solr-container"),
                    image: String::from("solr:9"),
                    ports: vec![String::from("8983:8983")],
                    volumes: Vec::new(),
                    env: IndexMap::from([(String::from("SOLR_HEAP"), String::from("1g"))]),
                    critical: true,
                },
            ],
            solr: SolrConfig::default(),
            frontend: Some(FrontendConfig {
                owner: String::from("peviitor-ro"),
                repo: String::from("search-engine"),
            }),
        }
    }
}

impl DevstackConfig {
    /// Read and validate a TOML config file.
    ///
    /// Relative repository destinations are resolved against the directory
    /// containing the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid TOML,
    /// or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_destinations(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if `text` is not valid TOML or fails
    /// validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.network.trim().is_empty() {
            return Err(ConfigError::invalid("runtime.network must not be empty"));
        }
        if self.runtime.command_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "runtime.command_timeout_secs must be greater than zero",
            ));
        }
        if self.solr.readiness_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "solr.readiness_timeout_secs must be greater than zero",
            ));
        }

        check_unique("repository", self.repositories.iter().map(|r| r.name.as_str()))?;
        check_unique("container", self.containers.iter().map(|c| c.name.as_str()))?;
        check_unique("solr core", self.solr.cores.iter().map(String::as_str))?;

        if let Some(container) = self.containers.iter().find(|c| c.image.trim().is_empty()) {
            return Err(ConfigError::invalid(format!(
                "container '{}' has no image",
                container.name
            )));
        }

        if !self.solr.cores.is_empty() && self.container(&self.solr.container).is_none() {
            return Err(ConfigError::invalid(format!(
                "solr.container '{}' is not a declared container",
                self.solr.container
            )));
        }

        if let Some(core) = self
            .solr
            .fields
            .keys()
            .find(|core| !self.solr.cores.contains(core))
        {
            return Err(ConfigError::invalid(format!(
                "solr.fields references undeclared core '{core}'"
            )));
        }

        if self.solr.enable_auth && self.solr.credentials.is_none() {
            return Err(ConfigError::invalid(
                "solr.enable_auth requires solr.credentials",
            ));
        }

        if let Some(frontend) = &self.frontend {
            if frontend.owner.trim().is_empty() || frontend.repo.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "frontend.owner and frontend.repo must not be empty",
                ));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    #[must_use]
    pub fn repositories(&self) -> &[RepositoryConfig] {
        &self.repositories
    }

    #[must_use]
    pub fn containers(&self) -> &[ContainerConfig] {
        &self.containers
    }

    #[must_use]
    pub fn container(&self, name: &str) -> Option<&ContainerConfig> {
        self.containers.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn solr(&self) -> &SolrConfig {
        &self.solr
    }

    #[must_use]
    pub fn frontend(&self) -> Option<&FrontendConfig> {
        self.frontend.as_ref()
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime.command_timeout_secs)
    }

    fn resolve_destinations(&mut self, base: &Path) {
        for repository in &mut self.repositories {
            if repository.destination.is_relative() {
                repository.destination = base.join(&repository.destination);
            }
        }
    }
}

fn check_unique<'a>(
    kind: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(ConfigError::invalid(format!("{kind} name must not be empty")));
        }
        if !seen.insert(name) {
            return Err(ConfigError::invalid(format!("duplicate {kind} name '{name}'")));
        }
    }
    Ok(())
}

fn default_branch() -> String {
    String::from("main")
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_is_valid() -> anyhow::Result<()> {
        let config = DevstackConfig::default();

        config.validate()?;
        assert_eq!(config.runtime().engine, ContainerEngine::Docker);
        assert_eq!(config.solr().cores, vec!["jobs", "firme", "auth"]);
        assert!(config.container("solr-container").is_some());
        Ok(())
    }

    #[test]
    fn empty_document_yields_defaults() -> anyhow::Result<()> {
        let config = DevstackConfig::from_toml_str("")?;

        assert_eq!(config, DevstackConfig::default());
        Ok(())
    }

    #[test]
    fn parses_full_document() -> anyhow::Result<()> {
        let config = DevstackConfig::from_toml_str(
            r#"
[runtime]
engine = "podman"
network = "devnet"
command_timeout_secs = 60

[[repositories]]
name = "api"
url = "https://example.com/api.git"
destination = "/srv/api"
critical = false

[[containers]]
name = "search"
image = "solr:9"
ports = ["8983:8983"]
env = { SOLR_HEAP = "512m", ZK_HOST = "zk:2181" }

[solr]
container = "search"
base_url = "http://localhost:8983/"
cores = ["jobs"]
credentials = { username = "admin", password = "secret" }
readiness_timeout_secs = 30

[[solr.fields.jobs]]
name = "title"
type = "text_general"
multi_valued = true

[frontend]
owner = "acme"
repo = "site"
"#,
        )?;

        assert_eq!(config.runtime().engine.program(), "podman");
        assert_eq!(config.command_timeout(), Duration::from_secs(60));
        assert_eq!(config.repositories()[0].branch, "main");
        assert!(!config.repositories()[0].critical);
        let env: Vec<&str> = config.containers()[0]
            .env
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(env, vec!["SOLR_HEAP", "ZK_HOST"]);
        assert_eq!(
            config.solr().url("/solr/jobs/schema"),
            "http://localhost:8983/solr/jobs/schema"
        );
        assert!(config.solr().fields["jobs"][0].multi_valued);
        assert!(config.solr().fields["jobs"][0].stored);
        assert_eq!(config.frontend().map(|f| f.repo.as_str()), Some("site"));
        Ok(())
    }

    #[test]
    fn literal_string_keeps_backslashes_in_destination() -> anyhow::Result<()> {
        let config = DevstackConfig::from_toml_str(
            r#"
[[repositories]]
name = "api"
url = "https://example.com/api.git"
destination = 'C:\Users\dev\peviitor\api'
"#,
        )?;

        assert_eq!(
            config.repositories()[0].destination,
            PathBuf::from(r"C:\Users\dev\peviitor\api")
        );
        Ok(())
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = DevstackConfig::from_toml_str("[runtime]\nnetwrok = \"x\"\n");

        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn rejects_empty_network() {
        let err = DevstackConfig::from_toml_str("[runtime]\nnetwork = \" \"\n")
            .expect_err("empty network");

        assert!(err.to_string().contains("runtime.network"));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let command = DevstackConfig::from_toml_str("[runtime]\ncommand_timeout_secs = 0\n");
        let readiness = DevstackConfig::from_toml_str("[solr]\nreadiness_timeout_secs = 0\n");

        assert!(matches!(command, Err(ConfigError::Invalid { .. })));
        assert!(matches!(readiness, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_duplicate_container_names() {
        let err = DevstackConfig::from_toml_str(
            r#"
[[containers]]
name = "solr-container"
image = "solr:9"

[[containers]]
name = "solr-container"
image = "solr:8"
"#,
        )
        .expect_err("duplicate names");

        assert!(err.to_string().contains("duplicate container name 'solr-container'"));
    }

    #[test]
    fn rejects_fields_for_undeclared_core() {
        let err = DevstackConfig::from_toml_str(
            r#"
[solr]
cores = ["jobs"]

[[solr.fields.firme]]
name = "cui"
type = "string"
"#,
        )
        .expect_err("undeclared core");

        assert!(err.to_string().contains("undeclared core 'firme'"));
    }

    #[test]
    fn rejects_auth_without_credentials() {
        let mut config = DevstackConfig::default();
        config.solr.credentials = None;

        let err = config.validate().expect_err("auth needs credentials");

        assert!(err.to_string().contains("requires solr.credentials"));
    }

    #[test]
    fn rejects_solr_container_that_is_not_declared() {
        let err = DevstackConfig::from_toml_str(
            r#"
[[containers]]
name = "web"
image = "httpd:2.4"
"#,
        )
        .expect_err("solr-container missing");

        assert!(err.to_string().contains("solr.container 'solr-container'"));
    }

    #[test]
    fn load_resolves_relative_destinations() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("devstack.toml");
        let mut file = std::fs::File::create(&path)?;
        writeln!(
            file,
            r#"
[[repositories]]
name = "api"
url = "https://example.com/api.git"
destination = "checkout/api"
"#
        )?;

        let config = DevstackConfig::load(&path)?;

        assert_eq!(
            config.repositories()[0].destination,
            dir.path().join("checkout/api")
        );
        Ok(())
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DevstackConfig::load(Path::new("/nonexistent/devstack.toml"))
            .expect_err("missing file");

        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reports_parse_error_with_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("devstack.toml");
        std::fs::write(&path, "[runtime\n")?;

        let err = DevstackConfig::load(&path).expect_err("broken toml");

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("devstack.toml"));
        Ok(())
    }
}

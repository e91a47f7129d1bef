//! Provisioning steps for the job-search development stack.
//!
//! [`DevstackConfig`] is loaded once and handed to [`plan_from_config`],
//! which builds an ordered [`Plan`](devstack_saga::Plan) of steps that talk
//! to the outside world only through a
//! [`ToolGateway`](devstack_gateway::ToolGateway).

mod config;
mod error;
mod plan;
mod prerequisites;
pub mod steps;

pub use config::{
    ContainerConfig, ContainerEngine, DevstackConfig, FrontendConfig, RepositoryConfig,
    RuntimeConfig, SolrConfig, SolrField,
};
pub use error::{ConfigError, PrerequisiteError};
pub use plan::{SOLR_READINESS_PATH, plan_from_config};
pub use prerequisites::{ToolVersion, check_prerequisites, required_tools};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "devstack.toml";

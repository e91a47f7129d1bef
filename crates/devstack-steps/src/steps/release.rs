use std::time::Duration;

use devstack_gateway::{HttpRequest, ToolGateway};
use devstack_saga::{Step, StepFailure};
use serde::Deserialize;

use super::{http_failed, send};
use crate::config::FrontendConfig;

const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

/// Looks up the download URL of the latest frontend build. Read-only.
pub struct ResolveReleaseStep {
    owner: String,
    repo: String,
    api_base: String,
    timeout: Duration,
}

impl ResolveReleaseStep {
    #[must_use]
    pub fn new(frontend: &FrontendConfig, timeout: Duration) -> Self {
        Self {
            owner: frontend.owner.clone(),
            repo: frontend.repo.clone(),
            api_base: GITHUB_API.to_string(),
            timeout,
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

impl Step<dyn ToolGateway> for ResolveReleaseStep {
    fn name(&self) -> &str {
        "resolve frontend release"
    }

    fn is_critical(&self) -> bool {
        false
    }

    fn execute(&self, gateway: &dyn ToolGateway) -> Result<String, StepFailure> {
        let url = self.url();
        let request = HttpRequest::get(&url).timeout(self.timeout);
        let response = send(gateway, &request)?;
        if !response.is_success() {
            return Err(http_failed(&request, &response));
        }

        let release: Release = response.json(&url).map_err(StepFailure::from_error)?;
        let asset = release.assets.first().ok_or_else(|| {
            StepFailure::new(format!(
                "release {} of {}/{} has no assets",
                release.tag_name, self.owner, self.repo
            ))
        })?;

        Ok(format!(
            "{} {} at {}",
            release.tag_name, asset.name, asset.browser_download_url
        ))
    }
}

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the OpenSRP REST API, usually read from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            access_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            endpoints: Endpoints::default(),
        }
    }
}

/// Endpoint paths relative to `api_base_url`.
///
/// `{userName}` and `{organizationId}` are substituted per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub plans: String,
    pub plans_by_user: String,
    /// Jurisdiction-scoped plan rows; not every deployment exposes them.
    pub plan_rows: Option<String>,
    pub organizations: String,
    pub practitioners: String,
    pub practitioner_roles: String,
    pub settings: String,
    pub files: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            plans: "plans".to_string(),
            plans_by_user: "plans/user/{userName}".to_string(),
            plan_rows: None,
            organizations: "organization".to_string(),
            practitioners: "practitioner".to_string(),
            practitioner_roles: "organization/practitioner/{organizationId}".to_string(),
            settings: "settings".to_string(),
            files: "upload/history".to_string(),
        }
    }
}

impl Endpoints {
    /// The user name fills one path segment and is percent-encoded.
    #[must_use]
    pub fn plans_for_user(&self, user_name: &str) -> String {
        self.plans_by_user.replace("{userName}", &urlencoding::encode(user_name))
    }

    #[must_use]
    pub fn practitioners_for_organization(&self, organization_id: &str) -> String {
        self.practitioner_roles.replace("{organizationId}", &urlencoding::encode(organization_id))
    }
}

impl ApiConfig {
    /// # Errors
    /// Unreadable file or invalid YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// # Errors
    /// Invalid YAML.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("failed to parse YAML config")?;
        Ok(config)
    }

    /// Checks the settings a live fetch needs. Fixture-only runs never call this.
    ///
    /// # Errors
    /// Missing or non-HTTP base URL, missing token, zero timeout.
    pub fn validate(&self) -> Result<()> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            bail!("api_base_url is not configured");
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            bail!("api_base_url must start with http:// or https://, got {base}");
        }
        if self.access_token.as_deref().map_or(true, |token| token.trim().is_empty()) {
            bail!("access_token is not configured");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than 0");
        }
        Ok(())
    }
}

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::service::{ListParams, Service};

/// Shared HTTP agent and credentials for every OpenSRP endpoint.
#[derive(Debug, Clone)]
pub struct OpenSrpClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl OpenSrpClient {
    /// # Errors
    /// When the config is missing a base URL or token.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        config.validate()?;
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        let token = config.access_token.as_deref().unwrap_or_default().trim();
        Ok(Self {
            agent,
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
            authorization: format!("Bearer {token}"),
        })
    }

    /// A [`Service`] bound to one endpoint path.
    #[must_use]
    pub fn service(&self, endpoint: &str) -> OpenSrpService {
        OpenSrpService { client: self.clone(), endpoint: endpoint.trim_matches('/').to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct OpenSrpService {
    client: OpenSrpClient,
    endpoint: String,
}

impl OpenSrpService {
    fn url(&self, id: Option<&str>) -> String {
        join_url(&self.client.base_url, &self.endpoint, id)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.client
            .agent
            .request(method, url)
            .set("Authorization", &self.client.authorization)
            .set("Content-Type", "application/json;charset=UTF-8")
            .set("Accept", "application/json")
    }

    fn read_body(response: ureq::Response, method: &str, url: &str) -> Result<Value> {
        let body = response
            .into_string()
            .with_context(|| format!("failed to read response body of {method} {url}"))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).with_context(|| format!("{method} {url} returned invalid JSON"))
    }
}

fn join_url(base_url: &str, endpoint: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{base_url}/{endpoint}/{id}"),
        None => format!("{base_url}/{endpoint}"),
    }
}

impl Service for OpenSrpService {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn list(&self, params: &ListParams) -> Result<Vec<Value>> {
        let url = self.url(None);
        let mut request = self.request("GET", &url);
        for (name, value) in params {
            request = request.query(name, value);
        }
        tracing::debug!(url = %url, "listing");
        let response = request.call().with_context(|| format!("GET {url} failed"))?;
        match Self::read_body(response, "GET", &url)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => bail!("GET {url} returned {} instead of a JSON array", json_kind(&other)),
        }
    }

    fn read(&self, id: &str) -> Result<Value> {
        let url = self.url(Some(id));
        let response =
            self.request("GET", &url).call().with_context(|| format!("GET {url} failed"))?;
        Self::read_body(response, "GET", &url)
    }

    fn create(&self, payload: &Value) -> Result<Value> {
        let url = self.url(None);
        let response = self
            .request("POST", &url)
            .send_json(payload)
            .with_context(|| format!("POST {url} failed"))?;
        Self::read_body(response, "POST", &url)
    }

    fn update(&self, payload: &Value) -> Result<Value> {
        let url = self.url(None);
        let response = self
            .request("PUT", &url)
            .send_json(payload)
            .with_context(|| format!("PUT {url} failed"))?;
        Self::read_body(response, "PUT", &url)
    }

    fn delete(&self, payload: &Value) -> Result<()> {
        let url = self.url(None);
        self.request("DELETE", &url)
            .send_json(payload)
            .with_context(|| format!("DELETE {url} failed"))?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig {
            api_base_url: "https://reveal-stage.smartregister.org/opensrp/rest/".to_string(),
            access_token: Some("hunter2".to_string()),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn urls_join_without_doubled_slashes() {
        let client = OpenSrpClient::new(&config()).unwrap_or_else(|err| panic!("client: {err}"));
        let service = client.service("/organization/");
        assert_eq!(service.endpoint(), "organization");
        assert_eq!(
            service.url(None),
            "https://reveal-stage.smartregister.org/opensrp/rest/organization"
        );
        assert_eq!(
            service.url(Some("fcc19470")),
            "https://reveal-stage.smartregister.org/opensrp/rest/organization/fcc19470"
        );
    }

    #[test]
    fn bearer_header_uses_trimmed_token() {
        let mut config = config();
        config.access_token = Some(" hunter2 \n".to_string());
        let client = OpenSrpClient::new(&config).unwrap_or_else(|err| panic!("client: {err}"));
        assert_eq!(client.authorization, "Bearer hunter2");
    }

    #[test]
    fn client_requires_valid_config() {
        assert!(OpenSrpClient::new(&ApiConfig::default()).is_err());
    }
}

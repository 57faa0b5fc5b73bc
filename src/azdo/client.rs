//! Azure DevOps Client
//!
//! Main client for the Azure DevOps REST API, combining authentication
//! and HTTP functionality.

use super::auth::AzdoCredentials;
use super::http::AzdoHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// REST API version sent with every request
pub const API_VERSION: &str = "5.1";

/// Main Azure DevOps client
#[derive(Clone, Debug)]
pub struct AzdoClient {
    pub credentials: AzdoCredentials,
    pub http: AzdoHttpClient,
    org_url: String,
}

impl AzdoClient {
    /// Create a new client for an organization URL such as
    /// `https://dev.azure.com/my-org`
    pub fn new(org_url: &str, token: &str) -> Result<Self> {
        let credentials = AzdoCredentials::new(token)?;
        Self::with_credentials(org_url, credentials)
    }

    /// Create a new client from existing credentials
    pub fn with_credentials(org_url: &str, credentials: AzdoCredentials) -> Result<Self> {
        let org_url = normalize_org_url(org_url)?;
        let http = AzdoHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            org_url,
        })
    }

    /// Organization URL without a trailing slash
    pub fn org_url(&self) -> &str {
        &self.org_url
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Value> {
        self.http.get(url, &self.credentials).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.http.post(url, &self.credentials, body).await
    }

    /// Make a PUT request
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        self.http.put(url, &self.credentials, body).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str) -> Result<Value> {
        self.http.delete(url, &self.credentials).await
    }

    // =========================================================================
    // Build API helpers
    // =========================================================================

    /// Build definitions collection URL for a project
    pub fn build_definitions_url(&self, project: &str) -> String {
        format!(
            "{}/{}/_apis/build/definitions?api-version={}",
            self.org_url,
            urlencoding::encode(project),
            API_VERSION
        )
    }

    /// Single build definition URL
    pub fn build_definition_url(&self, project: &str, definition_id: i32) -> String {
        format!(
            "{}/{}/_apis/build/definitions/{}?api-version={}",
            self.org_url,
            urlencoding::encode(project),
            definition_id,
            API_VERSION
        )
    }

    // =========================================================================
    // Core API helpers
    // =========================================================================

    /// Single project URL (accepts a project name or ID)
    pub fn project_url(&self, project: &str) -> String {
        format!(
            "{}/_apis/projects/{}?api-version={}",
            self.org_url,
            urlencoding::encode(project),
            API_VERSION
        )
    }
}

/// Validate an organization URL and strip any trailing slash
fn normalize_org_url(org_url: &str) -> Result<String> {
    let parsed = Url::parse(org_url.trim())
        .with_context(|| format!("Invalid organization URL: {}", org_url))?;

    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(anyhow::anyhow!(
            "Organization URL must use http or https: {}",
            org_url
        ));
    }
    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return Err(anyhow::anyhow!("Organization URL has no host: {}", org_url));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Format an Azure DevOps API error for display
pub fn format_azdo_error(error: &anyhow::Error) -> String {
    super::http::format_azdo_error(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AzdoClient {
        AzdoClient::new("https://dev.azure.com/contoso/", "pat").unwrap()
    }

    #[test]
    fn test_org_url_trailing_slash_trimmed() {
        assert_eq!(client().org_url(), "https://dev.azure.com/contoso");
    }

    #[test]
    fn test_rejects_non_http_org_url() {
        assert!(AzdoClient::new("ftp://dev.azure.com/contoso", "pat").is_err());
        assert!(AzdoClient::new("not a url", "pat").is_err());
    }

    #[test]
    fn test_build_definition_urls() {
        let c = client();
        assert_eq!(
            c.build_definitions_url("proj"),
            "https://dev.azure.com/contoso/proj/_apis/build/definitions?api-version=5.1"
        );
        assert_eq!(
            c.build_definition_url("proj", 17),
            "https://dev.azure.com/contoso/proj/_apis/build/definitions/17?api-version=5.1"
        );
    }

    #[test]
    fn test_project_url_encodes_name() {
        assert_eq!(
            client().project_url("My Project"),
            "https://dev.azure.com/contoso/_apis/projects/My%20Project?api-version=5.1"
        );
    }
}

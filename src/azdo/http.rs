//! HTTP utilities for Azure DevOps REST API calls

use super::auth::AzdoCredentials;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Maximum length of a server-provided error message kept on [`ApiError`]
const MAX_ERROR_MESSAGE_LENGTH: usize = 160;

/// Non-success response from the Azure DevOps API
#[derive(Debug, Error)]
#[error("API request failed: {status}")]
pub struct ApiError {
    pub status: StatusCode,
    /// `message` field of the Azure DevOps error body, if any
    pub message: Option<String>,
}

impl ApiError {
    fn from_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .map(|m| m.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect());
        Self { status, message }
    }
}

/// Status code of the API error behind `error`, if there is one
pub fn api_status(error: &anyhow::Error) -> Option<StatusCode> {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<ApiError>())
        .map(|e| e.status)
}

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Azure DevOps API calls
#[derive(Clone, Debug)]
pub struct AzdoHttpClient {
    client: Client,
}

impl AzdoHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azdo-build-definition/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, creds: &AzdoCredentials) -> Result<Value> {
        tracing::debug!("GET {}", url);
        self.send(self.client.get(url), creds).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, url: &str, creds: &AzdoCredentials, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", url);
        self.send(self.client.post(url).json(body), creds).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: &str, creds: &AzdoCredentials, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", url);
        self.send(self.client.put(url).json(body), creds).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, creds: &AzdoCredentials) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        self.send(self.client.delete(url), creds).await
    }

    async fn send(&self, request: RequestBuilder, creds: &AzdoCredentials) -> Result<Value> {
        let response = request
            .basic_auth(creds.username(), Some(creds.password()))
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::from_body(status, &body).into());
        }

        // Handle empty response (DELETE returns 204)
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Format an Azure DevOps API error for display
pub fn format_azdo_error(error: &anyhow::Error) -> String {
    let server_message = error
        .chain()
        .find_map(|e| e.downcast_ref::<ApiError>())
        .and_then(|e| e.message.clone());

    let summary = match api_status(error).map(|s| s.as_u16()) {
        Some(401) => "Authentication failed. Check AZDO_PERSONAL_ACCESS_TOKEN.",
        Some(403) => "Permission denied. Check the token's Build (Read & execute) scope.",
        Some(404) => "Resource not found.",
        Some(409) => "Resource conflict. A definition with this name may already exist.",
        Some(429) => "Rate limit exceeded. Please try again later.",
        Some(400) => "Invalid request. Check your parameters.",
        Some(500) | Some(503) => "Azure DevOps service temporarily unavailable. Please try again.",
        Some(_) => "Request failed.",
        None => {
            let error_str = format!("{:#}", error);
            let sanitized: String = error_str
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(120)
                .collect();
            return if sanitized.len() < error_str.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            };
        }
    };

    match server_message {
        Some(message) => format!("{} ({})", summary, message),
        None => summary.to_string(),
    }
}

//! Configuration Management
//!
//! Resolves the organization URL and personal access token used to talk to
//! Azure DevOps. Precedence: command line > environment > config file.

use crate::azdo::auth::TOKEN_ENV_VAR;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the organization URL
pub const ORG_URL_ENV_VAR: &str = "AZDO_ORG_SERVICE_URL";

/// Persistent provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Organization URL, e.g. `https://dev.azure.com/my-org`
    #[serde(default)]
    pub org_service_url: Option<String>,
    /// Personal access token. Prefer the environment over storing it here.
    #[serde(default)]
    pub personal_access_token: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azdo-build-definition").join("config.json"))
    }

    /// Load configuration from the default location. A missing or unreadable
    /// file yields the default configuration.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from `path`; a missing file is not an error
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective organization URL (CLI > env > config)
    pub fn effective_org_url(&self, cli: Option<&str>) -> Option<String> {
        pick(cli, std::env::var(ORG_URL_ENV_VAR).ok(), &self.org_service_url)
    }

    /// Get effective personal access token (CLI > env > config)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        pick(cli, std::env::var(TOKEN_ENV_VAR).ok(), &self.personal_access_token)
    }

    /// Set organization URL and save
    pub fn set_org_url(&mut self, org_url: &str) -> Result<()> {
        self.org_service_url = Some(org_url.to_string());
        self.save()
    }
}

fn pick(cli: Option<&str>, env: Option<String>, file: &Option<String>) -> Option<String> {
    let non_blank = |v: &String| !v.trim().is_empty();
    cli.map(str::to_string)
        .filter(non_blank)
        .or_else(|| env.filter(non_blank))
        .or_else(|| file.clone().filter(non_blank))
}

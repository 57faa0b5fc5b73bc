//! Azure DevOps Projects
//!
//! Project lookup, used to resolve project names to IDs.

use super::client::AzdoClient;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Project information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub state: String,
}

impl From<&Value> for Project {
    fn from(value: &Value) -> Self {
        Self {
            id: value
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            state: value
                .get("state")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

/// Remote project operations
#[async_trait]
pub trait ProjectClient: Send + Sync {
    /// Fetch a project by name or ID
    async fn get_project(&self, project: &str) -> Result<Project>;
}

#[async_trait]
impl ProjectClient for AzdoClient {
    async fn get_project(&self, project: &str) -> Result<Project> {
        let url = self.project_url(project);
        let response = self.get(&url).await?;
        let project = Project::from(&response);

        if project.id.is_empty() {
            return Err(anyhow::anyhow!("Project response did not include an ID"));
        }

        Ok(project)
    }
}

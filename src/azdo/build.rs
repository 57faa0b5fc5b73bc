//! Azure DevOps Build Definitions
//!
//! Typed models for the `_apis/build/definitions` endpoints and the
//! [`BuildClient`] trait the resource layer talks to.

use super::client::AzdoClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Process `type` discriminator the service uses for YAML pipelines
pub const YAML_PROCESS_TYPE: i32 = 2;

/// Repository property holding the service connection ID
pub const CONNECTED_SERVICE_ID_PROPERTY: &str = "connectedServiceId";

/// Whether new builds may be queued for a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefinitionQueueStatus {
    Enabled,
    Paused,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefinitionType {
    Xaml,
    Build,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefinitionQuality {
    Definition,
    Draft,
}

/// A YAML-based build process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlProcess {
    pub yaml_filename: String,
    #[serde(rename = "type", default = "yaml_process_type")]
    pub process_type: i32,
}

fn yaml_process_type() -> i32 {
    YAML_PROCESS_TYPE
}

impl YamlProcess {
    pub fn new(yaml_filename: &str) -> Self {
        Self {
            yaml_filename: yaml_filename.to_string(),
            process_type: YAML_PROCESS_TYPE,
        }
    }
}

/// The `process` member of a definition.
///
/// The service returns either a YAML process or some other process shape
/// (designer phases and so on). Anything carrying a string `yamlFilename`
/// decodes as [`Process::Yaml`]; everything else is kept as a raw map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Process {
    Yaml(YamlProcess),
    Generic(Map<String, Value>),
}

impl Process {
    /// YAML file the process points at, whichever shape it came in
    pub fn yaml_filename(&self) -> Option<&str> {
        match self {
            Process::Yaml(yaml) => Some(&yaml.yaml_filename),
            Process::Generic(map) => map.get("yamlFilename").and_then(|v| v.as_str()),
        }
    }
}

/// Source repository of a definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRepository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub repository_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAgentPoolReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolQueue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<TaskAgentPoolReference>,
}

/// Reference to a variable group linked to a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableGroupReference {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Build definition as exchanged with the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<BuildRepository>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<AgentPoolQueue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_status: Option<DefinitionQueueStatus>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub definition_type: Option<DefinitionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<DefinitionQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_groups: Option<Vec<VariableGroupReference>>,
}

/// Remote build definition operations
#[async_trait]
pub trait BuildClient: Send + Sync {
    async fn create_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition>;

    async fn get_definition(&self, project: &str, definition_id: i32) -> Result<BuildDefinition>;

    async fn update_definition(
        &self,
        project: &str,
        definition_id: i32,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition>;

    async fn delete_definition(&self, project: &str, definition_id: i32) -> Result<()>;
}

/// Decode a definition response body
pub fn decode_definition(value: Value) -> Result<BuildDefinition> {
    serde_json::from_value(value).context("Failed to decode build definition")
}

#[async_trait]
impl BuildClient for AzdoClient {
    async fn create_definition(
        &self,
        project: &str,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let url = self.build_definitions_url(project);
        let body = serde_json::to_value(definition).context("Failed to encode build definition")?;
        let response = self.post(&url, &body).await?;
        decode_definition(response)
    }

    async fn get_definition(&self, project: &str, definition_id: i32) -> Result<BuildDefinition> {
        let url = self.build_definition_url(project, definition_id);
        let response = self.get(&url).await?;
        decode_definition(response)
    }

    async fn update_definition(
        &self,
        project: &str,
        definition_id: i32,
        definition: &BuildDefinition,
    ) -> Result<BuildDefinition> {
        let url = self.build_definition_url(project, definition_id);
        let body = serde_json::to_value(definition).context("Failed to encode build definition")?;
        let response = self.put(&url, &body).await?;
        decode_definition(response)
    }

    async fn delete_definition(&self, project: &str, definition_id: i32) -> Result<()> {
        let url = self.build_definition_url(project, definition_id);
        self.delete(&url).await?;
        Ok(())
    }
}

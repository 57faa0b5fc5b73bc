//! Resource Data
//!
//! Typed view of the build definition resource state. A raw attribute
//! document is validated against the schema and then decoded in one step;
//! everything after that works on plain struct fields.

use super::error::{ResourceError, ResourceResult};
use super::schema::{
    build_definition_schema, DEFAULT_AGENT_POOL_NAME, DEFAULT_BRANCH_NAME, DEFAULT_PATH,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_agent_pool_name() -> String {
    DEFAULT_AGENT_POOL_NAME.to_string()
}

fn default_branch_name() -> String {
    DEFAULT_BRANCH_NAME.to_string()
}

/// The `repository` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub yml_path: String,
    pub repo_name: String,
    pub repo_type: String,
    #[serde(default = "default_branch_name")]
    pub branch_name: String,
    #[serde(default)]
    pub service_connection_id: String,
}

impl RepositoryConfig {
    pub fn new(repo_type: &str, repo_name: &str, yml_path: &str) -> Self {
        Self {
            yml_path: yml_path.to_string(),
            repo_name: repo_name.to_string(),
            repo_type: repo_type.to_string(),
            branch_name: default_branch_name(),
            service_connection_id: String::new(),
        }
    }
}

/// Desired state of a build definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDefinitionConfig {
    pub project_id: String,
    #[serde(default)]
    pub revision: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub variable_groups: BTreeSet<i32>,
    #[serde(default = "default_agent_pool_name")]
    pub agent_pool_name: String,
    pub repository: Vec<RepositoryConfig>,
}

impl Default for BuildDefinitionConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            revision: 0,
            name: String::new(),
            path: default_path(),
            variable_groups: BTreeSet::new(),
            agent_pool_name: default_agent_pool_name(),
            repository: Vec::new(),
        }
    }
}

/// Resource identity plus attributes, as held by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    #[serde(default)]
    id: String,
    #[serde(flatten)]
    pub config: BuildDefinitionConfig,
}

impl ResourceData {
    pub fn new(config: BuildDefinitionConfig) -> Self {
        Self {
            id: String::new(),
            config,
        }
    }

    /// Resource data holding nothing but an identity, as seen by import
    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            config: BuildDefinitionConfig::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Whether the resource has no server-side counterpart yet
    pub fn is_absent(&self) -> bool {
        self.id.is_empty()
    }

    /// Validate a raw attribute document and decode it
    pub fn from_value(mut value: Value) -> ResourceResult<Self> {
        let diagnostics = build_definition_schema().validate(&value);
        if !diagnostics.is_empty() {
            let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
            return Err(ResourceError::invalid_input(messages.join("; ")));
        }

        strip_nulls(&mut value);

        serde_json::from_value(value).map_err(|e| {
            ResourceError::invalid_input(format!("failed to decode resource data: {}", e))
        })
    }

    pub fn to_value(&self) -> Value {
        // Plain structs with string keys always serialize
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Drop null members at every depth so serde defaults apply to them
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

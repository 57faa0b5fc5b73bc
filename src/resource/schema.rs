//! Resource Schema
//!
//! Declares the attributes of the build definition resource: their types,
//! required/optional/computed markers, defaults and validation rules. The
//! schema also runs the generic validation pass over a raw attribute
//! document before it is decoded into [`super::ResourceData`].

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// Resource type name as registered with the host
pub const RESOURCE_TYPE: &str = "azuredevops_build_definition";

pub const DEFAULT_PATH: &str = "\\";
pub const DEFAULT_AGENT_POOL_NAME: &str = "Hosted Ubuntu 1604";
pub const DEFAULT_BRANCH_NAME: &str = "master";

/// Accepted `repo_type` values
pub const REPO_TYPES: &[&str] = &["GitHub", "TfsGit"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Set(Box<AttributeType>),
    /// Nested block with its own attributes
    Block(Vec<Attribute>),
}

/// Per-value validation rule. On a set attribute the rule applies to each element.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum Validation {
    IntAtLeast {
        min: i64,
    },
    StringInSlice {
        values: &'static [&'static str],
        ignore_case: bool,
    },
    /// Backslash-separated definition folder path
    Path,
}

impl Validation {
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Validation::IntAtLeast { min } => match value.as_i64() {
                Some(n) if n >= *min => Ok(()),
                Some(n) => Err(format!("expected to be at least (>= {}), got {}", min, n)),
                None => Err("expected an integer".to_string()),
            },
            Validation::StringInSlice {
                values,
                ignore_case,
            } => {
                let Some(s) = value.as_str() else {
                    return Err("expected a string".to_string());
                };
                let found = values.iter().any(|candidate| {
                    if *ignore_case {
                        candidate.eq_ignore_ascii_case(s)
                    } else {
                        *candidate == s
                    }
                });
                if found {
                    Ok(())
                } else {
                    Err(format!(
                        "expected to be one of [{}], got {}",
                        values.join(" "),
                        s
                    ))
                }
            }
            Validation::Path => match value.as_str() {
                Some(s) => validate_path(s),
                None => Err("expected a string".to_string()),
            },
        }
    }
}

/// Check a definition folder path such as `\` or `\team\nightly`
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path cannot be empty".to_string());
    }
    if !path.starts_with('\\') {
        return Err("path must start with a backslash".to_string());
    }
    if path.len() > 1 && path.ends_with('\\') {
        return Err("path cannot end with a backslash".to_string());
    }
    if path.contains("\\\\") {
        return Err("path cannot contain empty segments".to_string());
    }
    Ok(())
}

/// One attribute of a resource or nested block
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing the value forces a new resource
    pub force_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    pub description: &'static str,
}

impl Attribute {
    fn new(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            name,
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            default: None,
            min_items: None,
            max_items: None,
            validation: None,
            description: "",
        }
    }

    pub fn required(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(name, attr_type)
        }
    }

    pub fn optional(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, attr_type)
        }
    }

    pub fn computed(name: &'static str, attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, attr_type)
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_items(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_items = min;
        self.max_items = max;
        self
    }

    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// A validation failure tied to an attribute path such as `repository.0.repo_type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub attribute: String,
    pub message: String,
}

impl Diagnostic {
    fn new(attribute: &str, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.attribute, self.message)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub version: u32,
    pub attributes: Vec<Attribute>,
}

impl ResourceSchema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validate a raw attribute document, collecting every diagnostic
    pub fn validate(&self, value: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        validate_attributes(&self.attributes, value, "", &mut diagnostics);
        diagnostics
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn validate_attributes(
    attributes: &[Attribute],
    value: &Value,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(object) = value.as_object() else {
        let at = if prefix.is_empty() { "<root>" } else { prefix };
        diagnostics.push(Diagnostic::new(at, "expected an object"));
        return;
    };

    for key in object.keys() {
        if !attributes.iter().any(|a| a.name == key) {
            diagnostics.push(Diagnostic::new(
                &join_path(prefix, key),
                "unsupported attribute",
            ));
        }
    }

    for attribute in attributes {
        let path = join_path(prefix, attribute.name);
        match object.get(attribute.name).filter(|v| !v.is_null()) {
            None if attribute.required => {
                diagnostics.push(Diagnostic::new(&path, "required attribute is missing"));
            }
            None => {}
            Some(v) => check_value(attribute, &attribute.attr_type, v, &path, diagnostics),
        }
    }
}

fn check_value(
    attribute: &Attribute,
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String | AttributeType::Int => {
            let well_typed = match attr_type {
                AttributeType::String => value.is_string(),
                _ => value
                    .as_i64()
                    .is_some_and(|n| i32::try_from(n).is_ok()),
            };
            if !well_typed {
                let expected = match attr_type {
                    AttributeType::String => "expected a string",
                    _ => "expected a 32-bit integer",
                };
                diagnostics.push(Diagnostic::new(path, expected));
                return;
            }
            if let Some(rule) = &attribute.validation {
                if let Err(message) = rule.check(value) {
                    diagnostics.push(Diagnostic::new(path, message));
                }
            }
        }
        AttributeType::Set(element) => {
            let Some(items) = value.as_array() else {
                diagnostics.push(Diagnostic::new(path, "expected a set"));
                return;
            };
            if let Some(min) = attribute.min_items {
                if items.len() < min {
                    diagnostics.push(Diagnostic::new(
                        path,
                        format!("expected at least {} item(s), got {}", min, items.len()),
                    ));
                }
            }
            if let Some(max) = attribute.max_items {
                if items.len() > max {
                    diagnostics.push(Diagnostic::new(
                        path,
                        format!("expected at most {} item(s), got {}", max, items.len()),
                    ));
                }
            }
            for (index, item) in items.iter().enumerate() {
                let item_path = join_path(path, &index.to_string());
                check_value(attribute, element, item, &item_path, diagnostics);
            }
        }
        AttributeType::Block(attributes) => {
            validate_attributes(attributes, value, path, diagnostics);
        }
    }
}

static SCHEMA: OnceLock<ResourceSchema> = OnceLock::new();

/// Schema of the build definition resource
pub fn build_definition_schema() -> &'static ResourceSchema {
    SCHEMA.get_or_init(|| {
        let repository = vec![
            Attribute::required("yml_path", AttributeType::String)
                .with_description("Relative path of YAML file describing the definition"),
            Attribute::required("repo_name", AttributeType::String)
                .with_description("Name of the repository hosting the YAML"),
            Attribute::required("repo_type", AttributeType::String)
                .with_validation(Validation::StringInSlice {
                    values: REPO_TYPES,
                    ignore_case: false,
                })
                .with_description("Type of repository hosting the YAML"),
            Attribute::optional("branch_name", AttributeType::String)
                .with_default(DEFAULT_BRANCH_NAME)
                .with_description("Name of branch to look for YAML in"),
            Attribute::optional("service_connection_id", AttributeType::String)
                .with_default("")
                .with_description("Service connection that grants access to the repo hosting the YAML"),
        ];

        ResourceSchema {
            type_name: RESOURCE_TYPE,
            version: 0,
            attributes: vec![
                Attribute::computed("id", AttributeType::String)
                    .with_description("ID of the definition, assigned by the service"),
                Attribute::required("project_id", AttributeType::String)
                    .force_new()
                    .with_description("The ID of the project in which to create the definition"),
                Attribute::computed("revision", AttributeType::Int)
                    .with_description("Revision number of the definition"),
                Attribute::optional("name", AttributeType::String)
                    .with_default("")
                    .with_description("Name of the definition"),
                Attribute::optional("path", AttributeType::String)
                    .with_default(DEFAULT_PATH)
                    .with_validation(Validation::Path)
                    .with_description("Path of the definition"),
                Attribute::optional("variable_groups", AttributeType::Set(Box::new(AttributeType::Int)))
                    .with_validation(Validation::IntAtLeast { min: 1 })
                    .with_description("Variable groups linked to the definition"),
                Attribute::optional("agent_pool_name", AttributeType::String)
                    .with_default(DEFAULT_AGENT_POOL_NAME)
                    .with_description("Agent pool in which to run the definition"),
                Attribute::required(
                    "repository",
                    AttributeType::Set(Box::new(AttributeType::Block(repository))),
                )
                .with_items(Some(1), Some(1))
                .with_description("Repository in which the YAML based definition exists"),
            ],
        }
    })
}

//! Build definition resource
//!
//! This module turns a declarative description of a build definition into
//! Azure DevOps API calls and back.
//!
//! # Architecture
//!
//! - [`schema`] - Attribute declarations, defaults and validation rules
//! - [`data`] - Typed resource state decoded from a validated document
//! - [`build_definition`] - Expand/flatten mapping and the lifecycle operations
//! - [`ids`] - Resource and import identifier parsing
//! - [`error`] - [`ResourceError`], the error type of every lifecycle operation
//!
//! # Example
//!
//! ```ignore
//! use azdo_build_definition::resource::{self, ResourceData};
//!
//! async fn apply(client: &AzdoClient, doc: serde_json::Value) -> anyhow::Result<()> {
//!     let mut d = ResourceData::from_value(doc)?;
//!     resource::create(&mut d, client).await?;
//!     println!("created definition {}", d.id());
//!     Ok(())
//! }
//! ```

pub mod build_definition;
pub mod data;
pub mod error;
pub mod ids;
pub mod schema;

pub use build_definition::{create, delete, expand, flatten, import, read, update};
pub use data::{BuildDefinitionConfig, RepositoryConfig, ResourceData};
pub use error::{ResourceError, ResourceResult};
pub use schema::{build_definition_schema, ResourceSchema};

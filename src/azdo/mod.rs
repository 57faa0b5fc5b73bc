//! Azure DevOps API interaction module
//!
//! This module provides the core functionality for talking to the Azure DevOps
//! REST API: personal access token authentication, the HTTP client, and typed
//! models for the build definition and project endpoints.
//!
//! # Module Structure
//!
//! - [`auth`] - Personal access token credentials
//! - [`client`] - Main Azure DevOps client and URL builders
//! - [`http`] - HTTP utilities for REST API calls
//! - [`build`] - Build definition models and the [`build::BuildClient`] trait
//! - [`projects`] - Project lookup and the [`projects::ProjectClient`] trait
//!
//! # Example
//!
//! ```ignore
//! use azdo_build_definition::azdo::{build::BuildClient, client::AzdoClient};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = AzdoClient::new("https://dev.azure.com/my-org", "my-pat")?;
//!     let definition = client.get_definition("my-project", 42).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod build;
pub mod client;
pub mod http;
pub mod projects;

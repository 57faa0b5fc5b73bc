//! Manage Azure DevOps build definitions as declarative resources.
//!
//! - [`azdo`] - REST client for the Azure DevOps build and project APIs
//! - [`resource`] - Schema, mapping and lifecycle of the build definition resource
//! - [`config`] - Organization URL and token resolution

pub mod azdo;
pub mod config;
pub mod resource;

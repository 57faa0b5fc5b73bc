//! Identifier parsing for resource data and import strings

use super::data::ResourceData;
use super::error::{ResourceError, ResourceResult};
use crate::azdo::projects::ProjectClient;
use uuid::Uuid;

/// Delimiter between project and resource ID in import identifiers
pub const IMPORT_ID_DELIMITER: char = '/';

/// Project ID and numeric definition ID of materialized resource data
pub fn parse_project_id_and_resource_id(d: &ResourceData) -> ResourceResult<(String, i32)> {
    let project_id = d.config.project_id.trim();
    if project_id.is_empty() {
        return Err(ResourceError::invalid_input("project_id is not set"));
    }

    let resource_id = d.id().parse::<i32>().map_err(|_| {
        ResourceError::invalid_input(format!(
            "resource ID '{}' is not a numeric definition ID",
            d.id()
        ))
    })?;

    Ok((project_id.to_string(), resource_id))
}

/// Split `<project>/<id>` and resolve the project part to a project ID.
///
/// A project given as a UUID is taken as is; anything else is looked up by name.
pub async fn parse_imported_project_id_and_id<C>(
    client: &C,
    import_id: &str,
) -> ResourceResult<(String, i32)>
where
    C: ProjectClient + ?Sized,
{
    let parts: Vec<&str> = import_id.split(IMPORT_ID_DELIMITER).collect();
    let [project, resource_id] = parts.as_slice() else {
        return Err(ResourceError::invalid_input(format!(
            "unexpected format of ID ({}), expected projectid/resourceId",
            import_id
        )));
    };

    if project.is_empty() || resource_id.is_empty() {
        return Err(ResourceError::invalid_input(format!(
            "unexpected format of ID ({}), expected projectid/resourceId",
            import_id
        )));
    }

    let resource_id = resource_id.parse::<i32>().map_err(|_| {
        ResourceError::invalid_input(format!(
            "{} is not a valid resource ID, expected an integer",
            resource_id
        ))
    })?;

    if Uuid::parse_str(project).is_ok() {
        return Ok((project.to_string(), resource_id));
    }

    tracing::debug!("Resolving project name '{}' to an ID", project);
    let resolved = client
        .get_project(project)
        .await
        .map_err(|e| ResourceError::remote("error looking up project", e))?;

    Ok((resolved.id, resource_id))
}

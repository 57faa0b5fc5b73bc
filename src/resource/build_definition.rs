//! Build Definition Resource
//!
//! Maps [`ResourceData`] to and from the service's [`BuildDefinition`] and
//! implements the resource lifecycle. Every operation makes a single remote
//! call, except create which re-reads the definition after creating it.

use super::data::{BuildDefinitionConfig, RepositoryConfig, ResourceData};
use super::error::{ResourceError, ResourceResult};
use super::ids::{parse_imported_project_id_and_id, parse_project_id_and_resource_id};
use crate::azdo::build::{
    AgentPoolQueue, BuildClient, BuildDefinition, BuildRepository, DefinitionQuality,
    DefinitionQueueStatus, DefinitionType, Process, TaskAgentPoolReference,
    VariableGroupReference, YamlProcess, CONNECTED_SERVICE_ID_PROPERTY,
};
use crate::azdo::projects::ProjectClient;
use std::collections::BTreeMap;

const CREATE_CONTEXT: &str = "error creating build definition";
const READ_CONTEXT: &str = "error reading build definition";
const UPDATE_CONTEXT: &str = "error updating build definition";
const DELETE_CONTEXT: &str = "error deleting build definition";

/// Remote URL for a repository. Only GitHub URLs can be derived; other
/// repository types resolve through their service connection.
pub fn repository_url(repo_type: &str, repo_name: &str) -> String {
    if repo_type.eq_ignore_ascii_case("github") {
        format!("https://github.com/{}.git", repo_name)
    } else {
        String::new()
    }
}

/// Build the service object for `d`. Returns it with the project ID.
pub fn expand(d: &ResourceData) -> ResourceResult<(BuildDefinition, String)> {
    let config = &d.config;

    let repository = match config.repository.as_slice() {
        [repository] => repository,
        other => {
            return Err(ResourceError::invalid_input(format!(
                "expected exactly one repository block, found {}",
                other.len()
            )))
        }
    };

    // Absent during create
    let definition_id = d.id().parse::<i32>().ok();

    let variable_groups = config
        .variable_groups
        .iter()
        .map(|id| VariableGroupReference { id: *id, name: None })
        .collect();

    let properties = BTreeMap::from([(
        CONNECTED_SERVICE_ID_PROPERTY.to_string(),
        repository.service_connection_id.clone(),
    )]);

    // Queue and pool share one name; the queue has no separately settable display name
    let pool_name = config.agent_pool_name.clone();

    let definition = BuildDefinition {
        id: definition_id,
        name: Some(config.name.clone()),
        path: Some(config.path.clone()),
        revision: Some(config.revision),
        repository: Some(BuildRepository {
            id: Some(repository.repo_name.clone()),
            name: Some(repository.repo_name.clone()),
            url: Some(repository_url(&repository.repo_type, &repository.repo_name)),
            repository_type: Some(repository.repo_type.clone()),
            default_branch: Some(repository.branch_name.clone()),
            properties: Some(properties),
        }),
        process: Some(Process::Yaml(YamlProcess::new(&repository.yml_path))),
        queue: Some(AgentPoolQueue {
            id: None,
            name: Some(pool_name.clone()),
            pool: Some(TaskAgentPoolReference {
                id: None,
                name: Some(pool_name),
            }),
        }),
        queue_status: Some(DefinitionQueueStatus::Enabled),
        definition_type: Some(DefinitionType::Build),
        quality: Some(DefinitionQuality::Definition),
        variable_groups: Some(variable_groups),
    };

    Ok((definition, config.project_id.trim().to_string()))
}

/// Write the service object back into `d`. `d` is left untouched on error.
pub fn flatten(
    d: &mut ResourceData,
    definition: &BuildDefinition,
    project_id: &str,
) -> ResourceResult<()> {
    let id = definition
        .id
        .ok_or_else(|| ResourceError::MalformedResponse("build definition has no ID".to_string()))?;

    let repository = definition.repository.as_ref().ok_or_else(|| {
        ResourceError::MalformedResponse(format!("build definition {} has no repository", id))
    })?;

    let config = BuildDefinitionConfig {
        project_id: project_id.to_string(),
        revision: definition.revision.unwrap_or(0),
        name: definition.name.clone().unwrap_or_default(),
        path: definition.path.clone().unwrap_or_default(),
        variable_groups: definition
            .variable_groups
            .iter()
            .flatten()
            .map(|group| group.id)
            .collect(),
        agent_pool_name: definition
            .queue
            .as_ref()
            .and_then(|queue| queue.pool.as_ref())
            .and_then(|pool| pool.name.clone())
            .unwrap_or_default(),
        repository: vec![flatten_repository(repository, definition.process.as_ref())],
    };

    d.set_id(id.to_string());
    d.config = config;
    Ok(())
}

fn flatten_repository(repository: &BuildRepository, process: Option<&Process>) -> RepositoryConfig {
    RepositoryConfig {
        yml_path: process
            .and_then(Process::yaml_filename)
            .unwrap_or_default()
            .to_string(),
        repo_name: repository.name.clone().unwrap_or_default(),
        repo_type: repository.repository_type.clone().unwrap_or_default(),
        branch_name: repository.default_branch.clone().unwrap_or_default(),
        service_connection_id: repository
            .properties
            .as_ref()
            .and_then(|p| p.get(CONNECTED_SERVICE_ID_PROPERTY))
            .cloned()
            .unwrap_or_default(),
    }
}

/// Create the definition, then refresh `d` from the service
pub async fn create<C>(d: &mut ResourceData, client: &C) -> ResourceResult<()>
where
    C: BuildClient + ?Sized,
{
    let (definition, project_id) = expand(d)?;
    tracing::info!(
        "Creating build definition '{}' in project {}",
        d.config.name,
        project_id
    );

    let created = client
        .create_definition(&project_id, &definition)
        .await
        .map_err(|e| ResourceError::remote(CREATE_CONTEXT, e))?;

    flatten(d, &created, &project_id)?;
    tracing::info!("Created build definition {}", d.id());

    read(d, client).await
}

pub async fn read<C>(d: &mut ResourceData, client: &C) -> ResourceResult<()>
where
    C: BuildClient + ?Sized,
{
    let (project_id, definition_id) = parse_project_id_and_resource_id(d)?;
    tracing::info!(
        "Reading build definition {} in project {}",
        definition_id,
        project_id
    );

    let definition = client
        .get_definition(&project_id, definition_id)
        .await
        .map_err(|e| ResourceError::remote(READ_CONTEXT, e))?;

    flatten(d, &definition, &project_id)
}

/// Replace the remote definition with the full desired state in `d`
pub async fn update<C>(d: &mut ResourceData, client: &C) -> ResourceResult<()>
where
    C: BuildClient + ?Sized,
{
    let (definition, project_id) = expand(d)?;
    let definition_id = definition.id.ok_or_else(|| {
        ResourceError::invalid_input(format!(
            "cannot update a build definition without a numeric ID (got '{}')",
            d.id()
        ))
    })?;
    tracing::info!(
        "Updating build definition {} in project {} (revision {})",
        definition_id,
        project_id,
        d.config.revision
    );

    let updated = client
        .update_definition(&project_id, definition_id, &definition)
        .await
        .map_err(|e| ResourceError::remote(UPDATE_CONTEXT, e))?;

    flatten(d, &updated, &project_id)
}

/// Delete the remote definition. A resource without an ID is already gone.
pub async fn delete<C>(d: &mut ResourceData, client: &C) -> ResourceResult<()>
where
    C: BuildClient + ?Sized,
{
    if d.is_absent() {
        tracing::debug!("Build definition has no ID, nothing to delete");
        return Ok(());
    }

    let (project_id, definition_id) = parse_project_id_and_resource_id(d)?;
    tracing::info!(
        "Deleting build definition {} in project {}",
        definition_id,
        project_id
    );

    client
        .delete_definition(&project_id, definition_id)
        .await
        .map_err(|e| ResourceError::remote(DELETE_CONTEXT, e))?;

    d.set_id(String::new());
    Ok(())
}

/// Seed `d` from a `<project>/<definitionID>` import ID held in `d.id()`.
/// A following [`read`] fills in the remaining attributes.
pub async fn import<C>(d: &mut ResourceData, client: &C) -> ResourceResult<()>
where
    C: ProjectClient + ?Sized,
{
    let (project_id, definition_id) = parse_imported_project_id_and_id(client, d.id()).await?;
    tracing::info!(
        "Importing build definition {} from project {}",
        definition_id,
        project_id
    );

    d.config.project_id = project_id;
    d.set_id(definition_id.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(String),
        Get(String, i32),
        Update(String, i32, BuildDefinition),
        Delete(String, i32),
    }

    /// In-memory service holding at most one definition
    #[derive(Default)]
    struct FakeBuilds {
        calls: Mutex<Vec<Call>>,
        stored: Mutex<Option<BuildDefinition>>,
        fail_with: Option<&'static str>,
    }

    impl FakeBuilds {
        fn failing(message: &'static str) -> Self {
            Self {
                fail_with: Some(message),
                ..Default::default()
            }
        }

        fn with_stored(definition: BuildDefinition) -> Self {
            Self {
                stored: Mutex::new(Some(definition)),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn check(&self) -> anyhow::Result<()> {
            match self.fail_with {
                Some(message) => Err(anyhow::anyhow!(message)),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl BuildClient for FakeBuilds {
        async fn create_definition(
            &self,
            project: &str,
            definition: &BuildDefinition,
        ) -> anyhow::Result<BuildDefinition> {
            self.calls.lock().unwrap().push(Call::Create(project.to_string()));
            self.check()?;
            let mut created = definition.clone();
            created.id = Some(100);
            created.revision = Some(1);
            *self.stored.lock().unwrap() = Some(created.clone());
            Ok(created)
        }

        async fn get_definition(
            &self,
            project: &str,
            definition_id: i32,
        ) -> anyhow::Result<BuildDefinition> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Get(project.to_string(), definition_id));
            self.check()?;
            self.stored
                .lock()
                .unwrap()
                .clone()
                .filter(|d| d.id == Some(definition_id))
                .ok_or_else(|| anyhow::anyhow!("API request failed: 404 Not Found"))
        }

        async fn update_definition(
            &self,
            project: &str,
            definition_id: i32,
            definition: &BuildDefinition,
        ) -> anyhow::Result<BuildDefinition> {
            self.calls.lock().unwrap().push(Call::Update(
                project.to_string(),
                definition_id,
                definition.clone(),
            ));
            self.check()?;
            let mut updated = definition.clone();
            updated.revision = Some(definition.revision.unwrap_or(0) + 1);
            *self.stored.lock().unwrap() = Some(updated.clone());
            Ok(updated)
        }

        async fn delete_definition(&self, project: &str, definition_id: i32) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Delete(project.to_string(), definition_id));
            self.check()?;
            *self.stored.lock().unwrap() = None;
            Ok(())
        }
    }

    fn github_data() -> ResourceData {
        ResourceData::new(BuildDefinitionConfig {
            project_id: "proj".to_string(),
            name: "ci".to_string(),
            variable_groups: BTreeSet::from([1, 2]),
            repository: vec![RepositoryConfig::new("GitHub", "org/repo", "ci.yml")],
            ..Default::default()
        })
    }

    fn stored_definition(id: i32, process: Process) -> BuildDefinition {
        BuildDefinition {
            id: Some(id),
            name: Some("ci".to_string()),
            path: Some("\\".to_string()),
            revision: None,
            repository: Some(BuildRepository {
                name: Some("repo".to_string()),
                repository_type: Some("TfsGit".to_string()),
                default_branch: Some("main".to_string()),
                ..Default::default()
            }),
            process: Some(process),
            queue: Some(AgentPoolQueue {
                id: Some(5),
                name: Some("Default".to_string()),
                pool: Some(TaskAgentPoolReference {
                    id: Some(1),
                    name: Some("Default".to_string()),
                }),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_repository_url() {
        assert_eq!(repository_url("GitHub", "org/repo"), "https://github.com/org/repo.git");
        assert_eq!(repository_url("github", "org/repo"), "https://github.com/org/repo.git");
        assert_eq!(repository_url("GITHUB", "a/b"), "https://github.com/a/b.git");
        assert_eq!(repository_url("TfsGit", "repo"), "");
    }

    #[test]
    fn test_expand_github_scenario() {
        let (definition, project_id) = expand(&github_data()).unwrap();
        assert_eq!(project_id, "proj");
        assert_eq!(definition.id, None);

        let repository = definition.repository.unwrap();
        assert_eq!(repository.url.as_deref(), Some("https://github.com/org/repo.git"));
        assert_eq!(repository.default_branch.as_deref(), Some("master"));
        assert_eq!(repository.id.as_deref(), Some("org/repo"));
        assert_eq!(repository.name.as_deref(), Some("org/repo"));
        assert_eq!(
            repository.properties.unwrap().get("connectedServiceId").map(String::as_str),
            Some("")
        );
        assert_eq!(definition.process.unwrap().yaml_filename(), Some("ci.yml"));
    }

    #[test]
    fn test_expand_fixed_fields() {
        let (definition, _) = expand(&github_data()).unwrap();
        let queue = definition.queue.unwrap();
        assert_eq!(queue.name.as_deref(), Some("Hosted Ubuntu 1604"));
        assert_eq!(queue.pool.unwrap().name.as_deref(), Some("Hosted Ubuntu 1604"));
        assert_eq!(definition.queue_status, Some(DefinitionQueueStatus::Enabled));
        assert_eq!(definition.definition_type, Some(DefinitionType::Build));
        assert_eq!(definition.quality, Some(DefinitionQuality::Definition));
        assert_eq!(definition.revision, Some(0));
        assert_eq!(
            definition.variable_groups.unwrap(),
            vec![
                VariableGroupReference { id: 1, name: None },
                VariableGroupReference { id: 2, name: None },
            ]
        );
    }

    #[test]
    fn test_expand_carries_numeric_id() {
        let mut d = github_data();
        d.set_id("55");
        assert_eq!(expand(&d).unwrap().0.id, Some(55));

        d.set_id("not-a-number");
        assert_eq!(expand(&d).unwrap().0.id, None);
    }

    #[test]
    fn test_expand_requires_exactly_one_repository() {
        let mut d = github_data();
        d.config.repository.clear();
        assert!(matches!(expand(&d), Err(ResourceError::InvalidInput(_))));

        let repo = RepositoryConfig::new("TfsGit", "repo", "ci.yml");
        d.config.repository = vec![repo.clone(), repo];
        assert!(matches!(expand(&d), Err(ResourceError::InvalidInput(_))));
    }

    #[test]
    fn test_expand_tfs_git_leaves_url_empty() {
        let mut d = github_data();
        d.config.repository = vec![RepositoryConfig::new("TfsGit", "repo", "ci.yml")];
        let (definition, _) = expand(&d).unwrap();
        assert_eq!(definition.repository.unwrap().url.as_deref(), Some(""));
    }

    #[test]
    fn test_flatten_generic_and_typed_process() {
        let mut map = Map::new();
        map.insert("yamlFilename".to_string(), json!("azure-pipelines.yml"));

        for process in [
            Process::Generic(map),
            Process::Yaml(YamlProcess::new("azure-pipelines.yml")),
        ] {
            let mut d = ResourceData::default();
            flatten(&mut d, &stored_definition(3, process), "proj").unwrap();
            assert_eq!(d.config.repository[0].yml_path, "azure-pipelines.yml");
        }
    }

    #[test]
    fn test_flatten_missing_revision_is_zero() {
        let mut d = ResourceData::default();
        d.config.revision = 9;
        flatten(
            &mut d,
            &stored_definition(3, Process::Yaml(YamlProcess::new("ci.yml"))),
            "proj",
        )
        .unwrap();
        assert_eq!(d.config.revision, 0);
        assert_eq!(d.id(), "3");
        assert_eq!(d.config.project_id, "proj");
        assert_eq!(d.config.agent_pool_name, "Default");
        assert_eq!(d.config.repository[0].branch_name, "main");
        assert!(d.config.variable_groups.is_empty());
    }

    #[test]
    fn test_flatten_rejects_definition_without_id() {
        let mut d = github_data();
        let before = d.clone();
        let mut definition = stored_definition(3, Process::Yaml(YamlProcess::new("ci.yml")));
        definition.id = None;
        assert!(matches!(
            flatten(&mut d, &definition, "proj"),
            Err(ResourceError::MalformedResponse(_))
        ));
        assert_eq!(d, before);
    }

    #[test]
    fn test_expand_then_flatten_preserves_attributes() {
        let mut d = github_data();
        d.config.path = "\\team".to_string();
        d.config.repository[0].branch_name = "develop".to_string();
        d.config.repository[0].service_connection_id = "conn-1".to_string();

        let (mut definition, project_id) = expand(&d).unwrap();
        definition.id = Some(8);

        let mut flattened = ResourceData::default();
        flatten(&mut flattened, &definition, &project_id).unwrap();

        assert_eq!(flattened.config.name, d.config.name);
        assert_eq!(flattened.config.path, d.config.path);
        assert_eq!(flattened.config.repository, d.config.repository);
        assert_eq!(flattened.config.variable_groups, d.config.variable_groups);
        assert_eq!(flattened.config.agent_pool_name, d.config.agent_pool_name);
    }

    #[tokio::test]
    async fn test_create_flattens_then_reads() {
        let client = FakeBuilds::default();
        let mut d = github_data();

        create(&mut d, &client).await.unwrap();

        assert_eq!(d.id(), "100");
        assert_eq!(d.config.revision, 1);
        assert_eq!(
            client.calls(),
            vec![Call::Create("proj".to_string()), Call::Get("proj".to_string(), 100)]
        );
    }

    #[tokio::test]
    async fn test_create_and_read_target_same_trimmed_project() {
        let client = FakeBuilds::default();
        let mut d = github_data();
        d.config.project_id = " proj ".to_string();

        create(&mut d, &client).await.unwrap();

        assert_eq!(d.config.project_id, "proj");
        assert_eq!(
            client.calls(),
            vec![Call::Create("proj".to_string()), Call::Get("proj".to_string(), 100)]
        );
    }

    #[tokio::test]
    async fn test_create_wraps_remote_error() {
        let client = FakeBuilds::failing("API request failed: 400 Bad Request");
        let mut d = github_data();

        let err = create(&mut d, &client).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "error creating build definition: API request failed: 400 Bad Request"
        );
        assert!(d.is_absent());
    }

    #[tokio::test]
    async fn test_create_without_repository_makes_no_call() {
        let client = FakeBuilds::default();
        let mut d = github_data();
        d.config.repository.clear();

        assert!(matches!(
            create(&mut d, &client).await,
            Err(ResourceError::InvalidInput(_))
        ));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_unparseable_id_is_invalid_input() {
        let client = FakeBuilds::default();
        let mut d = github_data();
        d.set_id("abc");

        assert!(matches!(
            read(&mut d, &client).await,
            Err(ResourceError::InvalidInput(_))
        ));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_definition_is_hard_failure() {
        let client = FakeBuilds::default();
        let mut d = github_data();
        d.set_id("77");

        let err = read(&mut d, &client).await.unwrap_err();
        assert!(matches!(err, ResourceError::RemoteApi { .. }));
        assert!(err.to_string().starts_with("error reading build definition"));
    }

    #[tokio::test]
    async fn test_update_resends_full_object() {
        let client = FakeBuilds::default();
        let mut d = github_data();
        create(&mut d, &client).await.unwrap();

        d.config.variable_groups = BTreeSet::from([3]);
        update(&mut d, &client).await.unwrap();

        let Some(Call::Update(project, id, sent)) = client.calls().pop() else {
            panic!("expected an update call");
        };
        assert_eq!(project, "proj");
        assert_eq!(id, 100);
        assert_eq!(sent.name.as_deref(), Some("ci"));
        assert_eq!(sent.path.as_deref(), Some("\\"));
        assert_eq!(sent.revision, Some(1));
        assert_eq!(
            sent.repository.unwrap().url.as_deref(),
            Some("https://github.com/org/repo.git")
        );
        assert_eq!(sent.variable_groups.unwrap(), vec![VariableGroupReference { id: 3, name: None }]);

        assert_eq!(d.config.variable_groups, BTreeSet::from([3]));
        assert_eq!(d.config.revision, 2);
    }

    #[tokio::test]
    async fn test_update_without_id_is_invalid_input() {
        let client = FakeBuilds::default();
        let mut d = github_data();

        assert!(matches!(
            update(&mut d, &client).await,
            Err(ResourceError::InvalidInput(_))
        ));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let client = FakeBuilds::default();
        let mut d = github_data();

        delete(&mut d, &client).await.unwrap();
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_clears_identity() {
        let client =
            FakeBuilds::with_stored(stored_definition(4, Process::Yaml(YamlProcess::new("ci.yml"))));
        let mut d = github_data();
        d.set_id("4");

        delete(&mut d, &client).await.unwrap();
        assert!(d.is_absent());
        assert_eq!(client.calls(), vec![Call::Delete("proj".to_string(), 4)]);
    }

    #[tokio::test]
    async fn test_delete_propagates_remote_error() {
        let client = FakeBuilds::failing("API request failed: 403 Forbidden");
        let mut d = github_data();
        d.set_id("4");

        let err = delete(&mut d, &client).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "error deleting build definition: API request failed: 403 Forbidden"
        );
        assert_eq!(d.id(), "4");
    }
}

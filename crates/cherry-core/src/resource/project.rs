// # Project Controller
//
// Lifecycle of a Cherry Servers project.
//
// ## Field semantics
//
// - `name`: mutable in place; auto-generated from the logical name when empty
// - `team`: owning team; changing it replaces the project
// - `bgp`: mutable in place; compared against the observed `bgp.enabled`
//
// The remote API does not echo the owning team, so `team` in observed state
// always comes from the inputs (create, read) or the prior state (update).

use crate::config::ProviderConfig;
use crate::context::Context;
use crate::diff::{self, DiffKind, DiffRecord, DiffRule};
use crate::error::{Error, Result};
use crate::naming::autoname;
use crate::resource::{
    CheckRequest, Controller, CreateRequest, CreateResponse, DeleteRequest, DiffRequest,
    ReadRequest, ReadResponse, UpdateRequest,
};
use crate::schema::{FieldDependency, FieldSpec, ResourceSchema};
use crate::traits::{
    CreateProject, Logger, Project, ProjectClient, ProjectClientFactory, TracingLogger,
    UpdateProject,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Type token of the project resource
pub const PROJECT_TOKEN: &str = "cherry-servers:index:Project";

/// Desired project inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectArgs {
    /// Project name; generated when empty
    #[serde(default)]
    pub name: String,
    /// ID of the owning team
    pub team: i64,
    /// Whether BGP should be enabled
    #[serde(default)]
    pub bgp: bool,
}

/// Observed project BGP status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBgpState {
    pub enabled: bool,
    pub local_asn: i64,
}

/// Observed project state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    pub name: String,
    pub team: i64,
    pub bgp: ProjectBgpState,
}

impl ProjectState {
    fn from_remote(project: Project, team: i64) -> Self {
        Self {
            name: project.name,
            team,
            bgp: ProjectBgpState {
                enabled: project.bgp.enabled,
                local_asn: project.bgp.local_asn,
            },
        }
    }

    fn projected(inputs: &ProjectArgs, team: i64) -> Self {
        Self {
            name: inputs.name.clone(),
            team,
            bgp: ProjectBgpState {
                enabled: inputs.bgp,
                local_asn: 0,
            },
        }
    }
}

const DIFF_RULES: &[DiffRule<ProjectArgs, ProjectState>] = &[
    DiffRule {
        field: "name",
        kind: DiffKind::Update,
        differs: |i: &ProjectArgs, s: &ProjectState| i.name != s.name,
    },
    DiffRule {
        field: "team",
        kind: DiffKind::Replace,
        differs: |i: &ProjectArgs, s: &ProjectState| i.team != s.team,
    },
    DiffRule {
        field: "bgp",
        kind: DiffKind::Update,
        differs: |i: &ProjectArgs, s: &ProjectState| i.bgp != s.bgp.enabled,
    },
];

/// Project schema descriptor
pub static PROJECT_SCHEMA: ResourceSchema = ResourceSchema {
    token: PROJECT_TOKEN,
    description: "A Cherry Servers project.",
    inputs: &[
        FieldSpec::optional("name", "Project name."),
        FieldSpec::required("team", "ID of the team the project will belong to."),
        FieldSpec::optional("bgp", "Whether BGP should be enabled for the project.")
            .with_default("false"),
    ],
    outputs: &[
        FieldSpec::required("name", "Project name."),
        FieldSpec::required("team", "ID of the team the project belongs to."),
        FieldSpec::required("bgp", "Project BGP status."),
    ],
    dependencies: &[
        FieldDependency {
            output: "name",
            inputs: &["name"],
        },
        FieldDependency {
            output: "team",
            inputs: &["team"],
        },
        FieldDependency {
            output: "bgp",
            inputs: &["bgp"],
        },
    ],
};

/// Parse a project identifier
///
/// Projects are keyed by integers; the engine carries them as strings.
pub fn parse_project_id(id: &str) -> Result<i64> {
    id.parse::<i64>()
        .map_err(|e| Error::validation(format!("id not an int: {}", e)))
}

/// Project lifecycle controller
pub struct ProjectController {
    clients: Arc<dyn ProjectClientFactory>,
    logger: Arc<dyn Logger>,
    config: ProviderConfig,
}

impl ProjectController {
    /// Create a controller
    ///
    /// # Parameters
    ///
    /// - `clients`: Factory resolving a remote client per operation
    /// - `config`: Configuration handed to the factory
    pub fn new(clients: Arc<dyn ProjectClientFactory>, config: ProviderConfig) -> Self {
        Self {
            clients,
            logger: Arc::new(TracingLogger),
            config,
        }
    }

    /// Replace the warning sink
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    fn client(&self) -> Result<Box<dyn ProjectClient>> {
        self.clients.create(&self.config)
    }
}

#[async_trait]
impl Controller for ProjectController {
    type Inputs = ProjectArgs;
    type State = ProjectState;

    fn schema(&self) -> &'static ResourceSchema {
        &PROJECT_SCHEMA
    }

    async fn check(
        &self,
        _ctx: &Context,
        request: CheckRequest<ProjectArgs, ProjectState>,
    ) -> Result<ProjectArgs> {
        let previous = request.state.as_ref().map(|s| s.name.as_str());
        let name = autoname(&request.inputs.name, &request.name, previous)?;

        Ok(ProjectArgs {
            name,
            ..request.inputs
        })
    }

    async fn create(
        &self,
        ctx: &Context,
        request: CreateRequest<ProjectArgs>,
    ) -> Result<CreateResponse<ProjectState>> {
        let inputs = request.inputs;

        if request.dry_run {
            debug!("Dry run: skipping project creation");
            return Ok(CreateResponse {
                id: None,
                state: ProjectState::projected(&inputs, inputs.team),
            });
        }

        let name = autoname(&inputs.name, &request.name, None)?;
        let client = self.client()?;

        let (project, _) = ctx
            .guard(client.create(
                inputs.team,
                &CreateProject {
                    name,
                    bgp: inputs.bgp,
                },
            ))
            .await??;

        info!("Created project {} in team {}", project.id, inputs.team);

        Ok(CreateResponse {
            id: Some(project.id.to_string()),
            state: ProjectState::from_remote(project, inputs.team),
        })
    }

    async fn read(
        &self,
        ctx: &Context,
        request: ReadRequest<ProjectArgs>,
    ) -> Result<Option<ReadResponse<ProjectArgs, ProjectState>>> {
        let id = parse_project_id(&request.id)?;
        let client = self.client()?;

        let project = match ctx.guard(client.get(id)).await? {
            Ok((project, _)) => project,
            Err(e) if e.is_not_found() => {
                debug!("Project {} not found", id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let team = request.inputs.team;
        Ok(Some(ReadResponse {
            id: request.id,
            inputs: request.inputs,
            state: ProjectState::from_remote(project, team),
        }))
    }

    async fn update(
        &self,
        ctx: &Context,
        request: UpdateRequest<ProjectArgs, ProjectState>,
    ) -> Result<ProjectState> {
        let prior = request.state;

        if request.dry_run {
            debug!("Dry run: skipping project update");
            return Ok(ProjectState::projected(&request.inputs, prior.team));
        }

        let id = parse_project_id(&request.id)?;
        let name = autoname(&request.inputs.name, &request.name, Some(&prior.name))?;
        let client = self.client()?;

        let (project, _) = ctx
            .guard(client.update(
                id,
                &UpdateProject {
                    name: Some(name),
                    bgp: Some(request.inputs.bgp),
                },
            ))
            .await??;

        info!("Updated project {}", id);

        Ok(ProjectState::from_remote(project, prior.team))
    }

    async fn delete(&self, ctx: &Context, request: DeleteRequest<ProjectState>) -> Result<()> {
        let id = parse_project_id(&request.id)?;
        let client = self.client()?;

        match ctx.guard(client.delete(id)).await? {
            Ok(_) => {
                info!("Deleted project {}", id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                self.logger
                    .warning(format_args!("project {} already deleted", request.id));
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn diff(&self, request: &DiffRequest<ProjectArgs, ProjectState>) -> DiffRecord {
        diff::diff(DIFF_RULES, &request.inputs, &request.state, true)
    }
}

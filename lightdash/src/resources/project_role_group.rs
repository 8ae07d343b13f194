//! A group's role on a project

use crate::api::ProjectMemberRole;
use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
use crate::services::ProjectsService;
use crate::values::{self, Object};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::StringOneOf;
use tracing::{debug, info};

#[derive(Default)]
pub struct ProjectRoleGroupResource {
    provider_data: Option<LightdashProviderData>,
}

impl ProjectRoleGroupResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for ProjectRoleGroupResource {
    fn type_name(&self) -> &str {
        "lightdash_project_role_group"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Grants a group a role on a Lightdash project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description(
                        "Resource ID in the form projects/{project_uuid}/group-access/{group_uuid}",
                    )
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_uuid", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_uuid", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role", AttributeType::String)
                    .required()
                    .validator(StringOneOf::create(ProjectMemberRole::ALL))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let planned = &request.planned_state;
        let prepared = client_of(&self.provider_data).and_then(|client| {
            Ok((
                client,
                super::required_string(planned, "project_uuid")?,
                super::required_string(planned, "group_uuid")?,
                super::role_attr::<ProjectMemberRole>(planned, "role")?,
            ))
        });
        let (client, project_uuid, group_uuid, role) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match client
            .groups()
            .add_project_access(&group_uuid, &project_uuid, role)
            .await
        {
            Ok(()) => {
                info!(%project_uuid, %group_uuid, %role, "granted group project access");
                CreateResourceResponse {
                    new_state: access_state(&project_uuid, &group_uuid, role.as_str()),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to grant group project access", e));
                CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let prepared = client_of(&self.provider_data)
            .and_then(|client| access_keys(&request.current_state).map(|keys| (client, keys)));
        let (client, (project_uuid, group_uuid)) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                };
            }
        };

        let new_state = match ProjectsService::new(client)
            .find_project_group_access(&project_uuid, &group_uuid)
            .await
        {
            Ok(Some(access)) => Some(access_state(
                &access.project_uuid,
                &access.group_uuid,
                &access.role,
            )),
            Ok(None) => {
                debug!(%project_uuid, %group_uuid, "group project access no longer exists");
                None
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read group project access", e));
                Some(request.current_state)
            }
        };

        ReadResourceResponse {
            new_state,
            diagnostics,
            private: request.private,
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let prepared = client_of(&self.provider_data).and_then(|client| {
            Ok((
                client,
                access_keys(&request.prior_state)?,
                super::role_attr::<ProjectMemberRole>(&request.planned_state, "role")?,
            ))
        });
        let (client, (project_uuid, group_uuid), role) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match client
            .groups()
            .update_project_access(&group_uuid, &project_uuid, role)
            .await
        {
            Ok(()) => {
                info!(%project_uuid, %group_uuid, %role, "updated group project access");
                UpdateResourceResponse {
                    new_state: access_state(&project_uuid, &group_uuid, role.as_str()),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to update group project access", e));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let prepared = client_of(&self.provider_data)
            .and_then(|client| access_keys(&request.prior_state).map(|keys| (client, keys)));
        let (client, (project_uuid, group_uuid)) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client
            .groups()
            .remove_project_access(&group_uuid, &project_uuid)
            .await
        {
            Ok(()) => info!(%project_uuid, %group_uuid, "removed group project access"),
            Err(e) if e.is_not_found() => debug!(%group_uuid, "group project access already removed"),
            Err(e) => diagnostics.push(super::api_error("Failed to remove group project access", e)),
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for ProjectRoleGroupResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match LightdashProviderData::from_any(request.provider_data) {
            Ok(data) => self.provider_data = data,
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ProjectRoleGroupResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::PROJECT_ROLE_GROUP, &request)
    }
}

fn access_keys(state: &DynamicValue) -> Result<(String, String), Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_pair(&id, ids::PROJECT_ROLE_GROUP)
        .map_err(|e| super::missing_id("project role group", e))
}

fn access_state(project_uuid: &str, group_uuid: &str, role: &str) -> DynamicValue {
    Object::new()
        .set("id", ids::build(ids::PROJECT_ROLE_GROUP, &[project_uuid, group_uuid]))
        .set("project_uuid", project_uuid)
        .set("group_uuid", group_uuid)
        .set("role", role)
        .build()
}

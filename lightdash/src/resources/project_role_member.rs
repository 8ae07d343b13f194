//! A user's direct role on a project

use crate::api::projects::{GrantProjectAccessRequest, ProjectMember, UpdateProjectAccessRequest};
use crate::api::ProjectMemberRole;
use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
use crate::services::{MembersService, ProjectsService};
use crate::values::{self, Object};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
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
pub struct ProjectRoleMemberResource {
    provider_data: Option<LightdashProviderData>,
}

impl ProjectRoleMemberResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for ProjectRoleMemberResource {
    fn type_name(&self) -> &str {
        "lightdash_project_role_member"
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
            .description("Grants an organization member a role on a Lightdash project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource ID in the form projects/{project_uuid}/access/{user_uuid}")
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
                AttributeBuilder::new("user_uuid", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role", AttributeType::String)
                    .description("Project role of the user")
                    .required()
                    .validator(StringOneOf::create(ProjectMemberRole::ALL))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("send_email", AttributeType::Bool)
                    .description("Email the user about the new access when it is granted")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
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
                super::required_string(planned, "user_uuid")?,
                super::role_attr::<ProjectMemberRole>(planned, "role")?,
            ))
        });
        let (client, project_uuid, user_uuid, role) = match prepared {
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

        // access is granted by email, so resolve the member first
        let result = async {
            let member = MembersService::new(client).get_by_uuid(&user_uuid).await?;
            client
                .projects()
                .grant_access(
                    &project_uuid,
                    &GrantProjectAccessRequest {
                        email: member.email.clone(),
                        role,
                        send_email: values::bool_or(planned, "send_email", false),
                    },
                )
                .await?;
            Ok::<_, crate::api::ApiError>(member.email)
        }
        .await;

        match result {
            Ok(email) => {
                info!(%project_uuid, %user_uuid, %role, "granted project access");
                CreateResourceResponse {
                    new_state: member_state(&project_uuid, &user_uuid, role.as_str(), &email, planned),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to grant project access", e));
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
            .and_then(|client| member_keys(&request.current_state).map(|keys| (client, keys)));
        let (client, (project_uuid, user_uuid)) = match prepared {
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
            .find_project_member(&project_uuid, &user_uuid)
            .await
        {
            Ok(Some(member)) => Some(state_from_member(&member, &request.current_state)),
            Ok(None) => {
                debug!(%project_uuid, %user_uuid, "project access no longer exists");
                None
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read project access", e));
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
                member_keys(&request.prior_state)?,
                super::role_attr::<ProjectMemberRole>(&request.planned_state, "role")?,
            ))
        });
        let (client, (project_uuid, user_uuid), role) = match prepared {
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
            .projects()
            .update_access(&project_uuid, &user_uuid, &UpdateProjectAccessRequest { role })
            .await
        {
            Ok(()) => {
                info!(%project_uuid, %user_uuid, %role, "updated project access");
                let email = values::string(&request.prior_state, "email").unwrap_or_default();
                UpdateResourceResponse {
                    new_state: member_state(
                        &project_uuid,
                        &user_uuid,
                        role.as_str(),
                        &email,
                        &request.planned_state,
                    ),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to update project access", e));
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
            .and_then(|client| member_keys(&request.prior_state).map(|keys| (client, keys)));
        let (client, (project_uuid, user_uuid)) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.projects().revoke_access(&project_uuid, &user_uuid).await {
            Ok(()) => info!(%project_uuid, %user_uuid, "revoked project access"),
            Err(e) if e.is_not_found() => debug!(%user_uuid, "project access already revoked"),
            Err(e) => diagnostics.push(super::api_error("Failed to revoke project access", e)),
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for ProjectRoleMemberResource {
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
impl ResourceWithImportState for ProjectRoleMemberResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::PROJECT_ROLE_MEMBER, &request)
    }
}

fn member_keys(state: &DynamicValue) -> Result<(String, String), Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_pair(&id, ids::PROJECT_ROLE_MEMBER)
        .map_err(|e| super::missing_id("project role member", e))
}

fn member_state(
    project_uuid: &str,
    user_uuid: &str,
    role: &str,
    email: &str,
    prior: &DynamicValue,
) -> DynamicValue {
    Object::new()
        .set("id", ids::build(ids::PROJECT_ROLE_MEMBER, &[project_uuid, user_uuid]))
        .set("project_uuid", project_uuid)
        .set("user_uuid", user_uuid)
        .set("role", role)
        .set("send_email", values::bool_or(prior, "send_email", false))
        .set("email", email)
        .build()
}

fn state_from_member(member: &ProjectMember, prior: &DynamicValue) -> DynamicValue {
    member_state(
        &member.project_uuid,
        &member.user_uuid,
        &member.role,
        &member.email,
        prior,
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{capabilities, configured};
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::Dynamic;

    #[tokio::test(flavor = "multi_thread")]
    async fn create_resolves_email_before_granting() {
        let mut server = Server::new_async().await;
        let _member = server
            .mock("GET", "/api/v1/org/users/u1")
            .with_body(
                r#"{"status":"ok","results":{"userUuid":"u1","email":"ada@example.com","organizationUuid":"org-1","role":"member","isActive":true}}"#,
            )
            .create_async()
            .await;
        let grant = server
            .mock("POST", "/api/v1/projects/p1/access")
            .match_body(Matcher::Json(json!({
                "email": "ada@example.com",
                "role": "editor",
                "sendEmail": false
            })))
            .with_body(r#"{"status":"ok","results":null}"#)
            .create_async()
            .await;

        let resource = configured(ProjectRoleMemberResource::new(), &server.url()).await;
        let planned = Object::new()
            .set("id", Dynamic::Unknown)
            .set("project_uuid", "p1")
            .set("user_uuid", "u1")
            .set("role", "editor")
            .set("send_email", false)
            .set("email", Dynamic::Unknown)
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "lightdash_project_role_member".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            values::string(&response.new_state, "id").as_deref(),
            Some("projects/p1/access/u1")
        );
        assert_eq!(
            values::string(&response.new_state, "email").as_deref(),
            Some("ada@example.com")
        );
        grant.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_reports_role_drift_and_removal() {
        let mut server = Server::new_async().await;
        let _access = server
            .mock("GET", "/api/v1/projects/p1/access")
            .with_body(
                r#"{"status":"ok","results":[{"projectUuid":"p1","userUuid":"u1","email":"ada@example.com","role":"admin"}]}"#,
            )
            .create_async()
            .await;

        let resource = configured(ProjectRoleMemberResource::new(), &server.url()).await;
        let read = |id: &'static str| ReadResourceRequest {
            type_name: "lightdash_project_role_member".to_string(),
            current_state: Object::new().set("id", id).set("role", "editor").build(),
            private: vec![],
            provider_meta: None,
            client_capabilities: capabilities(),
        };

        let present = resource
            .read(Context::new(), read("projects/p1/access/u1"))
            .await;
        let state = present.new_state.unwrap();
        assert_eq!(values::string(&state, "role").as_deref(), Some("admin"));

        let gone = resource
            .read(Context::new(), read("projects/p1/access/u2"))
            .await;
        assert!(gone.new_state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_patches_role() {
        let mut server = Server::new_async().await;
        let patch = server
            .mock("PATCH", "/api/v1/projects/p1/access/u1")
            .match_body(Matcher::Json(json!({"role": "viewer"})))
            .with_body(r#"{"status":"ok","results":null}"#)
            .create_async()
            .await;

        let resource = configured(ProjectRoleMemberResource::new(), &server.url()).await;
        let prior = Object::new()
            .set("id", "projects/p1/access/u1")
            .set("role", "editor")
            .set("email", "ada@example.com")
            .build();
        let planned = Object::new()
            .set("id", "projects/p1/access/u1")
            .set("role", "viewer")
            .build();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "lightdash_project_role_member".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            values::string(&response.new_state, "email").as_deref(),
            Some("ada@example.com")
        );
        patch.assert_async().await;
    }
}

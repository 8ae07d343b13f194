//! Organization role of an existing member.
//!
//! Members are invited outside Terraform; this resource only manages their
//! role. Destroying it leaves the member and role in place.

use crate::api::members::OrganizationMember;
use crate::api::OrganizationMemberRole;
use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
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
pub struct OrganizationRoleMemberResource {
    provider_data: Option<LightdashProviderData>,
}

impl OrganizationRoleMemberResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn apply_role(
        &self,
        state: &DynamicValue,
    ) -> Result<OrganizationMember, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let user_uuid = super::required_string(state, "user_uuid")?;
        let role = super::role_attr::<OrganizationMemberRole>(state, "role")?;

        let member = client
            .members()
            .update_role(&user_uuid, role)
            .await
            .map_err(|e| super::api_error("Failed to set organization role", e))?;
        info!(%user_uuid, %role, "set organization role");
        Ok(member)
    }
}

#[async_trait]
impl Resource for OrganizationRoleMemberResource {
    fn type_name(&self) -> &str {
        "lightdash_organization_role_member"
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
            .description(
                "Manages the organization role of an existing Lightdash member. \
                 Destroying the resource only removes it from state.",
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource ID in the form organization-members/{user_uuid}")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
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
                    .required()
                    .validator(StringOneOf::create(OrganizationMemberRole::ALL))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("organization_uuid", AttributeType::String)
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
        match self.apply_role(&request.planned_state).await {
            Ok(member) => CreateResourceResponse {
                new_state: member_state(&member),
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let prepared = client_of(&self.provider_data)
            .and_then(|client| user_uuid(&request.current_state).map(|uuid| (client, uuid)));
        let (client, user_uuid) = match prepared {
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

        let new_state = match client.members().get(&user_uuid).await {
            Ok(member) => Some(member_state(&member)),
            Err(e) if e.is_not_found() => {
                debug!(%user_uuid, "member left the organization");
                None
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read organization member", e));
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
        match self.apply_role(&request.planned_state).await {
            Ok(member) => UpdateResourceResponse {
                new_state: member_state(&member),
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let user = values::string(&request.prior_state, "user_uuid").unwrap_or_default();
        DeleteResourceResponse {
            diagnostics: vec![Diagnostic::warning(
                "Organization role left unchanged",
                format!(
                    "Member {} was removed from Terraform state only; their organization \
                     role and membership are unchanged in Lightdash.",
                    user
                ),
            )],
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for OrganizationRoleMemberResource {
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
impl ResourceWithImportState for OrganizationRoleMemberResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::ORGANIZATION_ROLE_MEMBER, &request)
    }
}

fn user_uuid(state: &DynamicValue) -> Result<String, Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_single(&id, ids::ORGANIZATION_ROLE_MEMBER)
        .map_err(|e| super::missing_id("organization role member", e))
}

fn member_state(member: &OrganizationMember) -> DynamicValue {
    Object::new()
        .set(
            "id",
            ids::build(ids::ORGANIZATION_ROLE_MEMBER, &[&member.user_uuid]),
        )
        .set("user_uuid", member.user_uuid.as_str())
        .set("role", member.role.as_str())
        .set("email", member.email.as_str())
        .set("organization_uuid", member.organization_uuid.as_str())
        .build()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{capabilities, configured};
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const MEMBER_BODY: &str = r#"{"status":"ok","results":{"userUuid":"u1","email":"ada@example.com","organizationUuid":"org-1","role":"developer","isActive":true}}"#;

    #[tokio::test(flavor = "multi_thread")]
    async fn create_patches_member_role() {
        let mut server = Server::new_async().await;
        let patch = server
            .mock("PATCH", "/api/v1/org/users/u1")
            .match_body(Matcher::Json(json!({"role": "developer"})))
            .with_body(MEMBER_BODY)
            .create_async()
            .await;

        let resource = configured(OrganizationRoleMemberResource::new(), &server.url()).await;
        let planned = Object::new()
            .set("user_uuid", "u1")
            .set("role", "developer")
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "lightdash_organization_role_member".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            values::string(&response.new_state, "id").as_deref(),
            Some("organization-members/u1")
        );
        assert_eq!(
            values::string(&response.new_state, "organization_uuid").as_deref(),
            Some("org-1")
        );
        patch.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_reflects_remote_role() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v1/org/users/u1")
            .with_body(MEMBER_BODY)
            .create_async()
            .await;

        let resource = configured(OrganizationRoleMemberResource::new(), &server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "lightdash_organization_role_member".to_string(),
                    current_state: Object::new()
                        .set("id", "organization-members/u1")
                        .set("role", "viewer")
                        .build(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(values::string(&state, "role").as_deref(), Some("developer"));
    }

    #[tokio::test]
    async fn delete_only_warns() {
        let resource = OrganizationRoleMemberResource::new();
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "lightdash_organization_role_member".to_string(),
                    prior_state: Object::new().set("user_uuid", "u1").build(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(!response.diagnostics[0].is_error());
        assert!(response.diagnostics[0].detail.contains("u1"));
    }
}

//! Organization group resource

use crate::api::common::UserUuidRef;
use crate::api::groups::{CreateGroupRequest, GroupWithMembers, UpdateGroupRequest};
use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
use crate::values::{self, Object};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthBetween;
use tracing::{debug, info};

#[derive(Default)]
pub struct GroupResource {
    provider_data: Option<LightdashProviderData>,
}

impl GroupResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &str {
        "lightdash_group"
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
            .description("Manages a Lightdash group and, optionally, its members")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource ID in the form groups/{group_uuid}")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_uuid", AttributeType::String)
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
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the group")
                    .required()
                    .validator(StringLengthBetween::create(1, 255))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("members", AttributeType::Set(Box::new(AttributeType::String)))
                    .description("User UUIDs in the group. Leave unset to manage membership elsewhere.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
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

        let client = match client_of(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let Some(name) = values::string(&request.planned_state, "name") else {
            diagnostics.push(
                Diagnostic::error("Missing name", "The 'name' attribute is required")
                    .with_attribute(AttributePath::new("name")),
            );
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        };
        let members = values::strings(&request.planned_state, "members").unwrap_or_default();

        let create_request = CreateGroupRequest {
            name,
            members: member_refs(members),
        };
        match client.groups().create(&create_request).await {
            Ok(group) => {
                info!(group_uuid = %group.uuid, "created group");
                CreateResourceResponse {
                    new_state: group_state(&group, &request.planned_state),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to create group", e));
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
            .and_then(|client| group_uuid(&request.current_state).map(|uuid| (client, uuid)));
        let (client, group_uuid) = match prepared {
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

        let new_state = match client.groups().get(&group_uuid).await {
            Ok(group) => Some(group_state(&group, &request.current_state)),
            Err(e) if e.is_not_found() => {
                debug!(%group_uuid, "group no longer exists, removing from state");
                None
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read group", e));
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

        let prepared = client_of(&self.provider_data)
            .and_then(|client| group_uuid(&request.prior_state).map(|uuid| (client, uuid)));
        let (client, group_uuid) = match prepared {
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

        let update_request = UpdateGroupRequest {
            name: values::string(&request.planned_state, "name").unwrap_or_default(),
            members: values::strings(&request.planned_state, "members").map(member_refs),
        };
        match client.groups().update(&group_uuid, &update_request).await {
            Ok(group) => {
                info!(%group_uuid, "updated group");
                UpdateResourceResponse {
                    new_state: group_state(&group, &request.planned_state),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to update group", e));
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
            .and_then(|client| group_uuid(&request.prior_state).map(|uuid| (client, uuid)));
        let (client, group_uuid) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.groups().delete(&group_uuid).await {
            Ok(()) => info!(%group_uuid, "deleted group"),
            Err(e) if e.is_not_found() => debug!(%group_uuid, "group already deleted"),
            Err(e) => diagnostics.push(super::api_error("Failed to delete group", e)),
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for GroupResource {
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
impl ResourceWithImportState for GroupResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::GROUP, &request)
    }
}

fn group_uuid(state: &DynamicValue) -> Result<String, Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_single(&id, ids::GROUP).map_err(|e| super::missing_id("group", e))
}

fn member_refs(members: Vec<String>) -> Vec<UserUuidRef> {
    members
        .into_iter()
        .map(|user_uuid| UserUuidRef { user_uuid })
        .collect()
}

fn group_state(group: &GroupWithMembers, prior: &DynamicValue) -> DynamicValue {
    let state = Object::new()
        .set("id", ids::build(ids::GROUP, &[&group.uuid]))
        .set("group_uuid", group.uuid.as_str())
        .set("organization_uuid", group.organization_uuid.as_str())
        .set("name", group.name.as_str())
        .set("created_at", group.created_at.clone());

    if values::is_set(prior, "members") {
        let mut members = group.member_user_uuids();
        members.sort();
        state.set_strings("members", members).build()
    } else {
        state.set("members", None::<String>).build()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{capabilities, configured};
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::Dynamic;

    const GROUP_BODY: &str = r#"{"status":"ok","results":{"uuid":"g1","name":"Analysts","organizationUuid":"org-1","createdAt":"2024-01-01T00:00:00Z","members":[{"userUuid":"u2"},{"userUuid":"u1"}]}}"#;

    #[tokio::test(flavor = "multi_thread")]
    async fn create_sends_members_and_sorts_state() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api/v1/org/groups")
            .match_body(Matcher::Json(json!({
                "name": "Analysts",
                "members": [{"userUuid": "u1"}, {"userUuid": "u2"}]
            })))
            .with_body(GROUP_BODY)
            .create_async()
            .await;

        let resource = configured(GroupResource::new(), &server.url()).await;
        let planned = Object::new()
            .set("id", Dynamic::Unknown)
            .set("name", "Analysts")
            .set_strings("members", vec!["u1".to_string(), "u2".to_string()])
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "lightdash_group".to_string(),
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
            Some("groups/g1")
        );
        assert_eq!(
            values::strings(&response.new_state, "members").unwrap(),
            vec!["u1", "u2"]
        );
        create.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_without_members_only_renames() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PATCH", "/api/v1/groups/g1")
            .match_body(Matcher::Json(json!({"name": "Analysts"})))
            .with_body(GROUP_BODY)
            .create_async()
            .await;

        let resource = configured(GroupResource::new(), &server.url()).await;
        let prior = Object::new().set("id", "groups/g1").set("name", "Old").build();
        let planned = Object::new()
            .set("id", "groups/g1")
            .set("name", "Analysts")
            .build();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "lightdash_group".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(!values::is_set(&response.new_state, "members"));
        update.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_drops_deleted_group() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v1/groups/g1")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"status":"error","error":{"statusCode":404,"name":"NotFoundError","message":"Group not found"}}"#)
            .create_async()
            .await;

        let resource = configured(GroupResource::new(), &server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "lightdash_group".to_string(),
                    current_state: Object::new().set("id", "groups/g1").build(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn import_requires_group_prefix() {
        let resource = GroupResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "lightdash_group".to_string(),
                    id: "g1".to_string(),
                    client_capabilities: capabilities(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
    }
}

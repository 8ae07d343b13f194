//! Space resource: root and nested spaces with their direct access

use crate::api::spaces::Space;
use crate::api::SpaceMemberRole;
use crate::controllers::{ControllerError, DesiredSpace, SpaceController};
use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
use crate::services::DirectAccess;
use crate::values::{self, Object};
use async_trait::async_trait;
use std::collections::BTreeMap;
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
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthBetween;
use tracing::debug;

#[derive(Default)]
pub struct SpaceResource {
    provider_data: Option<LightdashProviderData>,
}

impl SpaceResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn access_type(key: &str) -> AttributeType {
    AttributeType::Set(Box::new(AttributeType::object([
        (key, AttributeType::String),
        ("space_role", AttributeType::String),
    ])))
}

#[async_trait]
impl Resource for SpaceResource {
    fn type_name(&self) -> &str {
        "lightdash_space"
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
                "Manages a Lightdash space. Root spaces carry privacy and direct access; \
                 nested spaces inherit both from their parent.",
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource ID in the form projects/{project_uuid}/spaces/{space_uuid}")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_uuid", AttributeType::String)
                    .description("Project the space belongs to")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("space_uuid", AttributeType::String)
                    .description("UUID of the space")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("organization_uuid", AttributeType::String)
                    .description("Organization owning the space")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Name of the space")
                    .required()
                    .validator(StringLengthBetween::create(1, 255))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_private", AttributeType::Bool)
                    .description("Whether the root space is private. Not allowed on nested spaces.")
                    .optional()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("parent_space_uuid", AttributeType::String)
                    .description("Parent space; omit for a root space")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("deletion_protection", AttributeType::Bool)
                    .description("Refuse to delete the space while set")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("access", access_type("user_uuid"))
                    .description("Direct user access on a root space")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_access", access_type("group_uuid"))
                    .description("Direct group access on a root space")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("last_updated", AttributeType::String)
                    .description("Time of the last change made by Terraform")
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let config = &request.config;
        let mut diagnostics = vec![];

        if values::is_set(config, "parent_space_uuid") {
            for attr in ["access", "group_access", "is_private"] {
                if values::is_set(config, attr) {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} is not allowed on nested spaces", attr),
                            "Nested spaces inherit privacy and access from their parent space; \
                             remove the attribute or drop parent_space_uuid",
                        )
                        .with_attribute(AttributePath::new(attr)),
                    );
                }
            }
        }

        if let Err(mut errors) = access_map(config, "access", "user_uuid") {
            diagnostics.append(&mut errors);
        }
        if let Err(mut errors) = access_map(config, "group_access", "group_uuid") {
            diagnostics.append(&mut errors);
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
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

        let desired = match desired_space(&request.planned_state) {
            Ok(desired) => desired,
            Err(mut errors) => {
                diagnostics.append(&mut errors);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match SpaceController::new(client).create(&ctx, &desired).await {
            Ok(space) => CreateResourceResponse {
                new_state: space_state(&space, &request.planned_state, values::now_rfc3339()),
                private: vec![],
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(controller_error("Failed to create space", &e));
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

        let client = match client_of(&self.provider_data) {
            Ok(client) => client,
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

        let (project_uuid, space_uuid) = match space_keys(&request.current_state) {
            Ok(keys) => keys,
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

        match client.spaces().get(&project_uuid, &space_uuid).await {
            Ok(space) => {
                let last_updated =
                    values::string(&request.current_state, "last_updated").unwrap_or_default();
                ReadResourceResponse {
                    new_state: Some(space_state(&space, &request.current_state, last_updated)),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) if e.is_not_found() => {
                debug!(%space_uuid, "space no longer exists, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read space", e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                    deferred: None,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let client = match client_of(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let prepared = space_keys(&request.prior_state)
            .map_err(|diag| vec![diag])
            .and_then(|(_, space_uuid)| {
                desired_space(&request.planned_state).map(|desired| (space_uuid, desired))
            });
        let (space_uuid, desired) = match prepared {
            Ok(prepared) => prepared,
            Err(mut errors) => {
                diagnostics.append(&mut errors);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        match SpaceController::new(client)
            .update(&ctx, &space_uuid, &desired)
            .await
        {
            Ok(space) => UpdateResourceResponse {
                new_state: space_state(&space, &request.planned_state, values::now_rfc3339()),
                private: vec![],
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(controller_error("Failed to update space", &e));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let client = match client_of(&self.provider_data) {
            Ok(client) => client,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let (project_uuid, space_uuid) = match space_keys(&request.prior_state) {
            Ok(keys) => keys,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };
        let protected = values::bool_or(&request.prior_state, "deletion_protection", false);

        if let Err(e) = SpaceController::new(client)
            .delete(&ctx, &project_uuid, &space_uuid, protected)
            .await
        {
            diagnostics.push(controller_error("Failed to delete space", &e));
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for SpaceResource {
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
impl ResourceWithImportState for SpaceResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::SPACE, &request)
    }
}

fn space_keys(state: &DynamicValue) -> Result<(String, String), Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_pair(&id, ids::SPACE).map_err(|e| super::missing_id("space", e))
}

/// Reads `uuid -> role` pairs out of an access set
fn access_map(
    value: &DynamicValue,
    attr: &str,
    key: &str,
) -> Result<BTreeMap<String, SpaceMemberRole>, Vec<Diagnostic>> {
    let mut access = BTreeMap::new();
    let mut errors = vec![];

    for (index, entry) in values::objects(value, attr)
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        // unknown members are resolved at apply time
        let (Some(uuid), Some(role)) = (values::field(entry, key), values::field(entry, "space_role"))
        else {
            continue;
        };
        match role.parse::<SpaceMemberRole>() {
            Ok(role) => {
                if access.insert(uuid.to_string(), role).is_some() {
                    errors.push(
                        Diagnostic::error(
                            format!("Duplicate {} in {}", key, attr),
                            format!("{} is listed more than once", uuid),
                        )
                        .with_attribute(AttributePath::new(attr)),
                    );
                }
            }
            Err(e) => errors.push(
                Diagnostic::error("Invalid space role", e)
                    .with_attribute(AttributePath::new(attr).index(index as i64)),
            ),
        }
    }

    if errors.is_empty() {
        Ok(access)
    } else {
        Err(errors)
    }
}

fn desired_space(planned: &DynamicValue) -> Result<DesiredSpace, Vec<Diagnostic>> {
    let mut errors = vec![];

    let project_uuid = values::string(planned, "project_uuid");
    let name = values::string(planned, "name");
    if project_uuid.is_none() {
        errors.push(
            Diagnostic::error("Missing project_uuid", "The 'project_uuid' attribute is required")
                .with_attribute(AttributePath::new("project_uuid")),
        );
    }
    if name.is_none() {
        errors.push(
            Diagnostic::error("Missing name", "The 'name' attribute is required")
                .with_attribute(AttributePath::new("name")),
        );
    }

    // an unset block means the access kind is not managed here
    let mut managed = |attr: &str, key: &str| {
        if !values::is_set(planned, attr) {
            return None;
        }
        match access_map(planned, attr, key) {
            Ok(access) => Some(access),
            Err(mut e) => {
                errors.append(&mut e);
                None
            }
        }
    };
    let access = managed("access", "user_uuid");
    let group_access = managed("group_access", "group_uuid");

    match (project_uuid, name) {
        (Some(project_uuid), Some(name)) if errors.is_empty() => Ok(DesiredSpace {
            project_uuid,
            name,
            is_private: values::bool_or(planned, "is_private", true),
            parent_space_uuid: values::string(planned, "parent_space_uuid"),
            access,
            group_access,
        }),
        _ => Err(errors),
    }
}

/// State from the remote space. Attributes the API cannot report for the
/// space's position in the tree keep their configured values.
fn space_state(space: &Space, prior: &DynamicValue, last_updated: String) -> DynamicValue {
    let access = DirectAccess::of(space);
    let root = space.is_root();

    let is_private = if root {
        space.is_private
    } else {
        values::bool_or(prior, "is_private", true)
    };

    let mut state = Object::new()
        .set("id", ids::build(ids::SPACE, &[&space.project_uuid, &space.uuid]))
        .set("project_uuid", space.project_uuid.as_str())
        .set("space_uuid", space.uuid.as_str())
        .set("organization_uuid", space.organization_uuid.as_str())
        .set("name", space.name.as_str())
        .set("is_private", is_private)
        .set("parent_space_uuid", space.parent_space_uuid.clone())
        .set(
            "deletion_protection",
            values::bool_or(prior, "deletion_protection", false),
        )
        .set("last_updated", last_updated);

    // unmanaged access stays null so implicit grants do not show up as drift
    state = if root && values::is_set(prior, "access") {
        state.set_objects(
            "access",
            access.users.into_iter().map(|(uuid, role)| {
                Object::new().set("user_uuid", uuid).set("space_role", role)
            }),
        )
    } else {
        state.set("access", None::<String>)
    };
    state = if root && values::is_set(prior, "group_access") {
        state.set_objects(
            "group_access",
            access.groups.into_iter().map(|(uuid, role)| {
                Object::new().set("group_uuid", uuid).set("space_role", role)
            }),
        )
    } else {
        state.set("group_access", None::<String>)
    };

    state.build()
}

fn controller_error(summary: &str, err: &ControllerError) -> Diagnostic {
    match err {
        ControllerError::DeletionProtected(_) => Diagnostic::error(
            "Space is protected from deletion",
            format!("{}. Set deletion_protection = false and apply first.", err),
        )
        .with_attribute(AttributePath::new("deletion_protection")),
        _ => Diagnostic::error(summary, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{capabilities, configured};
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::Dynamic;

    fn space_body(parent: Option<&str>, access: serde_json::Value) -> String {
        json!({
            "status": "ok",
            "results": {
                "uuid": "s1",
                "name": "Sales",
                "projectUuid": "p1",
                "organizationUuid": "org-1",
                "isPrivate": true,
                "parentSpaceUuid": parent,
                "access": access,
                "groupsAccess": []
            }
        })
        .to_string()
    }

    fn planned(parent: Option<&str>) -> DynamicValue {
        Object::new()
            .set("id", Dynamic::Unknown)
            .set("project_uuid", "p1")
            .set("name", "Sales")
            .set("is_private", true)
            .set("parent_space_uuid", parent.map(str::to_string))
            .set("deletion_protection", false)
            .set_objects(
                "access",
                vec![Object::new()
                    .set("user_uuid", "u1")
                    .set("space_role", "admin")],
            )
            .build()
    }

    #[tokio::test]
    async fn schema_marks_project_for_replacement() {
        let resource = SpaceResource::new();
        let schema = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;

        let project = schema.attribute("project_uuid").unwrap();
        assert!(project.required);
        assert_eq!(project.plan_modifiers.len(), 1);
        assert!(schema.attribute("is_private").unwrap().default.is_some());
        assert!(schema.attribute("last_updated").unwrap().computed);
    }

    #[tokio::test]
    async fn nested_space_rejects_access_and_privacy() {
        let resource = SpaceResource::new();
        let config = Object::new()
            .set("project_uuid", "p1")
            .set("name", "EMEA")
            .set("parent_space_uuid", "s1")
            .set("is_private", false)
            .set_objects(
                "group_access",
                vec![Object::new()
                    .set("group_uuid", "g1")
                    .set("space_role", "viewer")],
            )
            .build();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "lightdash_space".to_string(),
                    config,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 2);
        assert!(response
            .diagnostics
            .iter()
            .all(|d| d.summary.ends_with("is not allowed on nested spaces")));
    }

    #[tokio::test]
    async fn validate_rejects_unknown_roles() {
        let resource = SpaceResource::new();
        let config = Object::new()
            .set_objects(
                "access",
                vec![Object::new()
                    .set("user_uuid", "u1")
                    .set("space_role", "owner")],
            )
            .build();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "lightdash_space".to_string(),
                    config,
                    client_capabilities: capabilities(),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Invalid space role");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_builds_state_from_remote_space() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/api/v1/projects/p1/spaces")
            .match_body(Matcher::PartialJson(json!({"name": "Sales", "isPrivate": true})))
            .with_body(space_body(None, json!([])))
            .create_async()
            .await;
        let _share = server
            .mock("POST", "/api/v1/projects/p1/spaces/s1/share")
            .match_body(Matcher::Json(json!({"userUuid": "u1", "spaceRole": "admin"})))
            .with_body(r#"{"status":"ok","results":null}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/api/v1/projects/p1/spaces/s1")
            .with_body(space_body(
                None,
                json!([{"userUuid": "u1", "role": "admin", "hasDirectAccess": true}]),
            ))
            .create_async()
            .await;

        let resource = configured(SpaceResource::new(), &server.url()).await;
        let planned = planned(None);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "lightdash_space".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.new_state;
        assert_eq!(
            values::string(state, "id").as_deref(),
            Some("projects/p1/spaces/s1")
        );
        assert_eq!(values::string(state, "organization_uuid").as_deref(), Some("org-1"));
        assert!(values::string(state, "last_updated").is_some());
        let access = values::objects(state, "access").unwrap();
        assert_eq!(access.len(), 1);
        assert_eq!(values::field(&access[0], "space_role"), Some("admin"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rename_without_access_blocks_keeps_grants() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v1/projects/p1/spaces/s1")
            .with_body(
                json!({
                    "status": "ok",
                    "results": {
                        "uuid": "s1", "name": "Sales", "projectUuid": "p1",
                        "organizationUuid": "org-1", "isPrivate": true,
                        "access": [
                            {"userUuid": "creator", "role": "admin", "hasDirectAccess": true}
                        ],
                        "groupsAccess": [{"groupUuid": "g9", "spaceRole": "editor"}]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let rename = server
            .mock("PATCH", "/api/v1/projects/p1/spaces/s1")
            .match_body(Matcher::PartialJson(json!({"name": "Pipeline"})))
            .with_body(r#"{"status":"ok","results":null}"#)
            .expect(1)
            .create_async()
            .await;
        let revoke = server
            .mock("DELETE", Matcher::Regex("/share/".to_string()))
            .expect(0)
            .create_async()
            .await;

        let prior = Object::new()
            .set("id", "projects/p1/spaces/s1")
            .set("project_uuid", "p1")
            .set("name", "Sales")
            .set("is_private", true)
            .set("deletion_protection", false)
            .build();
        let planned = Object::new()
            .set("id", "projects/p1/spaces/s1")
            .set("project_uuid", "p1")
            .set("name", "Pipeline")
            .set("is_private", true)
            .set("deletion_protection", false)
            .build();

        let resource = configured(SpaceResource::new(), &server.url()).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "lightdash_space".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(!values::is_set(&response.new_state, "access"));
        rename.assert_async().await;
        revoke.assert_async().await;
    }

    #[test]
    fn desired_space_distinguishes_unset_and_empty_access() {
        let unset = desired_space(&planned(None)).unwrap();
        assert!(unset.group_access.is_none());
        assert_eq!(unset.access.map(|a| a.len()), Some(1));

        let empty = Object::new()
            .set("project_uuid", "p1")
            .set("name", "Sales")
            .set_objects("group_access", Vec::<Object>::new())
            .build();
        let desired = desired_space(&empty).unwrap();
        assert_eq!(desired.group_access, Some(BTreeMap::new()));
        assert!(desired.access.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_drops_missing_space() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v1/projects/p1/spaces/s1")
            .with_status(404)
            .with_body(
                r#"{"status":"error","error":{"statusCode":404,"name":"NotFoundError","message":"Space not found"}}"#,
            )
            .create_async()
            .await;

        let resource = configured(SpaceResource::new(), &server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "lightdash_space".to_string(),
                    current_state: Object::new().set("id", "projects/p1/spaces/s1").build(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_after_import_fills_defaults() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v1/projects/p1/spaces/s1")
            .with_body(space_body(Some("parent"), json!([])))
            .create_async()
            .await;

        let resource = configured(SpaceResource::new(), &server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "lightdash_space".to_string(),
                    current_state: Object::new().set("id", "projects/p1/spaces/s1").build(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(values::string(&state, "parent_space_uuid").as_deref(), Some("parent"));
        assert!(!values::bool_or(&state, "deletion_protection", true));
        assert!(!values::is_set(&state, "access"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn protected_space_is_not_deleted() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("DELETE", "/api/v1/projects/p1/spaces/s1")
            .expect(0)
            .create_async()
            .await;

        let resource = configured(SpaceResource::new(), &server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "lightdash_space".to_string(),
                    prior_state: Object::new()
                        .set("id", "projects/p1/spaces/s1")
                        .set("deletion_protection", true)
                        .build(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "Space is protected from deletion"
        );
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn operations_require_configuration() {
        let resource = SpaceResource::new();
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "lightdash_space".to_string(),
                    prior_state: Object::new().set("id", "projects/p1/spaces/s1").build(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}

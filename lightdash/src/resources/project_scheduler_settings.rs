//! Scheduler timezone of a project. There is one per project, so create and
//! update both patch it and delete puts it back to UTC.

use crate::api::projects::SchedulerSettings;
use crate::api::Client;
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
use tfplug::validator::StringLengthBetween;
use tracing::{debug, info};

const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Default)]
pub struct ProjectSchedulerSettingsResource {
    provider_data: Option<LightdashProviderData>,
}

impl ProjectSchedulerSettingsResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn apply(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let project_uuid = super::required_string(planned, "project_uuid")?;
        let timezone = super::required_string(planned, "scheduler_timezone")?;

        set_timezone(client, &project_uuid, &timezone)
            .await
            .map_err(|e| super::api_error("Failed to update scheduler settings", e))?;
        info!(%project_uuid, %timezone, "set scheduler timezone");
        Ok(settings_state(&project_uuid, &timezone))
    }
}

async fn set_timezone(
    client: &Client,
    project_uuid: &str,
    timezone: &str,
) -> Result<(), crate::api::ApiError> {
    client
        .projects()
        .update_scheduler_settings(
            project_uuid,
            &SchedulerSettings {
                scheduler_timezone: timezone.to_string(),
            },
        )
        .await
}

#[async_trait]
impl Resource for ProjectSchedulerSettingsResource {
    fn type_name(&self) -> &str {
        "lightdash_project_scheduler_settings"
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
            .description("Manages the scheduler settings of a Lightdash project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource ID in the form projects/{project_uuid}/scheduler-settings")
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
                AttributeBuilder::new("scheduler_timezone", AttributeType::String)
                    .description("IANA timezone used by scheduled deliveries, e.g. Europe/Paris")
                    .required()
                    .validator(StringLengthBetween::create(1, 64))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.apply(&request.planned_state).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
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
            .and_then(|client| project_uuid(&request.current_state).map(|uuid| (client, uuid)));
        let (client, project_uuid) = match prepared {
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

        let new_state = match client.projects().get(&project_uuid).await {
            Ok(project) => {
                let timezone = project
                    .scheduler_timezone
                    .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
                Some(settings_state(&project.project_uuid, &timezone))
            }
            Err(e) if e.is_not_found() => {
                debug!(%project_uuid, "project no longer exists");
                None
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read scheduler settings", e));
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
        match self.apply(&request.planned_state).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
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
        let mut diagnostics = vec![];

        let prepared = client_of(&self.provider_data)
            .and_then(|client| project_uuid(&request.prior_state).map(|uuid| (client, uuid)));
        let (client, project_uuid) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match set_timezone(client, &project_uuid, DEFAULT_TIMEZONE).await {
            Ok(()) => info!(%project_uuid, "reset scheduler timezone"),
            Err(e) if e.is_not_found() => debug!(%project_uuid, "project already deleted"),
            Err(e) => diagnostics.push(super::api_error("Failed to reset scheduler settings", e)),
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for ProjectSchedulerSettingsResource {
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
impl ResourceWithImportState for ProjectSchedulerSettingsResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::PROJECT_SCHEDULER_SETTINGS, &request)
    }
}

fn project_uuid(state: &DynamicValue) -> Result<String, Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_single(&id, ids::PROJECT_SCHEDULER_SETTINGS)
        .map_err(|e| super::missing_id("scheduler settings", e))
}

fn settings_state(project_uuid: &str, timezone: &str) -> DynamicValue {
    Object::new()
        .set("id", ids::build(ids::PROJECT_SCHEDULER_SETTINGS, &[project_uuid]))
        .set("project_uuid", project_uuid)
        .set("scheduler_timezone", timezone)
        .build()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{capabilities, configured};
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test(flavor = "multi_thread")]
    async fn create_patches_timezone() {
        let mut server = Server::new_async().await;
        let patch = server
            .mock("PATCH", "/api/v1/projects/p1/schedulerSettings")
            .match_body(Matcher::Json(json!({"schedulerTimezone": "Europe/Paris"})))
            .with_body(r#"{"status":"ok","results":{}}"#)
            .create_async()
            .await;

        let resource = configured(ProjectSchedulerSettingsResource::new(), &server.url()).await;
        let planned = Object::new()
            .set("project_uuid", "p1")
            .set("scheduler_timezone", "Europe/Paris")
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "lightdash_project_scheduler_settings".to_string(),
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
            Some("projects/p1/scheduler-settings")
        );
        patch.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_defaults_missing_timezone_to_utc() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v1/projects/p1")
            .with_body(r#"{"status":"ok","results":{"projectUuid":"p1","organizationUuid":"org-1","name":"Analytics","type":"DEFAULT"}}"#)
            .create_async()
            .await;

        let resource = configured(ProjectSchedulerSettingsResource::new(), &server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "lightdash_project_scheduler_settings".to_string(),
                    current_state: Object::new()
                        .set("id", "projects/p1/scheduler-settings")
                        .build(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: capabilities(),
                },
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(
            values::string(&state, "scheduler_timezone").as_deref(),
            Some("UTC")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_resets_to_utc() {
        let mut server = Server::new_async().await;
        let patch = server
            .mock("PATCH", "/api/v1/projects/p1/schedulerSettings")
            .match_body(Matcher::Json(json!({"schedulerTimezone": "UTC"})))
            .with_body(r#"{"status":"ok","results":{}}"#)
            .create_async()
            .await;

        let resource = configured(ProjectSchedulerSettingsResource::new(), &server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "lightdash_project_scheduler_settings".to_string(),
                    prior_state: Object::new()
                        .set("id", "projects/p1/scheduler-settings")
                        .build(),
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        patch.assert_async().await;
    }
}

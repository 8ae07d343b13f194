//! Organization-level warehouse credentials.
//!
//! Lightdash never returns the secret fields, so `credentials` is always
//! carried over from the planned or prior state.

use crate::api::warehouse_credentials::{
    CredentialsPayload, WarehouseCredentials, WarehouseCredentialsRequest,
};
use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
use crate::values::{self, Object};
use async_trait::async_trait;
use std::collections::BTreeMap;
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOf;
use tracing::{debug, info, warn};

const WAREHOUSE_TYPES: &[&str] = &[
    "bigquery",
    "databricks",
    "postgres",
    "redshift",
    "snowflake",
    "trino",
    "clickhouse",
];

#[derive(Default)]
pub struct WarehouseCredentialsResource {
    provider_data: Option<LightdashProviderData>,
}

impl WarehouseCredentialsResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for WarehouseCredentialsResource {
    fn type_name(&self) -> &str {
        "lightdash_warehouse_credentials"
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
            .description("Manages warehouse credentials shared across an organization")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource ID in the form warehouse-credentials/{credentials_uuid}")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("credentials_uuid", AttributeType::String)
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
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("warehouse_type", AttributeType::String)
                    .description("Warehouse adapter, for example snowflake or bigquery")
                    .required()
                    .validator(StringOneOf::create(WAREHOUSE_TYPES))
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("credentials", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Adapter-specific connection fields. Never read back from Lightdash.")
                    .required()
                    .sensitive()
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

        let prepared = client_of(&self.provider_data)
            .and_then(|client| credentials_request(&request.planned_state).map(|r| (client, r)));
        let (client, body) = match prepared {
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

        match client.warehouse_credentials().create(&body).await {
            Ok(creds) => {
                info!(credentials_uuid = %creds.uuid, warehouse_type = %creds.warehouse_type, "created warehouse credentials");
                CreateResourceResponse {
                    new_state: credentials_state(&creds, &request.planned_state),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to create warehouse credentials", e));
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
            .and_then(|client| credentials_uuid(&request.current_state).map(|uuid| (client, uuid)));
        let (client, uuid) = match prepared {
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

        let new_state = match client.warehouse_credentials().get(&uuid).await {
            Ok(creds) => {
                if !values::is_set(&request.current_state, "credentials") {
                    warn!(credentials_uuid = %uuid, "credentials secrets unknown after import");
                }
                Some(credentials_state(&creds, &request.current_state))
            }
            Err(e) if e.is_not_found() => {
                debug!(credentials_uuid = %uuid, "warehouse credentials no longer exist");
                None
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read warehouse credentials", e));
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
                credentials_uuid(&request.prior_state)?,
                credentials_request(&request.planned_state)?,
            ))
        });
        let (client, uuid, body) = match prepared {
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

        match client.warehouse_credentials().update(&uuid, &body).await {
            Ok(creds) => {
                info!(credentials_uuid = %uuid, "updated warehouse credentials");
                UpdateResourceResponse {
                    new_state: credentials_state(&creds, &request.planned_state),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to update warehouse credentials", e));
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
            .and_then(|client| credentials_uuid(&request.prior_state).map(|uuid| (client, uuid)));
        let (client, uuid) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.warehouse_credentials().delete(&uuid).await {
            Ok(()) => info!(credentials_uuid = %uuid, "deleted warehouse credentials"),
            Err(e) if e.is_not_found() => debug!(credentials_uuid = %uuid, "already deleted"),
            Err(e) => diagnostics.push(super::api_error("Failed to delete warehouse credentials", e)),
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for WarehouseCredentialsResource {
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
impl ResourceWithImportState for WarehouseCredentialsResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::WAREHOUSE_CREDENTIALS, &request)
    }
}

fn credentials_uuid(state: &DynamicValue) -> Result<String, Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_single(&id, ids::WAREHOUSE_CREDENTIALS)
        .map_err(|e| super::missing_id("warehouse credentials", e))
}

fn credentials_request(planned: &DynamicValue) -> Result<WarehouseCredentialsRequest, Diagnostic> {
    let path = AttributePath::new("credentials");
    let secrets = planned.get_map(&path).map_err(|e| {
        Diagnostic::error("Missing credentials", e.to_string()).with_attribute(path.clone())
    })?;

    let mut fields = BTreeMap::new();
    for (key, value) in secrets {
        match value {
            Dynamic::String(s) => {
                fields.insert(key, serde_json::Value::String(s));
            }
            Dynamic::Null => {}
            _ => {
                return Err(Diagnostic::error(
                    "Invalid credentials",
                    format!("Credential field '{}' must be a known string", key),
                )
                .with_attribute(path.clone().key(&key)))
            }
        }
    }

    Ok(WarehouseCredentialsRequest {
        name: super::required_string(planned, "name")?,
        description: values::string(planned, "description"),
        credentials: CredentialsPayload {
            warehouse_type: super::required_string(planned, "warehouse_type")?,
            fields,
        },
    })
}

fn credentials_state(creds: &WarehouseCredentials, prior: &DynamicValue) -> DynamicValue {
    let secrets = prior
        .get(&AttributePath::new("credentials"))
        .cloned()
        .unwrap_or(Dynamic::Null);

    Object::new()
        .set("id", ids::build(ids::WAREHOUSE_CREDENTIALS, &[&creds.uuid]))
        .set("credentials_uuid", creds.uuid.as_str())
        .set("organization_uuid", creds.organization_uuid.as_str())
        .set("name", creds.name.as_str())
        .set("description", creds.description.clone())
        .set("warehouse_type", creds.warehouse_type.as_str())
        .set("credentials", secrets)
        .set("created_at", creds.created_at.clone())
        .build()
}

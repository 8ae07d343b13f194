//! AI agent resource

use crate::api::ai_agents::{Agent, AgentIntegration, AgentRequest};
use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
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
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringLengthBetween;
use tracing::{debug, info};

#[derive(Default)]
pub struct AiAgentResource {
    provider_data: Option<LightdashProviderData>,
}

impl AiAgentResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn computed(name: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .computed()
        .plan_modifier(UseStateForUnknown::create())
        .build()
}

fn optional_string(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .build()
}

#[async_trait]
impl Resource for AiAgentResource {
    fn type_name(&self) -> &str {
        "lightdash_ai_agent"
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
            .description("Manages a Lightdash AI agent in a project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Resource ID in the form projects/{project_uuid}/ai-agents/{agent_uuid}")
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
            .attribute(computed("agent_uuid"))
            .attribute(computed("organization_uuid"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .validator(StringLengthBetween::create(1, 255))
                    .build(),
            )
            .attribute(optional_string("description", "What the agent is for"))
            .attribute(optional_string(
                "instruction",
                "System instruction given to the agent",
            ))
            .attribute(optional_string("image_url", "Avatar image"))
            .attribute(
                AttributeBuilder::new("provider", AttributeType::String)
                    .description("LLM provider; the server default applies when unset")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("model", AttributeType::String)
                    .description("LLM model; the server default applies when unset")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .description("Tags limiting which explores the agent may use")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enable_data_access", AttributeType::Bool)
                    .description("Let the agent read query results")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "user_access",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("User UUIDs allowed to use the agent")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "group_access",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("Group UUIDs allowed to use the agent")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "integrations",
                    AttributeType::List(Box::new(AttributeType::object([
                        ("type", AttributeType::String),
                        ("channel_id", AttributeType::String),
                    ]))),
                )
                .description("Chat integrations, such as Slack channels")
                .optional()
                .build(),
            )
            .attribute(computed("created_at"))
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
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
        let mut diagnostics = vec![];
        for (index, entry) in values::objects(&request.config, "integrations")
            .unwrap_or_default()
            .iter()
            .enumerate()
        {
            if let Some(kind) = values::field(entry, "type") {
                if kind != "slack" {
                    diagnostics.push(
                        Diagnostic::error(
                            "Unsupported integration type",
                            format!("Integration type '{}' is not supported; use 'slack'", kind),
                        )
                        .with_attribute(AttributePath::new("integrations").index(index as i64)),
                    );
                }
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let planned = &request.planned_state;
        let prepared = client_of(&self.provider_data).and_then(|client| {
            Ok((
                client,
                super::required_string(planned, "project_uuid")?,
                agent_request(planned)?,
            ))
        });
        let (client, project_uuid, agent_request) = match prepared {
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

        match client.ai_agents().create(&project_uuid, &agent_request).await {
            Ok(agent) => {
                info!(%project_uuid, agent_uuid = %agent.uuid, "created AI agent");
                CreateResourceResponse {
                    new_state: agent_state(&agent, planned),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to create AI agent", e));
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
            .and_then(|client| agent_keys(&request.current_state).map(|keys| (client, keys)));
        let (client, (project_uuid, agent_uuid)) = match prepared {
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

        let new_state = match client.ai_agents().get(&project_uuid, &agent_uuid).await {
            Ok(agent) => Some(agent_state(&agent, &request.current_state)),
            Err(e) if e.is_not_found() => {
                debug!(%agent_uuid, "AI agent no longer exists, removing from state");
                None
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to read AI agent", e));
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
                agent_keys(&request.prior_state)?,
                agent_request(&request.planned_state)?,
            ))
        });
        let (client, (project_uuid, agent_uuid), agent_request) = match prepared {
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
            .ai_agents()
            .update(&project_uuid, &agent_uuid, &agent_request)
            .await
        {
            Ok(agent) => {
                info!(%project_uuid, %agent_uuid, "updated AI agent");
                UpdateResourceResponse {
                    new_state: agent_state(&agent, &request.planned_state),
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(super::api_error("Failed to update AI agent", e));
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
            .and_then(|client| agent_keys(&request.prior_state).map(|keys| (client, keys)));
        let (client, (project_uuid, agent_uuid)) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        match client.ai_agents().delete(&project_uuid, &agent_uuid).await {
            Ok(()) => info!(%agent_uuid, "deleted AI agent"),
            Err(e) if e.is_not_found() => debug!(%agent_uuid, "AI agent already deleted"),
            Err(e) => diagnostics.push(super::api_error("Failed to delete AI agent", e)),
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for AiAgentResource {
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
impl ResourceWithImportState for AiAgentResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        super::import_by_id(&ctx, ids::AI_AGENT, &request)
    }
}

fn agent_keys(state: &DynamicValue) -> Result<(String, String), Diagnostic> {
    let id = values::string(state, "id").unwrap_or_default();
    ids::parse_pair(&id, ids::AI_AGENT).map_err(|e| super::missing_id("AI agent", e))
}

fn agent_request(planned: &DynamicValue) -> Result<AgentRequest, Diagnostic> {
    let integrations = values::objects(planned, "integrations")
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| {
            Some(AgentIntegration {
                integration_type: values::field(entry, "type")?.to_string(),
                channel_id: values::field(entry, "channel_id")?.to_string(),
            })
        })
        .collect();

    Ok(AgentRequest {
        name: super::required_string(planned, "name")?,
        description: values::string(planned, "description"),
        instruction: values::string(planned, "instruction"),
        image_url: values::string(planned, "image_url"),
        provider: values::string(planned, "provider"),
        model: values::string(planned, "model"),
        tags: values::strings(planned, "tags"),
        integrations,
        enable_data_access: values::bool_or(planned, "enable_data_access", false),
        user_access: values::strings(planned, "user_access").unwrap_or_default(),
        group_access: values::strings(planned, "group_access").unwrap_or_default(),
    })
}

/// Empty remote collections stay null when the configuration left them out
fn collection(prior: &DynamicValue, name: &str, items: &[String]) -> Option<Vec<String>> {
    if items.is_empty() && !values::is_set(prior, name) {
        None
    } else {
        Some(items.to_vec())
    }
}

fn agent_state(agent: &Agent, prior: &DynamicValue) -> DynamicValue {
    let mut state = Object::new()
        .set("id", ids::build(ids::AI_AGENT, &[&agent.project_uuid, &agent.uuid]))
        .set("project_uuid", agent.project_uuid.as_str())
        .set("agent_uuid", agent.uuid.as_str())
        .set("organization_uuid", agent.organization_uuid.as_str())
        .set("name", agent.name.as_str())
        .set("description", agent.description.clone())
        .set("instruction", agent.instruction.clone())
        .set("image_url", agent.image_url.clone())
        .set("provider", agent.provider.clone())
        .set("model", agent.model.clone())
        .set("enable_data_access", agent.enable_data_access)
        .set("created_at", agent.created_at.clone())
        .set("updated_at", agent.updated_at.clone());

    let tags = agent.tags.as_deref().unwrap_or_default();
    for (name, items) in [
        ("tags", tags),
        ("user_access", agent.user_access.as_slice()),
        ("group_access", agent.group_access.as_slice()),
    ] {
        state = match collection(prior, name, items) {
            Some(items) => state.set_strings(name, items),
            None => state.set(name, None::<String>),
        };
    }

    state = if agent.integrations.is_empty() && !values::is_set(prior, "integrations") {
        state.set("integrations", None::<String>)
    } else {
        state.set_objects(
            "integrations",
            agent.integrations.iter().map(|i| {
                Object::new()
                    .set("type", i.integration_type.as_str())
                    .set("channel_id", i.channel_id.as_str())
            }),
        )
    };

    state.build()
}

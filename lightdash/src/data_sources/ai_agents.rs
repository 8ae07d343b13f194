use crate::provider_data::{client_of, LightdashProviderData};
use crate::values::{self, Object};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

#[derive(Default)]
pub struct AiAgentsDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl AiAgentsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let project_uuid = values::string(config, "project_uuid").ok_or_else(|| {
            Diagnostic::error("Missing project_uuid", "The 'project_uuid' attribute is required")
                .with_attribute(AttributePath::new("project_uuid"))
        })?;

        let agents = client
            .ai_agents()
            .list(&project_uuid)
            .await
            .map_err(|e| super::api_error("Failed to list AI agents", e))?;

        Ok(Object::new()
            .set("id", project_uuid.as_str())
            .set("project_uuid", project_uuid.as_str())
            .set_objects(
                "agents",
                agents.iter().map(|a| {
                    Object::new()
                        .set("agent_uuid", a.uuid.as_str())
                        .set("name", a.name.as_str())
                        .set("description", a.description.clone())
                        .set("provider", a.provider.clone())
                        .set("model", a.model.clone())
                        .set("enable_data_access", a.enable_data_access)
                }),
            )
            .build())
    }
}

#[async_trait]
impl DataSource for AiAgentsDataSource {
    fn type_name(&self) -> &str {
        "lightdash_ai_agents"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .description("AI agents configured in a project")
                .attribute(super::computed_string("id"))
                .attribute(super::required_string("project_uuid", "Project to list"))
                .attribute(super::computed_objects(
                    "agents",
                    [
                        ("agent_uuid", AttributeType::String),
                        ("name", AttributeType::String),
                        ("description", AttributeType::String),
                        ("provider", AttributeType::String),
                        ("model", AttributeType::String),
                        ("enable_data_access", AttributeType::Bool),
                    ],
                ))
                .build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let result = self.lookup(&request.config).await;
        super::respond(request.config, result)
    }
}

#[async_trait]
impl DataSourceWithConfigure for AiAgentsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{configured, read_request};
    use super::*;
    use mockito::Server;

    #[tokio::test(flavor = "multi_thread")]
    async fn lists_project_agents() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/api/v1/projects/p1/aiAgents")
            .with_body(r#"{"status":"ok","results":[{"uuid":"a1","projectUuid":"p1","name":"Helper","provider":"openai","model":"gpt-4.1"}]}"#)
            .create_async()
            .await;

        let data_source = configured(AiAgentsDataSource::new(), &server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                read_request("lightdash_ai_agents", Object::new().set("project_uuid", "p1").build()),
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let agents = values::objects(&response.state, "agents").unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(values::field(&agents[0], "model"), Some("gpt-4.1"));
    }
}

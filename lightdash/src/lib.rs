//! Terraform provider for Lightdash

pub mod api;
pub mod config;
pub mod controllers;
pub mod data_sources;
pub mod functions;
pub mod ids;
pub mod provider_data;
pub mod resources;
pub mod services;
mod values;

use async_trait::async_trait;
use config::ProviderConfig;
use provider_data::LightdashProviderData;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::function::Function;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, FunctionFactory,
    Provider, ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder, Validator};
use tfplug::types::{AttributePath, Diagnostic, ServerCapabilities};
use tfplug::validator::NumberBetween;
use tracing::info;

fn bounded((min, max): (i64, i64)) -> Box<dyn Validator> {
    NumberBetween::create(min as f64, max as f64)
}

#[derive(Default)]
pub struct LightdashProvider;

impl LightdashProvider {
    pub fn new() -> Self {
        Self
    }
}

fn resource<R>(make: fn() -> R) -> ResourceFactory
where
    R: ResourceWithConfigure + 'static,
{
    Box::new(move || Box::new(make()) as Box<dyn ResourceWithConfigure>)
}

fn data_source<D>(make: fn() -> D) -> DataSourceFactory
where
    D: DataSourceWithConfigure + 'static,
{
    Box::new(move || Box::new(make()) as Box<dyn DataSourceWithConfigure>)
}

fn function<F>(make: fn() -> F) -> FunctionFactory
where
    F: Function + 'static,
{
    Box::new(move || Box::new(make()) as Box<dyn Function>)
}

#[async_trait]
impl Provider for LightdashProvider {
    fn type_name(&self) -> &str {
        "lightdash"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities {
                plan_destroy: true,
                get_provider_schema_optional: true,
                move_resource_state: false,
            },
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .description("Manages Lightdash organizations, projects, spaces and access")
            .attribute(
                AttributeBuilder::new("host", AttributeType::String)
                    .description("Lightdash base URL. Falls back to LIGHTDASH_URL.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("Personal access token. Falls back to LIGHTDASH_API_KEY.")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_concurrent_requests", AttributeType::Number)
                    .description("Upper bound on in-flight API requests (default 5)")
                    .optional()
                    .validator(bounded(config::MAX_CONCURRENT_REQUESTS_RANGE))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("request_timeout", AttributeType::Number)
                    .description("Per-request timeout in seconds (default 30)")
                    .optional()
                    .validator(bounded(config::REQUEST_TIMEOUT_RANGE))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("Retries for transient failures (default 3)")
                    .optional()
                    .validator(bounded(config::MAX_RETRIES_RANGE))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("retry_backoff_ms", AttributeType::Number)
                    .description("Retry backoff in milliseconds, multiplied by the attempt number (default 500)")
                    .optional()
                    .validator(bounded(config::RETRY_BACKOFF_MS_RANGE))
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];
        let path = AttributePath::new("host");
        if let Ok(host) = request.config.get_string(&path) {
            if let Err(e) = url::Url::parse(&host) {
                diagnostics.push(
                    Diagnostic::error("Invalid Lightdash host", format!("'{}': {}", host, e))
                        .with_attribute(path),
                );
            }
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let settings = match ProviderConfig::resolve(&request.config) {
            Ok(settings) => settings,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        let client =
            match api::Client::with_config(&settings.host, &settings.token, settings.client_config())
            {
                Ok(client) => client,
                Err(e) => {
                    return ConfigureProviderResponse {
                        diagnostics: vec![Diagnostic::error(
                            "Failed to create API client",
                            e.to_string(),
                        )],
                        provider_data: None,
                    }
                }
            };

        info!(
            host = %settings.host,
            terraform_version = %request.terraform_version,
            max_concurrent_requests = settings.max_concurrent_requests,
            "configured Lightdash provider"
        );
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(
                Arc::new(LightdashProviderData::new(client)) as Arc<dyn Any + Send + Sync>
            ),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        HashMap::from([
            (
                "lightdash_space".to_string(),
                resource(resources::SpaceResource::new),
            ),
            (
                "lightdash_group".to_string(),
                resource(resources::GroupResource::new),
            ),
            (
                "lightdash_project_role_member".to_string(),
                resource(resources::ProjectRoleMemberResource::new),
            ),
            (
                "lightdash_project_role_group".to_string(),
                resource(resources::ProjectRoleGroupResource::new),
            ),
            (
                "lightdash_organization_role_member".to_string(),
                resource(resources::OrganizationRoleMemberResource::new),
            ),
            (
                "lightdash_ai_agent".to_string(),
                resource(resources::AiAgentResource::new),
            ),
            (
                "lightdash_warehouse_credentials".to_string(),
                resource(resources::WarehouseCredentialsResource::new),
            ),
            (
                "lightdash_project_scheduler_settings".to_string(),
                resource(resources::ProjectSchedulerSettingsResource::new),
            ),
        ])
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        use data_sources::*;

        HashMap::from([
            (
                "lightdash_organization".to_string(),
                data_source(OrganizationDataSource::new),
            ),
            (
                "lightdash_authenticated_user".to_string(),
                data_source(AuthenticatedUserDataSource::new),
            ),
            (
                "lightdash_project".to_string(),
                data_source(ProjectDataSource::new),
            ),
            (
                "lightdash_projects".to_string(),
                data_source(ProjectsDataSource::new),
            ),
            (
                "lightdash_organization_member".to_string(),
                data_source(OrganizationMemberDataSource::new),
            ),
            (
                "lightdash_organization_members".to_string(),
                data_source(OrganizationMembersDataSource::new),
            ),
            (
                "lightdash_group".to_string(),
                data_source(GroupDataSource::new),
            ),
            (
                "lightdash_organization_groups".to_string(),
                data_source(OrganizationGroupsDataSource::new),
            ),
            (
                "lightdash_project_role_members".to_string(),
                data_source(ProjectRoleMembersDataSource::new),
            ),
            (
                "lightdash_space".to_string(),
                data_source(SpaceDataSource::new),
            ),
            (
                "lightdash_spaces".to_string(),
                data_source(SpacesDataSource::new),
            ),
            (
                "lightdash_ai_agents".to_string(),
                data_source(AiAgentsDataSource::new),
            ),
        ])
    }

    fn functions(&self) -> HashMap<String, FunctionFactory> {
        HashMap::from([
            (
                "build_space_id".to_string(),
                function(functions::BuildSpaceIdFunction::new),
            ),
            (
                "parse_resource_id".to_string(),
                function(functions::ParseResourceIdFunction::new),
            ),
        ])
    }
}

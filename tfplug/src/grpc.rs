//! gRPC service implementation of the Terraform plugin protocol v6
//!
//! Resources, data sources and functions are built from the provider's
//! factories on every call and configured with the provider data captured by
//! ConfigureProvider, so no per-resource state is shared between requests.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::function::{CallFunctionRequest, FunctionDefinition, FunctionDefinitionRequest};
use crate::plan::plan_resource_change;
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, FunctionFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetadataRequest, ProviderSchemaRequest, ResourceFactory,
    StopProviderRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ModifyPlanRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{Schema, StringKind, ValidatorRequest};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason,
    Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue, ServerCapabilities,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;
type RpcResult<T> = std::result::Result<Response<T>, Status>;

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<ProviderData>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    functions: HashMap<String, FunctionFactory>,
    root: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();
        let functions = provider.functions();
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            resources,
            data_sources,
            functions,
            root: Context::new(),
        }
    }

    /// Context for a single RPC; cancelled when StopProvider arrives
    fn request_context(&self) -> Context {
        self.root.child()
    }

    async fn resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self.resources.get(type_name).ok_or_else(|| {
            vec![Diagnostic::error(
                "Unknown resource type",
                format!("The provider does not implement resource type {}", type_name),
            )]
        })?;

        let mut resource = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(resource)
    }

    async fn data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self.data_sources.get(type_name).ok_or_else(|| {
            vec![Diagnostic::error(
                "Unknown data source type",
                format!(
                    "The provider does not implement data source type {}",
                    type_name
                ),
            )]
        })?;

        let mut data_source = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(data_source)
    }

    async fn resource_schema(&self, ctx: &Context, resource: &dyn ResourceWithConfigure) -> Schema {
        resource
            .schema(ctx.clone(), ResourceSchemaRequest)
            .await
            .schema
    }

    async fn function_definitions(
        &self,
        ctx: &Context,
    ) -> (HashMap<String, proto::Function>, Vec<Diagnostic>) {
        let mut functions = HashMap::new();
        let mut diagnostics = Vec::new();
        for (name, factory) in &self.functions {
            let function = factory();
            let response = function
                .definition(ctx.clone(), FunctionDefinitionRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            functions.insert(name.clone(), function_to_proto(response.definition));
        }
        (functions, diagnostics)
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> RpcResult<proto::get_metadata::Response> {
        let ctx = self.request_context();
        let metadata = self
            .provider
            .read()
            .await
            .metadata(ctx, ProviderMetadataRequest)
            .await;

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
            diagnostics: vec![],
            data_sources: self
                .data_sources
                .keys()
                .map(|name| proto::get_metadata::DataSourceMetadata {
                    type_name: name.clone(),
                })
                .collect(),
            resources: self
                .resources
                .keys()
                .map(|name| proto::get_metadata::ResourceMetadata {
                    type_name: name.clone(),
                })
                .collect(),
            functions: self
                .functions
                .keys()
                .map(|name| proto::get_metadata::FunctionMetadata { name: name.clone() })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> RpcResult<proto::get_provider_schema::Response> {
        let ctx = self.request_context();
        let mut diagnostics = Vec::new();

        let (provider_schema, meta_schema, capabilities) = {
            let provider = self.provider.read().await;
            let schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
            let meta = provider
                .meta_schema(ctx.clone(), ProviderMetaSchemaRequest)
                .await;
            let metadata = provider.metadata(ctx.clone(), ProviderMetadataRequest).await;
            diagnostics.extend(schema.diagnostics);
            diagnostics.extend(meta.diagnostics);
            (schema.schema, meta.schema, metadata.server_capabilities)
        };

        let mut resource_schemas = HashMap::new();
        for (name, factory) in &self.resources {
            let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(name.clone(), schema_to_proto(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (name, factory) in &self.data_sources {
            let response = factory().schema(ctx.clone(), DataSourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(name.clone(), schema_to_proto(&response.schema));
        }

        let (functions, function_diagnostics) = self.function_definitions(&ctx).await;
        diagnostics.extend(function_diagnostics);

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: meta_schema.as_ref().map(schema_to_proto),
            server_capabilities: Some(server_capabilities_to_proto(&capabilities)),
            functions,
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> RpcResult<proto::validate_provider_config::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();

        let diagnostics = match decode_dynamic(request.config) {
            Ok(config) => {
                let provider = self.provider.read().await;
                let schema = provider
                    .schema(ctx.clone(), ProviderSchemaRequest)
                    .await
                    .schema;
                let mut diagnostics = run_validators(&schema, &config);
                diagnostics.extend(
                    provider
                        .validate(ctx, ValidateProviderConfigRequest { config })
                        .await
                        .diagnostics,
                );
                diagnostics
            }
            Err(diag) => vec![diag],
        };

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> RpcResult<proto::validate_resource_config::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();
        debug!(type_name = %request.type_name, "validate resource config");

        let diagnostics = async move {
            let config = decode_dynamic(request.config).map_err(|d| vec![d])?;
            let resource = self.resource(&ctx, &request.type_name).await?;
            let schema = self.resource_schema(&ctx, resource.as_ref()).await;

            let mut diagnostics = run_validators(&schema, &config);
            diagnostics.extend(
                resource
                    .validate(
                        ctx.clone(),
                        ValidateResourceConfigRequest {
                            type_name: request.type_name.clone(),
                            config,
                            client_capabilities: client_capabilities_from_proto(
                                request.client_capabilities,
                            ),
                        },
                    )
                    .await
                    .diagnostics,
            );
            Ok::<_, Vec<Diagnostic>>(diagnostics)
        }
        .await
        .unwrap_or_else(|diags| diags);

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> RpcResult<proto::validate_data_resource_config::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();

        let diagnostics = async move {
            let config = decode_dynamic(request.config).map_err(|d| vec![d])?;
            let data_source = self.data_source(&ctx, &request.type_name).await?;
            let schema = data_source
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await
                .schema;

            let mut diagnostics = run_validators(&schema, &config);
            diagnostics.extend(
                data_source
                    .validate(
                        ctx.clone(),
                        ValidateDataSourceConfigRequest {
                            type_name: request.type_name.clone(),
                            config,
                        },
                    )
                    .await
                    .diagnostics,
            );
            Ok::<_, Vec<Diagnostic>>(diagnostics)
        }
        .await
        .unwrap_or_else(|diags| diags);

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> RpcResult<proto::upgrade_resource_state::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();

        let result: std::result::Result<_, Vec<Diagnostic>> = async move {
            let resource = self.resource(&ctx, &request.type_name).await?;
            let schema = self.resource_schema(&ctx, resource.as_ref()).await;

            if request.version > schema.version {
                return Err(vec![Diagnostic::error(
                    "Unsupported state version",
                    format!(
                        "State for {} has schema version {} but this provider only knows version {}. Upgrade the provider.",
                        request.type_name, request.version, schema.version
                    ),
                )]);
            }

            let raw = request.raw_state.unwrap_or_default();
            if raw.json.is_empty() && !raw.flatmap.is_empty() {
                return Err(vec![Diagnostic::error(
                    "Unsupported state format",
                    "Legacy flatmap state cannot be upgraded by this provider",
                )]);
            }

            let state = DynamicValue::decode_json(&raw.json).map_err(|e| {
                vec![Diagnostic::error("Failed to decode stored state", e.to_string())]
            })?;
            Ok(schema.normalize(&state))
        }
        .await;

        let (upgraded_state, diagnostics) = match result {
            Ok(state) => (Some(encode_dynamic(&state)?), vec![]),
            Err(diags) => (None, diags),
        };

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> RpcResult<proto::configure_provider::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();

        let config = match decode_dynamic(request.config) {
            Ok(config) => config,
            Err(diag) => {
                return Ok(Response::new(proto::configure_provider::Response {
                    diagnostics: diagnostics_to_proto(vec![diag]),
                }));
            }
        };

        let response = self
            .provider
            .write()
            .await
            .configure(
                ctx,
                ConfigureProviderRequest {
                    terraform_version: request.terraform_version,
                    config,
                    client_capabilities: client_capabilities_from_proto(
                        request.client_capabilities,
                    ),
                },
            )
            .await;

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> RpcResult<proto::read_resource::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();
        debug!(type_name = %request.type_name, "read resource");

        let result: std::result::Result<_, Vec<Diagnostic>> = async move {
            let current_state = decode_dynamic(request.current_state).map_err(|d| vec![d])?;
            let provider_meta = decode_optional(request.provider_meta).map_err(|d| vec![d])?;
            let resource = self.resource(&ctx, &request.type_name).await?;
            let schema = self.resource_schema(&ctx, resource.as_ref()).await;

            let response = resource
                .read(
                    ctx.clone(),
                    ReadResourceRequest {
                        type_name: request.type_name.clone(),
                        current_state,
                        private: request.private,
                        provider_meta,
                        client_capabilities: client_capabilities_from_proto(
                            request.client_capabilities,
                        ),
                    },
                )
                .await;

            let new_state = match response.new_state {
                Some(state) => schema.normalize(&state),
                None => DynamicValue::null(),
            };
            Ok((new_state, response.private, response.diagnostics, response.deferred))
        }
        .await;

        Ok(Response::new(match result {
            Ok((state, private, diagnostics, deferred)) => proto::read_resource::Response {
                new_state: Some(encode_dynamic(&state)?),
                diagnostics: diagnostics_to_proto(diagnostics),
                private,
                deferred: deferred.map(deferred_to_proto),
            },
            Err(diags) => proto::read_resource::Response {
                diagnostics: diagnostics_to_proto(diags),
                ..Default::default()
            },
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> RpcResult<proto::plan_resource_change::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();
        debug!(type_name = %request.type_name, "plan resource change");

        let result: std::result::Result<_, Vec<Diagnostic>> = async move {
            let prior_state = decode_dynamic(request.prior_state).map_err(|d| vec![d])?;
            let proposed = decode_dynamic(request.proposed_new_state).map_err(|d| vec![d])?;
            let config = decode_dynamic(request.config).map_err(|d| vec![d])?;
            let provider_meta = decode_optional(request.provider_meta).map_err(|d| vec![d])?;

            if proposed.is_null() {
                return Ok((proposed, vec![], request.prior_private, vec![]));
            }

            let resource = self.resource(&ctx, &request.type_name).await?;
            let schema = self.resource_schema(&ctx, resource.as_ref()).await;
            let planned = plan_resource_change(&schema, &prior_state, &proposed, &config);

            let mut diagnostics = planned.diagnostics;
            let mut requires_replace = planned.requires_replace;
            let mut planned_state = planned.planned_state;
            let mut planned_private = request.prior_private;

            if let Some(modifier) = resource.as_modify_plan() {
                let response = modifier
                    .modify_plan(
                        ctx.clone(),
                        ModifyPlanRequest {
                            type_name: request.type_name.clone(),
                            config,
                            prior_state,
                            proposed_new_state: planned_state,
                            prior_private: planned_private,
                            provider_meta,
                        },
                    )
                    .await;
                planned_state = response.planned_state;
                planned_private = response.planned_private;
                diagnostics.extend(response.diagnostics);
                for path in response.requires_replace {
                    if !requires_replace.contains(&path) {
                        requires_replace.push(path);
                    }
                }
            }

            Ok((
                schema.normalize(&planned_state),
                requires_replace,
                planned_private,
                diagnostics,
            ))
        }
        .await;

        Ok(Response::new(match result {
            Ok((state, requires_replace, planned_private, diagnostics)) => {
                proto::plan_resource_change::Response {
                    planned_state: Some(encode_dynamic(&state)?),
                    requires_replace: requires_replace.iter().map(path_to_proto).collect(),
                    planned_private,
                    diagnostics: diagnostics_to_proto(diagnostics),
                    legacy_type_system: false,
                    deferred: None,
                }
            }
            Err(diags) => proto::plan_resource_change::Response {
                diagnostics: diagnostics_to_proto(diags),
                ..Default::default()
            },
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> RpcResult<proto::apply_resource_change::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();

        let result: std::result::Result<_, Vec<Diagnostic>> = async move {
            let prior_state = decode_dynamic(request.prior_state).map_err(|d| vec![d])?;
            let planned_state = decode_dynamic(request.planned_state).map_err(|d| vec![d])?;
            let config = decode_dynamic(request.config).map_err(|d| vec![d])?;
            let provider_meta = decode_optional(request.provider_meta).map_err(|d| vec![d])?;
            let resource = self.resource(&ctx, &request.type_name).await?;
            let schema = self.resource_schema(&ctx, resource.as_ref()).await;
            let type_name = request.type_name.clone();

            if planned_state.is_null() {
                debug!(%type_name, "apply: delete");
                let response = resource
                    .delete(
                        ctx.clone(),
                        DeleteResourceRequest {
                            type_name,
                            prior_state: prior_state.clone(),
                            planned_private: request.planned_private,
                            provider_meta,
                        },
                    )
                    .await;
                // a failed delete keeps the resource in state
                let new_state = if has_errors(&response.diagnostics) {
                    prior_state
                } else {
                    DynamicValue::null()
                };
                return Ok((new_state, vec![], response.diagnostics));
            }

            let (new_state, private, diagnostics) = if prior_state.is_null() {
                debug!(%type_name, "apply: create");
                let response = resource
                    .create(
                        ctx.clone(),
                        CreateResourceRequest {
                            type_name,
                            planned_state,
                            config,
                            planned_private: request.planned_private,
                            provider_meta,
                        },
                    )
                    .await;
                (response.new_state, response.private, response.diagnostics)
            } else {
                debug!(%type_name, "apply: update");
                let response = resource
                    .update(
                        ctx.clone(),
                        UpdateResourceRequest {
                            type_name,
                            prior_state,
                            planned_state,
                            config,
                            planned_private: request.planned_private,
                            provider_meta,
                        },
                    )
                    .await;
                (response.new_state, response.private, response.diagnostics)
            };

            let new_state = if new_state.is_null() {
                new_state
            } else {
                schema.normalize(&new_state)
            };
            Ok((new_state, private, diagnostics))
        }
        .await;

        Ok(Response::new(match result {
            Ok((state, private, diagnostics)) => proto::apply_resource_change::Response {
                new_state: Some(encode_dynamic(&state)?),
                private,
                diagnostics: diagnostics_to_proto(diagnostics),
                legacy_type_system: false,
            },
            Err(diags) => proto::apply_resource_change::Response {
                diagnostics: diagnostics_to_proto(diags),
                ..Default::default()
            },
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> RpcResult<proto::import_resource_state::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();
        debug!(type_name = %request.type_name, id = %request.id, "import resource state");

        let result: std::result::Result<_, Vec<Diagnostic>> = async move {
            let resource = self.resource(&ctx, &request.type_name).await?;
            let importer = resource.as_import_state().ok_or_else(|| {
                vec![Diagnostic::error(
                    "Resource import not supported",
                    format!("{} does not support terraform import", request.type_name),
                )]
            })?;
            let schema = self.resource_schema(&ctx, resource.as_ref()).await;

            let response = importer
                .import_state(
                    ctx.clone(),
                    ImportResourceStateRequest {
                        type_name: request.type_name.clone(),
                        id: request.id.clone(),
                        client_capabilities: client_capabilities_from_proto(
                            request.client_capabilities,
                        ),
                    },
                )
                .await;

            let mut imported = Vec::with_capacity(response.imported_resources.len());
            for resource in response.imported_resources {
                imported.push(proto::import_resource_state::ImportedResource {
                    type_name: resource.type_name,
                    state: Some(
                        encode_dynamic(&schema.normalize(&resource.state))
                            .map_err(|s| vec![Diagnostic::error("Encoding failed", s.message())])?,
                    ),
                    private: resource.private,
                });
            }
            Ok((imported, response.diagnostics, response.deferred))
        }
        .await;

        Ok(Response::new(match result {
            Ok((imported_resources, diagnostics, deferred)) => {
                proto::import_resource_state::Response {
                    imported_resources,
                    diagnostics: diagnostics_to_proto(diagnostics),
                    deferred: deferred.map(deferred_to_proto),
                }
            }
            Err(diags) => proto::import_resource_state::Response {
                diagnostics: diagnostics_to_proto(diags),
                ..Default::default()
            },
        }))
    }

    async fn move_resource_state(
        &self,
        request: Request<proto::move_resource_state::Request>,
    ) -> RpcResult<proto::move_resource_state::Response> {
        let request = request.into_inner();
        warn!(
            source = %request.source_type_name,
            target = %request.target_type_name,
            "move resource state is not supported"
        );
        Ok(Response::new(proto::move_resource_state::Response {
            diagnostics: diagnostics_to_proto(vec![Diagnostic::error(
                "Resource move not supported",
                format!(
                    "Moving {} state into {} is not supported by this provider",
                    request.source_type_name, request.target_type_name
                ),
            )]),
            ..Default::default()
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> RpcResult<proto::read_data_source::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();
        debug!(type_name = %request.type_name, "read data source");

        let result: std::result::Result<_, Vec<Diagnostic>> = async move {
            let config = decode_dynamic(request.config).map_err(|d| vec![d])?;
            let provider_meta = decode_optional(request.provider_meta).map_err(|d| vec![d])?;
            let data_source = self.data_source(&ctx, &request.type_name).await?;
            let schema = data_source
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await
                .schema;

            let response = data_source
                .read(
                    ctx.clone(),
                    ReadDataSourceRequest {
                        type_name: request.type_name.clone(),
                        config,
                        provider_meta,
                        client_capabilities: client_capabilities_from_proto(
                            request.client_capabilities,
                        ),
                    },
                )
                .await;
            let state = if response.state.is_null() {
                response.state
            } else {
                schema.normalize(&response.state)
            };
            Ok((state, response.diagnostics, response.deferred))
        }
        .await;

        Ok(Response::new(match result {
            Ok((state, diagnostics, deferred)) => proto::read_data_source::Response {
                state: Some(encode_dynamic(&state)?),
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: deferred.map(deferred_to_proto),
            },
            Err(diags) => proto::read_data_source::Response {
                diagnostics: diagnostics_to_proto(diags),
                ..Default::default()
            },
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<proto::get_functions::Request>,
    ) -> RpcResult<proto::get_functions::Response> {
        let ctx = self.request_context();
        let (functions, diagnostics) = self.function_definitions(&ctx).await;
        Ok(Response::new(proto::get_functions::Response {
            functions,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn call_function(
        &self,
        request: Request<proto::call_function::Request>,
    ) -> RpcResult<proto::call_function::Response> {
        let ctx = self.request_context();
        let request = request.into_inner();
        debug!(name = %request.name, "call function");

        let Some(factory) = self.functions.get(&request.name) else {
            return Ok(Response::new(proto::call_function::Response {
                result: None,
                error: Some(proto::FunctionError {
                    text: format!("Unknown function {}", request.name),
                    function_argument: None,
                }),
            }));
        };

        let mut arguments = Vec::with_capacity(request.arguments.len());
        for (idx, argument) in request.arguments.into_iter().enumerate() {
            match decode_dynamic(Some(argument)) {
                Ok(value) => arguments.push(value),
                Err(diag) => {
                    return Ok(Response::new(proto::call_function::Response {
                        result: None,
                        error: Some(proto::FunctionError {
                            text: diag.detail,
                            function_argument: Some(idx as i64),
                        }),
                    }));
                }
            }
        }

        let response = factory()
            .call(ctx, CallFunctionRequest { arguments })
            .await;

        let result = match response.result {
            Some(value) => Some(encode_dynamic(&value)?),
            None => None,
        };
        Ok(Response::new(proto::call_function::Response {
            result,
            error: response.error.map(|e| proto::FunctionError {
                text: e.text,
                function_argument: e.function_argument,
            }),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> RpcResult<proto::stop_provider::Response> {
        debug!("stop provider");
        self.root.cancel();
        let response = self
            .provider
            .read()
            .await
            .stop(Context::new(), StopProviderRequest)
            .await;
        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

/// Runs each attribute's validators against its known, non-null config value
fn run_validators(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let Dynamic::Map(entries) = &config.value else {
        return vec![];
    };

    let mut diagnostics = Vec::new();
    for attr in &schema.block.attributes {
        if attr.validators.is_empty() {
            continue;
        }
        let Some(value) = entries.get(&attr.name) else {
            continue;
        };
        if value.is_null() || value.contains_unknown() {
            continue;
        }
        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(value.clone()),
                path: AttributePath::new(&attr.name),
            });
            diagnostics.extend(response.diagnostics);
        }
    }
    diagnostics
}

fn decode_dynamic(value: Option<proto::DynamicValue>) -> std::result::Result<DynamicValue, Diagnostic> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };
    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)
    } else {
        DynamicValue::decode_json(&value.json)
    };
    decoded.map_err(|e| Diagnostic::error("Failed to decode value", e.to_string()))
}

fn decode_optional(
    value: Option<proto::DynamicValue>,
) -> std::result::Result<Option<DynamicValue>, Diagnostic> {
    value.map(|v| decode_dynamic(Some(v))).transpose()
}

fn encode_dynamic(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Status> {
    let msgpack = value
        .encode_msgpack()
        .map_err(|e| Status::internal(e.to_string()))?;
    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| proto::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            } as i32,
            summary: d.summary,
            detail: d.detail,
            attribute: d.attribute.as_ref().map(path_to_proto),
        })
        .collect()
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn string_kind_to_proto(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn type_bytes(ty: &crate::schema::AttributeType) -> Vec<u8> {
    ty.to_type_json().to_string().into_bytes()
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.block.version,
            attributes: schema
                .block
                .attributes
                .iter()
                .map(|attr| proto::schema::Attribute {
                    name: attr.name.clone(),
                    r#type: type_bytes(&attr.r#type),
                    nested_type: None,
                    description: attr.description.clone(),
                    required: attr.required,
                    optional: attr.optional,
                    computed: attr.computed,
                    sensitive: attr.sensitive,
                    description_kind: proto::StringKind::Plain as i32,
                    deprecated: attr.deprecated,
                    write_only: false,
                })
                .collect(),
            block_types: vec![],
            description: schema.block.description.clone(),
            description_kind: string_kind_to_proto(schema.block.description_kind),
            deprecated: schema.block.deprecated,
        }),
    }
}

fn function_to_proto(definition: FunctionDefinition) -> proto::Function {
    let parameter = |p: crate::function::Parameter| proto::function::Parameter {
        name: p.name,
        r#type: type_bytes(&p.r#type),
        allow_null_value: p.allow_null_value,
        allow_unknown_values: p.allow_unknown_values,
        description: p.description,
        description_kind: proto::StringKind::Plain as i32,
    };

    proto::Function {
        parameters: definition.parameters.into_iter().map(parameter).collect(),
        variadic_parameter: definition.variadic_parameter.map(parameter),
        r#return: Some(proto::function::Return {
            r#type: type_bytes(&definition.return_type),
        }),
        summary: definition.summary,
        description: definition.description,
        description_kind: proto::StringKind::Plain as i32,
        deprecation_message: definition.deprecation_message.unwrap_or_default(),
    }
}

fn server_capabilities_to_proto(capabilities: &ServerCapabilities) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: capabilities.plan_destroy,
        get_provider_schema_optional: capabilities.get_provider_schema_optional,
        move_resource_state: capabilities.move_resource_state,
    }
}

fn client_capabilities_from_proto(
    capabilities: Option<proto::ClientCapabilities>,
) -> ClientCapabilities {
    capabilities
        .map(|c| ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
}

fn deferred_to_proto(deferred: Deferred) -> proto::Deferred {
    proto::Deferred {
        reason: match deferred.reason {
            DeferredReason::Unknown => proto::deferred::Reason::Unknown,
            DeferredReason::ResourceConfigUnknown => proto::deferred::Reason::ResourceConfigUnknown,
            DeferredReason::ProviderConfigUnknown => proto::deferred::Reason::ProviderConfigUnknown,
            DeferredReason::AbsentPrereq => proto::deferred::Reason::AbsentPrereq,
        } as i32,
    }
}

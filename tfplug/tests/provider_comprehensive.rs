//! End-to-end tests of the gRPC service against an in-memory provider

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::grpc::GrpcProviderServer;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::proto::{self, ProviderService};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, ServerCapabilities};
use tfplug::validator::StringOneOf;
use tonic::Request;

/// Backend shared through provider_data
#[derive(Default)]
struct Store {
    notes: Mutex<HashMap<String, (String, String)>>,
    next_id: AtomicUsize,
}

struct NotesProvider;

#[async_trait]
impl Provider for NotesProvider {
    fn type_name(&self) -> &str {
        "notes"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "notes".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("namespace", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(Store::default()) as Arc<dyn std::any::Any + Send + Sync>),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "notes_note".to_string(),
            Box::new(|| Box::new(NoteResource { store: None }) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "notes_count".to_string(),
            Box::new(|| Box::new(CountDataSource { store: None }) as Box<dyn DataSourceWithConfigure>),
        );
        factories
    }
}

struct NoteResource {
    store: Option<Arc<Store>>,
}

impl NoteResource {
    fn store(&self) -> Result<&Arc<Store>, Diagnostic> {
        self.store
            .as_ref()
            .ok_or_else(|| Diagnostic::error("Provider not configured", ""))
    }
}

#[async_trait]
impl Resource for NoteResource {
    fn type_name(&self) -> &str {
        "notes_note"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "notes_note".to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .plan_modifier(UseStateForUnknown::create())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("folder", AttributeType::String)
                        .required()
                        .plan_modifier(RequiresReplace::create())
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("body", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("visibility", AttributeType::String)
                        .optional()
                        .validator(StringOneOf::create(&["private", "public"]))
                        .default(StaticDefault::string("private"))
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let store = match self.store() {
            Ok(store) => store,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };
        let folder = request
            .planned_state
            .get_string(&AttributePath::new("folder"))
            .unwrap();
        let body = request
            .planned_state
            .get_string(&AttributePath::new("body"))
            .unwrap();
        let id = format!("note-{}", store.next_id.fetch_add(1, Ordering::SeqCst));
        store
            .notes
            .lock()
            .await
            .insert(id.clone(), (folder, body));

        let mut state = request.planned_state.clone();
        state.set_string(&AttributePath::new("id"), id).unwrap();
        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let store = self.store().unwrap();
        let note = store.notes.lock().await.get(&id).cloned();

        let new_state = note.map(|(folder, body)| {
            let mut state = request.current_state.clone();
            state.set_string(&AttributePath::new("folder"), folder).unwrap();
            state.set_string(&AttributePath::new("body"), body).unwrap();
            state
        });
        ReadResourceResponse {
            new_state,
            diagnostics: vec![],
            private: request.private,
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        let body = request
            .planned_state
            .get_string(&AttributePath::new("body"))
            .unwrap();
        let store = self.store().unwrap();
        if let Some(note) = store.notes.lock().await.get_mut(&id) {
            note.1 = body;
        }
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        self.store().unwrap().notes.lock().await.remove(&id);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for NoteResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for NoteResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        if let Some(data) = request.provider_data {
            self.store = data.downcast::<Store>().ok();
        }
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

struct CountDataSource {
    store: Option<Arc<Store>>,
}

#[async_trait]
impl DataSource for CountDataSource {
    fn type_name(&self) -> &str {
        "notes_count"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "notes_count".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("count", AttributeType::Number)
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("label", AttributeType::String)
                        .computed()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let count = match &self.store {
            Some(store) => store.notes.lock().await.len(),
            None => 0,
        };
        let mut state = DynamicValue::object();
        state
            .set_number(&AttributePath::new("count"), count as f64)
            .unwrap();
        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
            deferred: None,
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for CountDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        if let Some(data) = request.provider_data {
            self.store = data.downcast::<Store>().ok();
        }
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

fn wire(value: &DynamicValue) -> Option<proto::DynamicValue> {
    Some(proto::DynamicValue {
        msgpack: value.encode_msgpack().unwrap(),
        json: vec![],
    })
}

fn unwire(value: Option<proto::DynamicValue>) -> DynamicValue {
    DynamicValue::decode_msgpack(&value.unwrap().msgpack).unwrap()
}

fn note_config(folder: &str, body: &str) -> DynamicValue {
    let mut config = DynamicValue::object();
    config
        .set_string(&AttributePath::new("folder"), folder.to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("body"), body.to_string())
        .unwrap();
    config
}

async fn configured_server() -> GrpcProviderServer<NotesProvider> {
    let server = GrpcProviderServer::new(NotesProvider);
    let response = server
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: wire(&DynamicValue::object()),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(response.diagnostics.is_empty());
    server
}

async fn plan(
    server: &GrpcProviderServer<NotesProvider>,
    prior: &DynamicValue,
    proposed: &DynamicValue,
    config: &DynamicValue,
) -> proto::plan_resource_change::Response {
    server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "notes_note".to_string(),
            prior_state: wire(prior),
            proposed_new_state: wire(proposed),
            config: wire(config),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner()
}

async fn apply(
    server: &GrpcProviderServer<NotesProvider>,
    prior: &DynamicValue,
    planned: &DynamicValue,
    config: &DynamicValue,
) -> proto::apply_resource_change::Response {
    server
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "notes_note".to_string(),
            prior_state: wire(prior),
            planned_state: wire(planned),
            config: wire(config),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner()
}

#[tokio::test]
async fn schema_lists_resources_and_data_sources() {
    let server = GrpcProviderServer::new(NotesProvider);
    let response = server
        .get_provider_schema(Request::new(proto::get_provider_schema::Request {}))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    assert!(response.resource_schemas.contains_key("notes_note"));
    assert!(response.data_source_schemas.contains_key("notes_count"));

    let note = response.resource_schemas["notes_note"].block.as_ref().unwrap();
    let visibility = note
        .attributes
        .iter()
        .find(|a| a.name == "visibility")
        .unwrap();
    assert!(visibility.optional && visibility.computed);
    assert_eq!(visibility.r#type, br#""string""#.to_vec());
}

#[tokio::test]
async fn validation_reports_bad_values() {
    let server = GrpcProviderServer::new(NotesProvider);
    let mut config = note_config("inbox", "hello");
    config
        .set_string(&AttributePath::new("visibility"), "secret".to_string())
        .unwrap();

    let response = server
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "notes_note".to_string(),
            config: wire(&config),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(
        response.diagnostics[0].severity,
        proto::diagnostic::Severity::Error as i32
    );
}

#[tokio::test]
async fn full_resource_lifecycle() {
    let server = configured_server().await;
    let config = note_config("inbox", "hello");

    // create
    let planned = plan(&server, &DynamicValue::null(), &config, &config).await;
    assert!(planned.diagnostics.is_empty());
    let planned_state = unwire(planned.planned_state);
    assert!(planned_state
        .get(&AttributePath::new("id"))
        .is_some_and(Dynamic::is_unknown));
    assert_eq!(
        planned_state
            .get_string(&AttributePath::new("visibility"))
            .unwrap(),
        "private"
    );

    let applied = apply(&server, &DynamicValue::null(), &planned_state, &config).await;
    assert!(applied.diagnostics.is_empty());
    let state = unwire(applied.new_state);
    let id = state.get_string(&AttributePath::new("id")).unwrap();
    assert_eq!(id, "note-0");

    // in-place update keeps the id known
    let new_config = note_config("inbox", "hello again");
    let mut proposed = state.clone();
    proposed
        .set_string(&AttributePath::new("body"), "hello again".to_string())
        .unwrap();
    let planned = plan(&server, &state, &proposed, &new_config).await;
    assert!(planned.requires_replace.is_empty());
    let planned_state = unwire(planned.planned_state);
    assert_eq!(planned_state.get_string(&AttributePath::new("id")).unwrap(), id);

    let applied = apply(&server, &state, &planned_state, &new_config).await;
    let state = unwire(applied.new_state);

    // changing the folder forces replacement
    let moved_config = note_config("archive", "hello again");
    let mut proposed = state.clone();
    proposed
        .set_string(&AttributePath::new("folder"), "archive".to_string())
        .unwrap();
    let planned = plan(&server, &state, &proposed, &moved_config).await;
    assert_eq!(planned.requires_replace.len(), 1);

    // read reflects the backend
    let read = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "notes_note".to_string(),
            current_state: wire(&state),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    let read_state = unwire(read.new_state);
    assert_eq!(
        read_state.get_string(&AttributePath::new("body")).unwrap(),
        "hello again"
    );

    // delete, then read reports the note as gone
    let destroyed = apply(&server, &state, &DynamicValue::null(), &DynamicValue::null()).await;
    assert!(destroyed.diagnostics.is_empty());
    assert!(unwire(destroyed.new_state).is_null());

    let read = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "notes_note".to_string(),
            current_state: wire(&state),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(unwire(read.new_state).is_null());
}

#[tokio::test]
async fn import_normalizes_state() {
    let server = configured_server().await;
    let response = server
        .import_resource_state(Request::new(proto::import_resource_state::Request {
            type_name: "notes_note".to_string(),
            id: "note-42".to_string(),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    let state = unwire(response.imported_resources[0].state.clone());
    let map = state.value.as_map().unwrap();
    assert_eq!(map.len(), 4);
    assert_eq!(map.get("id"), Some(&Dynamic::from("note-42")));
    assert_eq!(map.get("body"), Some(&Dynamic::Null));
}

#[tokio::test]
async fn data_source_sees_provider_data() {
    let server = configured_server().await;
    let config = note_config("inbox", "one");
    let planned = unwire(plan(&server, &DynamicValue::null(), &config, &config).await.planned_state);
    apply(&server, &DynamicValue::null(), &planned, &config).await;

    let response = server
        .read_data_source(Request::new(proto::read_data_source::Request {
            type_name: "notes_count".to_string(),
            config: wire(&DynamicValue::object()),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();

    let state = unwire(response.state);
    assert_eq!(state.get_number(&AttributePath::new("count")).unwrap(), 1.0);
    // normalized: unset computed attributes are present as null
    assert_eq!(
        state.value.as_map().unwrap().get("label"),
        Some(&Dynamic::Null)
    );
}

#[tokio::test]
async fn unknown_types_produce_diagnostics() {
    let server = configured_server().await;
    let response = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "notes_missing".to_string(),
            current_state: wire(&DynamicValue::object()),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("notes_missing"));
}

#[tokio::test]
async fn move_resource_state_is_rejected() {
    let server = GrpcProviderServer::new(NotesProvider);
    let response = server
        .move_resource_state(Request::new(proto::move_resource_state::Request {
            source_type_name: "other_note".to_string(),
            target_type_name: "notes_note".to_string(),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.target_state.is_none());
}

#[test]
fn stop_provider_responds_without_error() {
    let server = GrpcProviderServer::new(NotesProvider);
    let response = tokio_test::block_on(
        server.stop_provider(Request::new(proto::stop_provider::Request {})),
    )
    .unwrap()
    .into_inner();
    assert!(response.error.is_empty());
}

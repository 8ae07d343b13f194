//! Space lookups

use crate::ids;
use crate::provider_data::{client_of, LightdashProviderData};
use crate::services::{DirectAccess, SpacesService};
use crate::values::{self, Object};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

fn required(config: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    values::string(config, name).ok_or_else(|| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
        .with_attribute(AttributePath::new(name))
    })
}

#[derive(Default)]
pub struct SpaceDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl SpaceDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let project_uuid = required(config, "project_uuid")?;
        let space_uuid = required(config, "space_uuid")?;

        let space = SpacesService::new(client)
            .get(&project_uuid, &space_uuid)
            .await
            .map_err(|e| super::api_error("Failed to read space", e))?;
        let access = DirectAccess::of(&space);

        Ok(Object::new()
            .set("id", ids::build(ids::SPACE, &[&space.project_uuid, &space.uuid]))
            .set("project_uuid", space.project_uuid.as_str())
            .set("space_uuid", space.uuid.as_str())
            .set("organization_uuid", space.organization_uuid.as_str())
            .set("name", space.name.as_str())
            .set("is_private", space.is_private)
            .set("parent_space_uuid", space.parent_space_uuid.clone())
            .set("path", space.path.clone())
            .set_objects(
                "access",
                access.users.iter().map(|(user, role)| {
                    Object::new()
                        .set("user_uuid", user.as_str())
                        .set("space_role", role.as_str())
                }),
            )
            .set_objects(
                "group_access",
                access.groups.iter().map(|(group, role)| {
                    Object::new()
                        .set("group_uuid", group.as_str())
                        .set("space_role", role.as_str())
                }),
            )
            .build())
    }
}

#[async_trait]
impl DataSource for SpaceDataSource {
    fn type_name(&self) -> &str {
        "lightdash_space"
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
                .description("A single space with its direct access grants")
                .attribute(super::computed_string("id"))
                .attribute(super::required_string("project_uuid", "Project owning the space"))
                .attribute(super::required_string("space_uuid", "Space to read"))
                .attribute(super::computed_string("organization_uuid"))
                .attribute(super::computed_string("name"))
                .attribute(super::computed("is_private", AttributeType::Bool))
                .attribute(super::computed_string("parent_space_uuid"))
                .attribute(super::computed_string("path"))
                .attribute(super::computed_objects(
                    "access",
                    [
                        ("user_uuid", AttributeType::String),
                        ("space_role", AttributeType::String),
                    ],
                ))
                .attribute(super::computed_objects(
                    "group_access",
                    [
                        ("group_uuid", AttributeType::String),
                        ("space_role", AttributeType::String),
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
impl DataSourceWithConfigure for SpaceDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

#[derive(Default)]
pub struct SpacesDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl SpacesDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let project_uuid = required(config, "project_uuid")?;
        let root_only = values::bool_or(config, "root_only", false);

        let service = SpacesService::new(client);
        let spaces = if root_only {
            service.list_root(&project_uuid).await
        } else {
            service.list(&project_uuid).await
        }
        .map_err(|e| super::api_error("Failed to list spaces", e))?;

        Ok(Object::new()
            .set("id", project_uuid.as_str())
            .set("project_uuid", project_uuid.as_str())
            .set("root_only", root_only)
            .set_objects(
                "spaces",
                spaces.iter().map(|s| {
                    Object::new()
                        .set("space_uuid", s.uuid.as_str())
                        .set("name", s.name.as_str())
                        .set("is_private", s.is_private)
                        .set("parent_space_uuid", s.parent_space_uuid.clone())
                        .set("path", s.path.clone())
                }),
            )
            .build())
    }
}

#[async_trait]
impl DataSource for SpacesDataSource {
    fn type_name(&self) -> &str {
        "lightdash_spaces"
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
                .description("Spaces of a project")
                .attribute(super::computed_string("id"))
                .attribute(super::required_string("project_uuid", "Project to list"))
                .attribute(
                    AttributeBuilder::new("root_only", AttributeType::Bool)
                        .description("Only return top-level spaces")
                        .optional()
                        .build(),
                )
                .attribute(super::computed_objects(
                    "spaces",
                    [
                        ("space_uuid", AttributeType::String),
                        ("name", AttributeType::String),
                        ("is_private", AttributeType::Bool),
                        ("parent_space_uuid", AttributeType::String),
                        ("path", AttributeType::String),
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
impl DataSourceWithConfigure for SpacesDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

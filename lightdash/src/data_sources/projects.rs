//! Project lookups and project access listings

use crate::provider_data::{client_of, LightdashProviderData};
use crate::services::ProjectsService;
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
use tracing::debug;

fn project_uuid(config: &DynamicValue) -> Result<String, Diagnostic> {
    values::string(config, "project_uuid").ok_or_else(|| {
        Diagnostic::error("Missing project_uuid", "The 'project_uuid' attribute is required")
            .with_attribute(AttributePath::new("project_uuid"))
    })
}

#[derive(Default)]
pub struct ProjectDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl ProjectDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let project_uuid = project_uuid(config)?;
        let project = client
            .projects()
            .get(&project_uuid)
            .await
            .map_err(|e| super::api_error("Failed to read project", e))?;

        Ok(Object::new()
            .set("id", project.project_uuid.as_str())
            .set("project_uuid", project.project_uuid.as_str())
            .set("organization_uuid", project.organization_uuid.as_str())
            .set("name", project.name.as_str())
            .set("type", project.project_type.clone())
            .set("scheduler_timezone", project.scheduler_timezone.clone())
            .set("dbt_version", project.dbt_version.clone())
            .set("upstream_project_uuid", project.upstream_project_uuid.clone())
            .build())
    }
}

#[async_trait]
impl DataSource for ProjectDataSource {
    fn type_name(&self) -> &str {
        "lightdash_project"
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
                .description("A single Lightdash project")
                .attribute(super::computed_string("id"))
                .attribute(super::required_string("project_uuid", "Project to read"))
                .attribute(super::computed_string("organization_uuid"))
                .attribute(super::computed_string("name"))
                .attribute(super::computed_string("type"))
                .attribute(super::computed_string("scheduler_timezone"))
                .attribute(super::computed_string("dbt_version"))
                .attribute(super::computed_string("upstream_project_uuid"))
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
impl DataSourceWithConfigure for ProjectDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

#[derive(Default)]
pub struct ProjectsDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl ProjectsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let projects = ProjectsService::new(client)
            .list()
            .await
            .map_err(|e| super::api_error("Failed to list projects", e))?;

        Ok(Object::new()
            .set("id", "projects")
            .set_objects(
                "projects",
                projects.iter().map(|p| {
                    Object::new()
                        .set("project_uuid", p.project_uuid.as_str())
                        .set("name", p.name.as_str())
                        .set("type", p.project_type.clone())
                        .set("warehouse_type", p.warehouse_type.clone())
                }),
            )
            .build())
    }
}

#[async_trait]
impl DataSource for ProjectsDataSource {
    fn type_name(&self) -> &str {
        "lightdash_projects"
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
                .description("Every project in the organization")
                .attribute(super::computed_string("id"))
                .attribute(super::computed_objects(
                    "projects",
                    [
                        ("project_uuid", AttributeType::String),
                        ("name", AttributeType::String),
                        ("type", AttributeType::String),
                        ("warehouse_type", AttributeType::String),
                    ],
                ))
                .build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        super::respond(request.config, self.lookup().await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for ProjectsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

/// Direct user and group access to a project
#[derive(Default)]
pub struct ProjectRoleMembersDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl ProjectRoleMembersDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let project_uuid = project_uuid(config)?;

        let projects = client.projects();
        let (mut members, mut groups) = futures::try_join!(
            projects.list_access(&project_uuid),
            projects.list_group_access(&project_uuid),
        )
        .map_err(|e| super::api_error("Failed to list project access", e))?;
        members.sort_by(|a, b| a.user_uuid.cmp(&b.user_uuid));
        groups.sort_by(|a, b| a.group_uuid.cmp(&b.group_uuid));
        debug!(%project_uuid, members = members.len(), groups = groups.len(), "read project access");

        Ok(Object::new()
            .set("id", project_uuid.as_str())
            .set("project_uuid", project_uuid.as_str())
            .set_objects(
                "members",
                members.iter().map(|m| {
                    Object::new()
                        .set("user_uuid", m.user_uuid.as_str())
                        .set("email", m.email.as_str())
                        .set("role", m.role.as_str())
                }),
            )
            .set_objects(
                "groups",
                groups.iter().map(|g| {
                    Object::new()
                        .set("group_uuid", g.group_uuid.as_str())
                        .set("role", g.role.as_str())
                }),
            )
            .build())
    }
}

#[async_trait]
impl DataSource for ProjectRoleMembersDataSource {
    fn type_name(&self) -> &str {
        "lightdash_project_role_members"
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
                .description("Users and groups with direct access to a project")
                .attribute(super::computed_string("id"))
                .attribute(super::required_string("project_uuid", "Project to inspect"))
                .attribute(super::computed_objects(
                    "members",
                    [
                        ("user_uuid", AttributeType::String),
                        ("email", AttributeType::String),
                        ("role", AttributeType::String),
                    ],
                ))
                .attribute(super::computed_objects(
                    "groups",
                    [
                        ("group_uuid", AttributeType::String),
                        ("role", AttributeType::String),
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
impl DataSourceWithConfigure for ProjectRoleMembersDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

//! Group lookups

use crate::provider_data::{client_of, LightdashProviderData};
use crate::services::GroupsService;
use crate::values::{self, Object};
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

#[derive(Default)]
pub struct GroupDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl GroupDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let service = GroupsService::new(client);

        let group_uuid = match (values::string(config, "group_uuid"), values::string(config, "name")) {
            (Some(uuid), _) => uuid,
            (None, Some(name)) => service
                .find_by_name(&name)
                .await
                .map_err(|e| super::api_error("Failed to list groups", e))?
                .map(|g| g.uuid)
                .ok_or_else(|| {
                    Diagnostic::error(
                        "Group not found",
                        format!("No group is named '{}'", name),
                    )
                })?,
            (None, None) => {
                return Err(Diagnostic::error(
                    "Missing group lookup key",
                    "One of 'group_uuid' or 'name' must be set",
                ))
            }
        };

        let group = service
            .get_with_members(&group_uuid)
            .await
            .map_err(|e| super::api_error("Failed to read group", e))?;
        let mut members = group.member_user_uuids();
        members.sort();

        Ok(Object::new()
            .set("id", group.uuid.as_str())
            .set("group_uuid", group.uuid.as_str())
            .set("name", group.name.as_str())
            .set("organization_uuid", group.organization_uuid.as_str())
            .set("created_at", group.created_at.clone())
            .set_strings("members", members)
            .build())
    }
}

#[async_trait]
impl DataSource for GroupDataSource {
    fn type_name(&self) -> &str {
        "lightdash_group"
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
                .description("Looks up a group by uuid or exact name")
                .attribute(super::computed_string("id"))
                .attribute(
                    AttributeBuilder::new("group_uuid", AttributeType::String)
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("name", AttributeType::String)
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(super::computed_string("organization_uuid"))
                .attribute(super::computed_string("created_at"))
                .attribute(super::computed(
                    "members",
                    AttributeType::Set(Box::new(AttributeType::String)),
                ))
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];
        if values::is_set(&request.config, "group_uuid") == values::is_set(&request.config, "name")
        {
            diagnostics.push(Diagnostic::error(
                "Invalid group lookup",
                "Exactly one of 'group_uuid' or 'name' must be set",
            ));
        }
        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let result = self.lookup(&request.config).await;
        super::respond(request.config, result)
    }
}

#[async_trait]
impl DataSourceWithConfigure for GroupDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

#[derive(Default)]
pub struct OrganizationGroupsDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl OrganizationGroupsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let groups = GroupsService::new(client)
            .list_all()
            .await
            .map_err(|e| super::api_error("Failed to list groups", e))?;

        Ok(Object::new()
            .set("id", "organization_groups")
            .set_objects(
                "groups",
                groups.iter().map(|g| {
                    Object::new()
                        .set("group_uuid", g.uuid.as_str())
                        .set("name", g.name.as_str())
                        .set("created_at", g.created_at.clone())
                }),
            )
            .build())
    }
}

#[async_trait]
impl DataSource for OrganizationGroupsDataSource {
    fn type_name(&self) -> &str {
        "lightdash_organization_groups"
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
                .description("Every group in the organization")
                .attribute(super::computed_string("id"))
                .attribute(super::computed_objects(
                    "groups",
                    [
                        ("group_uuid", AttributeType::String),
                        ("name", AttributeType::String),
                        ("created_at", AttributeType::String),
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
impl DataSourceWithConfigure for OrganizationGroupsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

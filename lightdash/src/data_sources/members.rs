//! Organization member lookups

use crate::api::members::OrganizationMember;
use crate::provider_data::{client_of, LightdashProviderData};
use crate::services::MembersService;
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
use tracing::debug;

fn member_fields(member: &OrganizationMember) -> Object {
    Object::new()
        .set("user_uuid", member.user_uuid.as_str())
        .set("email", member.email.as_str())
        .set("first_name", member.first_name.as_str())
        .set("last_name", member.last_name.as_str())
        .set("role", member.role.as_str())
        .set("is_active", member.is_active)
}

#[derive(Default)]
pub struct OrganizationMemberDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl OrganizationMemberDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let service = MembersService::new(client);

        let member = match (values::string(config, "user_uuid"), values::string(config, "email")) {
            (Some(uuid), _) => service
                .get_by_uuid(&uuid)
                .await
                .map_err(|e| super::api_error("Failed to read organization member", e))?,
            (None, Some(email)) => service
                .find_by_email(&email)
                .await
                .map_err(|e| super::api_error("Failed to list organization members", e))?
                .ok_or_else(|| {
                    Diagnostic::error(
                        "Member not found",
                        format!("No organization member has the email '{}'", email),
                    )
                })?,
            (None, None) => {
                return Err(Diagnostic::error(
                    "Missing member lookup key",
                    "One of 'user_uuid' or 'email' must be set",
                ))
            }
        };
        debug!(user_uuid = %member.user_uuid, "found organization member");

        Ok(member_fields(&member)
            .set("id", member.user_uuid.as_str())
            .set("organization_uuid", member.organization_uuid.as_str())
            .build())
    }
}

#[async_trait]
impl DataSource for OrganizationMemberDataSource {
    fn type_name(&self) -> &str {
        "lightdash_organization_member"
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
                .description("Looks up an organization member by uuid or email")
                .attribute(super::computed_string("id"))
                .attribute(
                    AttributeBuilder::new("user_uuid", AttributeType::String)
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("email", AttributeType::String)
                        .description("Matched case-insensitively")
                        .optional()
                        .computed()
                        .build(),
                )
                .attribute(super::computed_string("first_name"))
                .attribute(super::computed_string("last_name"))
                .attribute(super::computed_string("role"))
                .attribute(super::computed_string("organization_uuid"))
                .attribute(super::computed("is_active", AttributeType::Bool))
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let by_uuid = values::is_set(&request.config, "user_uuid");
        let by_email = values::is_set(&request.config, "email");
        let mut diagnostics = vec![];
        if by_uuid == by_email {
            diagnostics.push(Diagnostic::error(
                "Invalid member lookup",
                "Exactly one of 'user_uuid' or 'email' must be set",
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
impl DataSourceWithConfigure for OrganizationMemberDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

#[derive(Default)]
pub struct OrganizationMembersDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl OrganizationMembersDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let members = MembersService::new(client)
            .list_all()
            .await
            .map_err(|e| super::api_error("Failed to list organization members", e))?;

        Ok(Object::new()
            .set("id", "organization_members")
            .set_objects("members", members.iter().map(member_fields))
            .build())
    }
}

#[async_trait]
impl DataSource for OrganizationMembersDataSource {
    fn type_name(&self) -> &str {
        "lightdash_organization_members"
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
                .description("Every member of the organization")
                .attribute(super::computed_string("id"))
                .attribute(super::computed_objects(
                    "members",
                    [
                        ("user_uuid", AttributeType::String),
                        ("email", AttributeType::String),
                        ("first_name", AttributeType::String),
                        ("last_name", AttributeType::String),
                        ("role", AttributeType::String),
                        ("is_active", AttributeType::Bool),
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
impl DataSourceWithConfigure for OrganizationMembersDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

//! The organization behind the API key, and the key's own user

use crate::provider_data::{client_of, LightdashProviderData};
use crate::values::Object;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceMetadataRequest, DataSourceMetadataResponse, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tracing::debug;

#[derive(Default)]
pub struct OrganizationDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl OrganizationDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let org = client
            .organization()
            .get()
            .await
            .map_err(|e| super::api_error("Failed to read organization", e))?;
        debug!(organization_uuid = %org.organization_uuid, "read organization");

        Ok(Object::new()
            .set("id", org.organization_uuid.as_str())
            .set("organization_uuid", org.organization_uuid.as_str())
            .set("name", org.name.as_str())
            .set("default_project_uuid", org.default_project_uuid.clone())
            .build())
    }
}

#[async_trait]
impl DataSource for OrganizationDataSource {
    fn type_name(&self) -> &str {
        "lightdash_organization"
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
                .description("The Lightdash organization the API key belongs to")
                .attribute(super::computed_string("id"))
                .attribute(super::computed_string("organization_uuid"))
                .attribute(super::computed_string("name"))
                .attribute(super::computed_string("default_project_uuid"))
                .build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        super::respond(request.config, self.lookup().await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for OrganizationDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        super::configure(&mut self.provider_data, request)
    }
}

#[derive(Default)]
pub struct AuthenticatedUserDataSource {
    provider_data: Option<LightdashProviderData>,
}

impl AuthenticatedUserDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lookup(&self) -> Result<DynamicValue, Diagnostic> {
        let client = client_of(&self.provider_data)?;
        let user = client
            .user()
            .get()
            .await
            .map_err(|e| super::api_error("Failed to read authenticated user", e))?;

        Ok(Object::new()
            .set("id", user.user_uuid.as_str())
            .set("user_uuid", user.user_uuid.as_str())
            .set("email", user.email.clone())
            .set("first_name", user.first_name.as_str())
            .set("last_name", user.last_name.as_str())
            .set("organization_uuid", user.organization_uuid.clone())
            .set("organization_name", user.organization_name.clone())
            .set("role", user.role.clone())
            .set("is_active", user.is_active)
            .build())
    }
}

#[async_trait]
impl DataSource for AuthenticatedUserDataSource {
    fn type_name(&self) -> &str {
        "lightdash_authenticated_user"
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
                .description("The user owning the configured API key")
                .attribute(super::computed_string("id"))
                .attribute(super::computed_string("user_uuid"))
                .attribute(super::computed_string("email"))
                .attribute(super::computed_string("first_name"))
                .attribute(super::computed_string("last_name"))
                .attribute(super::computed_string("organization_uuid"))
                .attribute(super::computed_string("organization_name"))
                .attribute(super::computed_string("role"))
                .attribute(super::computed("is_active", AttributeType::Bool))
                .build(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        super::respond(request.config, self.lookup().await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for AuthenticatedUserDataSource {
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
    use crate::values;
    use mockito::Server;

    #[tokio::test(flavor = "multi_thread")]
    async fn reads_organization() {
        let mut server = Server::new_async().await;
        let _org = server
            .mock("GET", "/api/v1/org")
            .with_body(r#"{"status":"ok","results":{"organizationUuid":"org-1","name":"Acme","needsProject":false}}"#)
            .create_async()
            .await;

        let data_source = configured(OrganizationDataSource::new(), &server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                read_request("lightdash_organization", DynamicValue::object()),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(values::string(&response.state, "name").as_deref(), Some("Acme"));
        assert!(!values::is_set(&response.state, "default_project_uuid"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reads_authenticated_user() {
        let mut server = Server::new_async().await;
        let _user = server
            .mock("GET", "/api/v1/user")
            .with_body(r#"{"status":"ok","results":{"userUuid":"u1","email":"ada@example.com","firstName":"Ada","lastName":"Lovelace","organizationUuid":"org-1","role":"admin","isActive":true}}"#)
            .create_async()
            .await;

        let data_source = configured(AuthenticatedUserDataSource::new(), &server.url()).await;
        let response = data_source
            .read(
                Context::new(),
                read_request("lightdash_authenticated_user", DynamicValue::object()),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            values::string(&response.state, "email").as_deref(),
            Some("ada@example.com")
        );
        assert!(values::bool_or(&response.state, "is_active", false));
    }

    #[tokio::test]
    async fn unconfigured_read_reports_error() {
        let data_source = OrganizationDataSource::new();
        let response = data_source
            .read(
                Context::new(),
                read_request("lightdash_organization", DynamicValue::object()),
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}

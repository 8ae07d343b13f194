//! Organization API implementation

use super::common::ensure_uuid;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub organization_uuid: String,
    pub name: String,
    #[serde(default)]
    pub default_project_uuid: Option<String>,
    #[serde(default)]
    pub needs_project: bool,
}

pub struct OrganizationApi<'a> {
    client: &'a Client,
}

impl<'a> OrganizationApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/org
    pub async fn get(&self) -> Result<Organization, ApiError> {
        let org: Organization = self.client.get("/api/v1/org").await?;
        ensure_uuid(&org.organization_uuid, "organization uuid")?;
        Ok(org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn get_organization() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/org")
            .with_body(
                r#"{"status":"ok","results":{"organizationUuid":"org-1","name":"Acme","defaultProjectUuid":"p1","needsProject":false,"chartColors":[]}}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let org = client.organization().get().await.unwrap();
        assert_eq!(org.organization_uuid, "org-1");
        assert_eq!(org.name, "Acme");
        assert_eq!(org.default_project_uuid.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn blank_organization_uuid_is_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/org")
            .with_body(r#"{"status":"ok","results":{"organizationUuid":"","name":"Acme"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let err = client.organization().get().await.unwrap_err();
        assert!(matches!(err, ApiError::MissingUuid(_)));
    }
}

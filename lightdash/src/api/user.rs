//! Authenticated user API implementation

use super::common::ensure_uuid;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// The user owning the API key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_uuid: String,
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub organization_uuid: Option<String>,
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

pub struct UserApi<'a> {
    client: &'a Client,
}

impl<'a> UserApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/user
    pub async fn get(&self) -> Result<AuthenticatedUser, ApiError> {
        let user: AuthenticatedUser = self.client.get("/api/v1/user").await?;
        ensure_uuid(&user.user_uuid, "user uuid")?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn get_authenticated_user() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/user")
            .with_body(
                r#"{"status":"ok","results":{"userUuid":"u1","email":"ada@example.com","firstName":"Ada","lastName":"Lovelace","organizationUuid":"org-1","organizationName":"Acme","role":"admin","isActive":true}}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let user = client.user().get().await.unwrap();
        assert_eq!(user.user_uuid, "u1");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.role.as_deref(), Some("admin"));
        assert!(user.is_active);
    }
}

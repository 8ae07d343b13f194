//! Organization warehouse credentials API implementation

use super::common::{ensure_uuid, segment};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseCredentials {
    pub uuid: String,
    #[serde(default)]
    pub organization_uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub warehouse_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Secrets are sent flat alongside `type`; the server never echoes them back
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsPayload {
    #[serde(rename = "type")]
    pub warehouse_type: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarehouseCredentialsRequest {
    pub name: String,
    pub description: Option<String>,
    pub credentials: CredentialsPayload,
}

pub struct WarehouseCredentialsApi<'a> {
    client: &'a Client,
}

const BASE_PATH: &str = "/api/v1/org/warehouse-credentials";

impl<'a> WarehouseCredentialsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/org/warehouse-credentials
    pub async fn list(&self) -> Result<Vec<WarehouseCredentials>, ApiError> {
        let creds: Vec<WarehouseCredentials> = self.client.get(BASE_PATH).await?;
        for c in &creds {
            ensure_uuid(&c.uuid, "warehouse credentials uuid")?;
        }
        Ok(creds)
    }

    /// GET /api/v1/org/warehouse-credentials/{credentials}
    pub async fn get(&self, credentials_uuid: &str) -> Result<WarehouseCredentials, ApiError> {
        let creds: WarehouseCredentials = self
            .client
            .get(&format!("{}/{}", BASE_PATH, segment(credentials_uuid)))
            .await?;
        ensure_uuid(&creds.uuid, "warehouse credentials uuid")?;
        Ok(creds)
    }

    /// POST /api/v1/org/warehouse-credentials
    pub async fn create(
        &self,
        request: &WarehouseCredentialsRequest,
    ) -> Result<WarehouseCredentials, ApiError> {
        let creds: WarehouseCredentials = self.client.post(BASE_PATH, request).await?;
        ensure_uuid(&creds.uuid, "warehouse credentials uuid")?;
        Ok(creds)
    }

    /// PATCH /api/v1/org/warehouse-credentials/{credentials}
    pub async fn update(
        &self,
        credentials_uuid: &str,
        request: &WarehouseCredentialsRequest,
    ) -> Result<WarehouseCredentials, ApiError> {
        let creds: WarehouseCredentials = self
            .client
            .patch(
                &format!("{}/{}", BASE_PATH, segment(credentials_uuid)),
                request,
            )
            .await?;
        ensure_uuid(&creds.uuid, "warehouse credentials uuid")?;
        Ok(creds)
    }

    /// DELETE /api/v1/org/warehouse-credentials/{credentials}
    pub async fn delete(&self, credentials_uuid: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!("{}/{}", BASE_PATH, segment(credentials_uuid)))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credentials_payload_flattens_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("user".to_string(), json!("svc"));
        fields.insert("password".to_string(), json!("hunter2"));
        let request = WarehouseCredentialsRequest {
            name: "Snowflake prod".to_string(),
            description: None,
            credentials: CredentialsPayload {
                warehouse_type: "snowflake".to_string(),
                fields,
            },
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "name": "Snowflake prod",
                "description": null,
                "credentials": {"type": "snowflake", "user": "svc", "password": "hunter2"}
            })
        );
    }
}

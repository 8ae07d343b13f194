//! Organization member API implementation

use super::common::{ensure_uuid, segment, Paginated, PaginationParams};
use super::roles::OrganizationMemberRole;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMember {
    pub user_uuid: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub organization_uuid: String,
    pub role: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_pending: Option<bool>,
    #[serde(default)]
    pub is_invite_expired: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateMemberRoleRequest {
    pub role: OrganizationMemberRole,
}

pub struct MembersApi<'a> {
    client: &'a Client,
}

impl<'a> MembersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/org/users, one page
    pub async fn list_page(
        &self,
        pagination: PaginationParams,
    ) -> Result<Paginated<OrganizationMember>, ApiError> {
        let page: Paginated<OrganizationMember> = self
            .client
            .get_with_params("/api/v1/org/users", &pagination.to_query_params())
            .await?;
        for member in &page.data {
            ensure_uuid(&member.user_uuid, "user uuid")?;
        }
        Ok(page)
    }

    /// GET /api/v1/org/users/{user}
    pub async fn get(&self, user_uuid: &str) -> Result<OrganizationMember, ApiError> {
        let member: OrganizationMember = self
            .client
            .get(&format!("/api/v1/org/users/{}", segment(user_uuid)))
            .await?;
        ensure_uuid(&member.user_uuid, "user uuid")?;
        Ok(member)
    }

    /// PATCH /api/v1/org/users/{user}
    pub async fn update_role(
        &self,
        user_uuid: &str,
        role: OrganizationMemberRole,
    ) -> Result<OrganizationMember, ApiError> {
        let member: OrganizationMember = self
            .client
            .patch(
                &format!("/api/v1/org/users/{}", segment(user_uuid)),
                &UpdateMemberRoleRequest { role },
            )
            .await?;
        ensure_uuid(&member.user_uuid, "user uuid")?;
        Ok(member)
    }
}

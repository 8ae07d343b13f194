//! Space API implementation

use super::common::{ensure_uuid, segment};
use super::roles::SpaceMemberRole;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// Entry of GET /api/v1/projects/{project}/spaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSummary {
    pub uuid: String,
    pub name: String,
    pub project_uuid: String,
    #[serde(default)]
    pub organization_uuid: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub parent_space_uuid: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl SpaceSummary {
    pub fn is_root(&self) -> bool {
        self.parent_space_uuid.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    pub uuid: String,
    pub name: String,
    pub project_uuid: String,
    pub organization_uuid: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub parent_space_uuid: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub access: Vec<SpaceShare>,
    #[serde(default)]
    pub groups_access: Vec<SpaceGroupAccess>,
}

impl Space {
    pub fn is_root(&self) -> bool {
        self.parent_space_uuid.is_none()
    }
}

/// A user who can see the space, directly or through inheritance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceShare {
    pub user_uuid: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub has_direct_access: bool,
    #[serde(default)]
    pub inherited_role: Option<String>,
    #[serde(default)]
    pub inherited_from: Option<String>,
    #[serde(default)]
    pub project_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceGroupAccess {
    pub group_uuid: String,
    #[serde(default)]
    pub group_name: String,
    pub space_role: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_space_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpaceRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSpaceWithUserRequest {
    pub user_uuid: String,
    pub space_role: SpaceMemberRole,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSpaceWithGroupRequest {
    pub group_uuid: String,
    pub space_role: SpaceMemberRole,
}

pub struct SpacesApi<'a> {
    client: &'a Client,
}

fn space_path(project_uuid: &str, space_uuid: &str) -> String {
    format!(
        "/api/v1/projects/{}/spaces/{}",
        segment(project_uuid),
        segment(space_uuid)
    )
}

fn check_space(space: &Space) -> Result<(), ApiError> {
    ensure_uuid(&space.uuid, "space uuid")?;
    for share in &space.access {
        ensure_uuid(&share.user_uuid, "space member user uuid")?;
    }
    for group in &space.groups_access {
        ensure_uuid(&group.group_uuid, "space group uuid")?;
    }
    Ok(())
}

impl<'a> SpacesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/projects/{project}/spaces
    pub async fn list(&self, project_uuid: &str) -> Result<Vec<SpaceSummary>, ApiError> {
        let spaces: Vec<SpaceSummary> = self
            .client
            .get(&format!("/api/v1/projects/{}/spaces", segment(project_uuid)))
            .await?;
        for space in &spaces {
            ensure_uuid(&space.uuid, "space uuid")?;
        }
        Ok(spaces)
    }

    /// GET /api/v1/projects/{project}/spaces/{space}
    pub async fn get(&self, project_uuid: &str, space_uuid: &str) -> Result<Space, ApiError> {
        let space: Space = self.client.get(&space_path(project_uuid, space_uuid)).await?;
        check_space(&space)?;
        Ok(space)
    }

    /// POST /api/v1/projects/{project}/spaces
    pub async fn create(
        &self,
        project_uuid: &str,
        request: &CreateSpaceRequest,
    ) -> Result<Space, ApiError> {
        let space: Space = self
            .client
            .post(
                &format!("/api/v1/projects/{}/spaces", segment(project_uuid)),
                request,
            )
            .await?;
        check_space(&space)?;
        Ok(space)
    }

    /// PATCH /api/v1/projects/{project}/spaces/{space}
    pub async fn update(
        &self,
        project_uuid: &str,
        space_uuid: &str,
        request: &UpdateSpaceRequest,
    ) -> Result<(), ApiError> {
        self.client
            .patch::<serde_json::Value, _>(&space_path(project_uuid, space_uuid), request)
            .await
            .map(|_| ())
    }

    /// DELETE /api/v1/projects/{project}/spaces/{space}
    pub async fn delete(&self, project_uuid: &str, space_uuid: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&space_path(project_uuid, space_uuid))
            .await
            .map(|_| ())
    }

    /// POST /api/v1/projects/{project}/spaces/{space}/share
    pub async fn share_with_user(
        &self,
        project_uuid: &str,
        space_uuid: &str,
        request: &ShareSpaceWithUserRequest,
    ) -> Result<(), ApiError> {
        self.client
            .post::<serde_json::Value, _>(
                &format!("{}/share", space_path(project_uuid, space_uuid)),
                request,
            )
            .await
            .map(|_| ())
    }

    /// DELETE /api/v1/projects/{project}/spaces/{space}/share/{user}
    pub async fn unshare_with_user(
        &self,
        project_uuid: &str,
        space_uuid: &str,
        user_uuid: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!(
                "{}/share/{}",
                space_path(project_uuid, space_uuid),
                segment(user_uuid)
            ))
            .await
            .map(|_| ())
    }

    /// POST /api/v1/projects/{project}/spaces/{space}/group/share
    pub async fn share_with_group(
        &self,
        project_uuid: &str,
        space_uuid: &str,
        request: &ShareSpaceWithGroupRequest,
    ) -> Result<(), ApiError> {
        self.client
            .post::<serde_json::Value, _>(
                &format!("{}/group/share", space_path(project_uuid, space_uuid)),
                request,
            )
            .await
            .map(|_| ())
    }

    /// DELETE /api/v1/projects/{project}/spaces/{space}/group/share/{group}
    pub async fn unshare_with_group(
        &self,
        project_uuid: &str,
        space_uuid: &str,
        group_uuid: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!(
                "{}/group/share/{}",
                space_path(project_uuid, space_uuid),
                segment(group_uuid)
            ))
            .await
            .map(|_| ())
    }
}

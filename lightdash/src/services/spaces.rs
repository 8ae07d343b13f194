use crate::api::spaces::{Space, SpaceSummary};
use crate::api::{ApiError, Client};
use std::collections::BTreeMap;

/// Access granted on the space itself, keyed by user or group uuid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectAccess {
    pub users: BTreeMap<String, String>,
    pub groups: BTreeMap<String, String>,
}

impl DirectAccess {
    /// Inherited entries (project or parent space) are left out
    pub fn of(space: &Space) -> Self {
        let users = space
            .access
            .iter()
            .filter(|share| share.has_direct_access)
            .map(|share| (share.user_uuid.clone(), share.role.clone()))
            .collect();
        let groups = space
            .groups_access
            .iter()
            .map(|group| (group.group_uuid.clone(), group.space_role.clone()))
            .collect();
        Self { users, groups }
    }
}

pub struct SpacesService<'a> {
    client: &'a Client,
}

impl<'a> SpacesService<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self, project_uuid: &str) -> Result<Vec<SpaceSummary>, ApiError> {
        self.client.spaces().list(project_uuid).await
    }

    pub async fn list_root(&self, project_uuid: &str) -> Result<Vec<SpaceSummary>, ApiError> {
        Ok(self
            .list(project_uuid)
            .await?
            .into_iter()
            .filter(SpaceSummary::is_root)
            .collect())
    }

    pub async fn list_children(
        &self,
        project_uuid: &str,
        parent_space_uuid: &str,
    ) -> Result<Vec<SpaceSummary>, ApiError> {
        Ok(self
            .list(project_uuid)
            .await?
            .into_iter()
            .filter(|s| s.parent_space_uuid.as_deref() == Some(parent_space_uuid))
            .collect())
    }

    pub async fn get(&self, project_uuid: &str, space_uuid: &str) -> Result<Space, ApiError> {
        self.client.spaces().get(project_uuid, space_uuid).await
    }

    pub async fn direct_access(
        &self,
        project_uuid: &str,
        space_uuid: &str,
    ) -> Result<DirectAccess, ApiError> {
        Ok(DirectAccess::of(&self.get(project_uuid, space_uuid).await?))
    }
}

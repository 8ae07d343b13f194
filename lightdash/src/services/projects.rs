use crate::api::projects::{ProjectGroupAccess, ProjectMember, ProjectSummary};
use crate::api::{ApiError, Client};

pub struct ProjectsService<'a> {
    client: &'a Client,
}

impl<'a> ProjectsService<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        self.client.projects().list().await
    }

    pub async fn find_by_uuid(&self, project_uuid: &str) -> Result<Option<ProjectSummary>, ApiError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|p| p.project_uuid == project_uuid))
    }

    /// The user's direct project access, if any
    pub async fn find_project_member(
        &self,
        project_uuid: &str,
        user_uuid: &str,
    ) -> Result<Option<ProjectMember>, ApiError> {
        Ok(self
            .client
            .projects()
            .list_access(project_uuid)
            .await?
            .into_iter()
            .find(|m| m.user_uuid == user_uuid))
    }

    pub async fn find_project_group_access(
        &self,
        project_uuid: &str,
        group_uuid: &str,
    ) -> Result<Option<ProjectGroupAccess>, ApiError> {
        Ok(self
            .client
            .projects()
            .list_group_access(project_uuid)
            .await?
            .into_iter()
            .find(|a| a.group_uuid == group_uuid))
    }
}

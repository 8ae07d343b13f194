//! Project API implementation: projects, scheduler settings and project access

use super::common::{ensure_uuid, segment};
use super::roles::ProjectMemberRole;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

/// Entry of GET /api/v1/org/projects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub created_by_user_uuid: Option<String>,
    #[serde(default)]
    pub upstream_project_uuid: Option<String>,
    #[serde(default)]
    pub warehouse_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_uuid: String,
    pub organization_uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub scheduler_timezone: Option<String>,
    #[serde(default)]
    pub dbt_version: Option<String>,
    #[serde(default)]
    pub upstream_project_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerSettings {
    pub scheduler_timezone: String,
}

/// A user with direct access to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub project_uuid: String,
    pub user_uuid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGroupAccess {
    pub project_uuid: String,
    pub group_uuid: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantProjectAccessRequest {
    pub email: String,
    pub role: ProjectMemberRole,
    pub send_email: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProjectAccessRequest {
    pub role: ProjectMemberRole,
}

pub struct ProjectsApi<'a> {
    client: &'a Client,
}

impl<'a> ProjectsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/org/projects
    pub async fn list(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        let projects: Vec<ProjectSummary> = self.client.get("/api/v1/org/projects").await?;
        for project in &projects {
            ensure_uuid(&project.project_uuid, "project uuid")?;
        }
        Ok(projects)
    }

    /// GET /api/v1/projects/{project}
    pub async fn get(&self, project_uuid: &str) -> Result<Project, ApiError> {
        let project: Project = self
            .client
            .get(&format!("/api/v1/projects/{}", segment(project_uuid)))
            .await?;
        ensure_uuid(&project.project_uuid, "project uuid")?;
        Ok(project)
    }

    /// PATCH /api/v1/projects/{project}/schedulerSettings
    pub async fn update_scheduler_settings(
        &self,
        project_uuid: &str,
        settings: &SchedulerSettings,
    ) -> Result<(), ApiError> {
        self.client
            .patch::<serde_json::Value, _>(
                &format!(
                    "/api/v1/projects/{}/schedulerSettings",
                    segment(project_uuid)
                ),
                settings,
            )
            .await
            .map(|_| ())
    }

    /// GET /api/v1/projects/{project}/access
    pub async fn list_access(&self, project_uuid: &str) -> Result<Vec<ProjectMember>, ApiError> {
        let members: Vec<ProjectMember> = self
            .client
            .get(&format!("/api/v1/projects/{}/access", segment(project_uuid)))
            .await?;
        for member in &members {
            ensure_uuid(&member.user_uuid, "user uuid")?;
        }
        Ok(members)
    }

    /// POST /api/v1/projects/{project}/access
    pub async fn grant_access(
        &self,
        project_uuid: &str,
        request: &GrantProjectAccessRequest,
    ) -> Result<(), ApiError> {
        self.client
            .post::<serde_json::Value, _>(
                &format!("/api/v1/projects/{}/access", segment(project_uuid)),
                request,
            )
            .await
            .map(|_| ())
    }

    /// PATCH /api/v1/projects/{project}/access/{user}
    pub async fn update_access(
        &self,
        project_uuid: &str,
        user_uuid: &str,
        request: &UpdateProjectAccessRequest,
    ) -> Result<(), ApiError> {
        self.client
            .patch::<serde_json::Value, _>(
                &format!(
                    "/api/v1/projects/{}/access/{}",
                    segment(project_uuid),
                    segment(user_uuid)
                ),
                request,
            )
            .await
            .map(|_| ())
    }

    /// DELETE /api/v1/projects/{project}/access/{user}
    pub async fn revoke_access(&self, project_uuid: &str, user_uuid: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!(
                "/api/v1/projects/{}/access/{}",
                segment(project_uuid),
                segment(user_uuid)
            ))
            .await
            .map(|_| ())
    }

    /// GET /api/v1/projects/{project}/groupAccesses
    pub async fn list_group_access(
        &self,
        project_uuid: &str,
    ) -> Result<Vec<ProjectGroupAccess>, ApiError> {
        let accesses: Vec<ProjectGroupAccess> = self
            .client
            .get(&format!(
                "/api/v1/projects/{}/groupAccesses",
                segment(project_uuid)
            ))
            .await?;
        for access in &accesses {
            ensure_uuid(&access.group_uuid, "group uuid")?;
        }
        Ok(accesses)
    }
}

//! Group API implementation, including group access to projects

use super::common::{ensure_uuid, segment, ApiQueryParams, Paginated, PaginationParams, UserUuidRef};
use super::roles::ProjectMemberRole;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub organization_uuid: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub user_uuid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupWithMembers {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub organization_uuid: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub members: Vec<GroupMember>,
    #[serde(default)]
    pub member_uuids: Vec<String>,
}

impl GroupWithMembers {
    /// Member uuids from whichever field the server populated
    pub fn member_user_uuids(&self) -> Vec<String> {
        if !self.member_uuids.is_empty() {
            return self.member_uuids.clone();
        }
        self.members.iter().map(|m| m.user_uuid.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub members: Vec<UserUuidRef>,
}

/// `members: None` leaves membership untouched
#[derive(Debug, Clone, Serialize)]
pub struct UpdateGroupRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<UserUuidRef>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupProjectAccessRequest {
    pub role: ProjectMemberRole,
}

pub struct GroupsApi<'a> {
    client: &'a Client,
}

fn group_path(group_uuid: &str) -> String {
    format!("/api/v1/groups/{}", segment(group_uuid))
}

fn group_project_path(group_uuid: &str, project_uuid: &str) -> String {
    format!(
        "/api/v1/groups/{}/projects/{}",
        segment(group_uuid),
        segment(project_uuid)
    )
}

impl<'a> GroupsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/org/groups, one page
    pub async fn list_page(
        &self,
        pagination: PaginationParams,
    ) -> Result<Paginated<Group>, ApiError> {
        let page: Paginated<Group> = self
            .client
            .get_with_params("/api/v1/org/groups", &pagination.to_query_params())
            .await?;
        for group in &page.data {
            ensure_uuid(&group.uuid, "group uuid")?;
        }
        Ok(page)
    }

    /// POST /api/v1/org/groups
    pub async fn create(&self, request: &CreateGroupRequest) -> Result<GroupWithMembers, ApiError> {
        let group: GroupWithMembers = self.client.post("/api/v1/org/groups", request).await?;
        ensure_uuid(&group.uuid, "group uuid")?;
        Ok(group)
    }

    /// GET /api/v1/groups/{group}?includeMembers=...
    pub async fn get(&self, group_uuid: &str) -> Result<GroupWithMembers, ApiError> {
        let params = ApiQueryParams::new().add("includeMembers", 1000);
        let group: GroupWithMembers = self
            .client
            .get_with_params(&group_path(group_uuid), &params)
            .await?;
        ensure_uuid(&group.uuid, "group uuid")?;
        Ok(group)
    }

    /// PATCH /api/v1/groups/{group}
    pub async fn update(
        &self,
        group_uuid: &str,
        request: &UpdateGroupRequest,
    ) -> Result<GroupWithMembers, ApiError> {
        let group: GroupWithMembers = self.client.patch(&group_path(group_uuid), request).await?;
        ensure_uuid(&group.uuid, "group uuid")?;
        Ok(group)
    }

    /// DELETE /api/v1/groups/{group}
    pub async fn delete(&self, group_uuid: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&group_path(group_uuid))
            .await
            .map(|_| ())
    }

    /// POST /api/v1/groups/{group}/projects/{project}
    pub async fn add_project_access(
        &self,
        group_uuid: &str,
        project_uuid: &str,
        role: ProjectMemberRole,
    ) -> Result<(), ApiError> {
        self.client
            .post::<serde_json::Value, _>(
                &group_project_path(group_uuid, project_uuid),
                &GroupProjectAccessRequest { role },
            )
            .await
            .map(|_| ())
    }

    /// PATCH /api/v1/groups/{group}/projects/{project}
    pub async fn update_project_access(
        &self,
        group_uuid: &str,
        project_uuid: &str,
        role: ProjectMemberRole,
    ) -> Result<(), ApiError> {
        self.client
            .patch::<serde_json::Value, _>(
                &group_project_path(group_uuid, project_uuid),
                &GroupProjectAccessRequest { role },
            )
            .await
            .map(|_| ())
    }

    /// DELETE /api/v1/groups/{group}/projects/{project}
    pub async fn remove_project_access(
        &self,
        group_uuid: &str,
        project_uuid: &str,
    ) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&group_project_path(group_uuid, project_uuid))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn list_page_sends_pagination() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/org/groups")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("pageSize".into(), "100".into()),
            ]))
            .with_body(
                r#"{"status":"ok","results":{"data":[{"uuid":"g1","name":"Analysts","organizationUuid":"org-1","createdAt":"2024-01-01T00:00:00.000Z"}],"pagination":{"page":1,"pageSize":100,"totalPageCount":1,"totalResults":1}}}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let page = client
            .groups()
            .list_page(PaginationParams::new())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn create_group_with_members() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/org/groups")
            .match_body(Matcher::Json(json!({
                "name": "Analysts",
                "members": [{"userUuid": "u1"}]
            })))
            .with_body(
                r#"{"status":"ok","results":{"uuid":"g1","name":"Analysts","organizationUuid":"org-1","members":[{"userUuid":"u1","email":"ada@example.com"}],"memberUuids":["u1"]}}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let group = client
            .groups()
            .create(&CreateGroupRequest {
                name: "Analysts".to_string(),
                members: vec![UserUuidRef {
                    user_uuid: "u1".to_string(),
                }],
            })
            .await
            .unwrap();
        assert_eq!(group.member_user_uuids(), vec!["u1".to_string()]);
        mock.assert_async().await;
    }

    #[test]
    fn rename_only_update_omits_members() {
        let request = UpdateGroupRequest {
            name: "Analysts".to_string(),
            members: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"name": "Analysts"})
        );
    }

    #[test]
    fn member_uuids_fall_back_to_members() {
        let group: GroupWithMembers = serde_json::from_value(json!({
            "uuid": "g1",
            "name": "Analysts",
            "members": [{"userUuid": "u2"}, {"userUuid": "u3"}]
        }))
        .unwrap();
        assert_eq!(group.member_user_uuids(), vec!["u2", "u3"]);
    }
}

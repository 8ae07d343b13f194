//! AI agent API implementation

use super::common::{ensure_uuid, segment};
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIntegration {
    #[serde(rename = "type")]
    pub integration_type: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub uuid: String,
    pub project_uuid: String,
    #[serde(default)]
    pub organization_uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub integrations: Vec<AgentIntegration>,
    #[serde(default)]
    pub enable_data_access: bool,
    #[serde(default)]
    pub user_access: Vec<String>,
    #[serde(default)]
    pub group_access: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body for both create and update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub name: String,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub tags: Option<Vec<String>>,
    pub integrations: Vec<AgentIntegration>,
    pub enable_data_access: bool,
    pub user_access: Vec<String>,
    pub group_access: Vec<String>,
}

pub struct AiAgentsApi<'a> {
    client: &'a Client,
}

fn agents_path(project_uuid: &str) -> String {
    format!("/api/v1/projects/{}/aiAgents", segment(project_uuid))
}

impl<'a> AiAgentsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/projects/{project}/aiAgents
    pub async fn list(&self, project_uuid: &str) -> Result<Vec<Agent>, ApiError> {
        let agents: Vec<Agent> = self.client.get(&agents_path(project_uuid)).await?;
        for agent in &agents {
            ensure_uuid(&agent.uuid, "agent uuid")?;
        }
        Ok(agents)
    }

    /// GET /api/v1/projects/{project}/aiAgents/{agent}
    pub async fn get(&self, project_uuid: &str, agent_uuid: &str) -> Result<Agent, ApiError> {
        let agent: Agent = self
            .client
            .get(&format!("{}/{}", agents_path(project_uuid), segment(agent_uuid)))
            .await?;
        ensure_uuid(&agent.uuid, "agent uuid")?;
        Ok(agent)
    }

    /// POST /api/v1/projects/{project}/aiAgents
    pub async fn create(&self, project_uuid: &str, request: &AgentRequest) -> Result<Agent, ApiError> {
        let agent: Agent = self.client.post(&agents_path(project_uuid), request).await?;
        ensure_uuid(&agent.uuid, "agent uuid")?;
        Ok(agent)
    }

    /// PATCH /api/v1/projects/{project}/aiAgents/{agent}
    pub async fn update(
        &self,
        project_uuid: &str,
        agent_uuid: &str,
        request: &AgentRequest,
    ) -> Result<Agent, ApiError> {
        let agent: Agent = self
            .client
            .patch(
                &format!("{}/{}", agents_path(project_uuid), segment(agent_uuid)),
                request,
            )
            .await?;
        ensure_uuid(&agent.uuid, "agent uuid")?;
        Ok(agent)
    }

    /// DELETE /api/v1/projects/{project}/aiAgents/{agent}
    pub async fn delete(&self, project_uuid: &str, agent_uuid: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&format!(
                "{}/{}",
                agents_path(project_uuid),
                segment(agent_uuid)
            ))
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
    async fn create_agent_round_trip() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/projects/p1/aiAgents")
            .match_body(Matcher::PartialJson(json!({
                "name": "Helper",
                "integrations": [{"type": "slack", "channelId": "C123"}],
                "enableDataAccess": true
            })))
            .with_body(
                r#"{"status":"ok","results":{"uuid":"a1","projectUuid":"p1","organizationUuid":"org-1","name":"Helper","integrations":[{"type":"slack","channelId":"C123"}],"enableDataAccess":true,"userAccess":[],"groupAccess":["g1"],"createdAt":"2024-05-01T00:00:00Z","updatedAt":"2024-05-01T00:00:00Z"}}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        let agent = client
            .ai_agents()
            .create(
                "p1",
                &AgentRequest {
                    name: "Helper".to_string(),
                    description: None,
                    instruction: None,
                    image_url: None,
                    provider: None,
                    model: None,
                    tags: None,
                    integrations: vec![AgentIntegration {
                        integration_type: "slack".to_string(),
                        channel_id: "C123".to_string(),
                    }],
                    enable_data_access: true,
                    user_access: vec![],
                    group_access: vec!["g1".to_string()],
                },
            )
            .await
            .unwrap();

        assert_eq!(agent.uuid, "a1");
        assert_eq!(agent.group_access, vec!["g1"]);
        assert_eq!(agent.integrations[0].channel_id, "C123");
        mock.assert_async().await;
    }
}

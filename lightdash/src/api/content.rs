//! Content API (v2), used to move spaces within a project's tree

use super::common::segment;
use super::{ApiError, Client};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub uuid: String,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAction {
    #[serde(rename = "type")]
    pub action_type: &'static str,
    /// None moves the content to the project root
    pub target_space_uuid: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveContentRequest {
    pub item: ContentItem,
    pub action: MoveAction,
}

impl MoveContentRequest {
    pub fn space(space_uuid: &str, target_space_uuid: Option<&str>) -> Self {
        Self {
            item: ContentItem {
                uuid: space_uuid.to_string(),
                content_type: "space",
            },
            action: MoveAction {
                action_type: "move",
                target_space_uuid: target_space_uuid.map(str::to_string),
            },
        }
    }
}

pub struct ContentApi<'a> {
    client: &'a Client,
}

impl<'a> ContentApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v2/content/{project}/move
    pub async fn move_space(
        &self,
        project_uuid: &str,
        space_uuid: &str,
        target_space_uuid: Option<&str>,
    ) -> Result<(), ApiError> {
        let request = MoveContentRequest::space(space_uuid, target_space_uuid);
        self.client
            .post::<serde_json::Value, _>(
                &format!("/api/v2/content/{}/move", segment(project_uuid)),
                &request,
            )
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn move_to_root_serializes_null_target() {
        let body = serde_json::to_value(MoveContentRequest::space("s2", None)).unwrap();
        assert_eq!(
            body,
            json!({
                "item": {"uuid": "s2", "contentType": "space"},
                "action": {"type": "move", "targetSpaceUuid": null}
            })
        );
    }

    #[tokio::test]
    async fn move_space_under_parent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/content/p1/move")
            .match_body(Matcher::Json(json!({
                "item": {"uuid": "s2", "contentType": "space"},
                "action": {"type": "move", "targetSpaceUuid": "s1"}
            })))
            .with_body(r#"{"status":"ok","results":null}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "key").unwrap();
        client
            .content()
            .move_space("p1", "s2", Some("s1"))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}

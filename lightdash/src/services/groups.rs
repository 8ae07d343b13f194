use super::collect_pages;
use crate::api::groups::{Group, GroupWithMembers};
use crate::api::{ApiError, Client};

pub struct GroupsService<'a> {
    client: &'a Client,
}

impl<'a> GroupsService<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list_all(&self) -> Result<Vec<Group>, ApiError> {
        let api = self.client.groups();
        let api = &api;
        collect_pages(move |params| api.list_page(params)).await
    }

    pub async fn find_by_uuid(&self, group_uuid: &str) -> Result<Option<Group>, ApiError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|g| g.uuid == group_uuid))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Group>, ApiError> {
        Ok(self.list_all().await?.into_iter().find(|g| g.name == name))
    }

    pub async fn get_with_members(&self, group_uuid: &str) -> Result<GroupWithMembers, ApiError> {
        self.client.groups().get(group_uuid).await
    }
}

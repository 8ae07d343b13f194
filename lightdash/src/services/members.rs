use super::collect_pages;
use crate::api::members::OrganizationMember;
use crate::api::{ApiError, Client};

pub struct MembersService<'a> {
    client: &'a Client,
}

impl<'a> MembersService<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list_all(&self) -> Result<Vec<OrganizationMember>, ApiError> {
        let api = self.client.members();
        let api = &api;
        collect_pages(move |params| api.list_page(params)).await
    }

    /// Case-insensitive match on email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<OrganizationMember>, ApiError> {
        let wanted = email.trim().to_lowercase();
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|m| m.email.to_lowercase() == wanted))
    }

    pub async fn get_by_uuid(&self, user_uuid: &str) -> Result<OrganizationMember, ApiError> {
        self.client.members().get(user_uuid).await
    }
}

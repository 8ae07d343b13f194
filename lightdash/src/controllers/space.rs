//! Space reconciliation
//!
//! A space is either at the project root, where it carries its own privacy
//! flag and direct user/group access, or nested under a parent, where it
//! inherits access. Converging a space therefore depends on where it sits now
//! and where it should end up, see [`SpaceTransition`].

use super::{ControllerError, RollbackOutcome};
use crate::api::spaces::{
    CreateSpaceRequest, ShareSpaceWithGroupRequest, ShareSpaceWithUserRequest, Space,
    UpdateSpaceRequest,
};
use crate::api::{Client, SpaceMemberRole};
use crate::services::DirectAccess;
use std::collections::BTreeMap;
use tfplug::Context;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceTransition {
    StaysRoot,
    RootToNested,
    NestedToRoot,
    StaysNested,
}

impl SpaceTransition {
    pub fn classify(current_parent: Option<&str>, desired_parent: Option<&str>) -> Self {
        match (current_parent, desired_parent) {
            (None, None) => SpaceTransition::StaysRoot,
            (None, Some(_)) => SpaceTransition::RootToNested,
            (Some(_), None) => SpaceTransition::NestedToRoot,
            (Some(_), Some(_)) => SpaceTransition::StaysNested,
        }
    }

    /// Whether the space sits at the root once the transition completes
    pub fn ends_at_root(self) -> bool {
        matches!(
            self,
            SpaceTransition::StaysRoot | SpaceTransition::NestedToRoot
        )
    }
}

/// Changes needed to turn one access map into another, in key order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessDiff {
    pub add: Vec<(String, SpaceMemberRole)>,
    pub update: Vec<(String, SpaceMemberRole)>,
    pub remove: Vec<String>,
}

impl AccessDiff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Entries that need a share call, adds first
    fn grants(&self) -> impl Iterator<Item = &(String, SpaceMemberRole)> {
        self.add.iter().chain(self.update.iter())
    }
}

pub fn diff_access(
    current: &BTreeMap<String, String>,
    desired: &BTreeMap<String, SpaceMemberRole>,
) -> AccessDiff {
    let mut diff = AccessDiff::default();

    for (uuid, role) in desired {
        match current.get(uuid) {
            None => diff.add.push((uuid.clone(), *role)),
            Some(existing) if existing != role.as_str() => diff.update.push((uuid.clone(), *role)),
            Some(_) => {}
        }
    }

    diff.remove = current
        .keys()
        .filter(|uuid| !desired.contains_key(*uuid))
        .cloned()
        .collect();

    diff
}

/// The space as configured
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredSpace {
    pub project_uuid: String,
    pub name: String,
    pub is_private: bool,
    pub parent_space_uuid: Option<String>,
    /// user uuid -> role; only applied to root spaces. `None` leaves
    /// existing user grants alone.
    pub access: Option<BTreeMap<String, SpaceMemberRole>>,
    /// group uuid -> role; only applied to root spaces. `None` leaves
    /// existing group grants alone.
    pub group_access: Option<BTreeMap<String, SpaceMemberRole>>,
}

impl DesiredSpace {
    pub fn is_root(&self) -> bool {
        self.parent_space_uuid.is_none()
    }
}

pub struct SpaceController<'a> {
    client: &'a Client,
}

impl<'a> SpaceController<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Creates the space and its access. Any failure after the space exists
    /// deletes it again before the error is returned.
    pub async fn create(
        &self,
        ctx: &Context,
        desired: &DesiredSpace,
    ) -> Result<Space, ControllerError> {
        checkpoint(ctx, "create space")?;

        let request = CreateSpaceRequest {
            name: desired.name.clone(),
            is_private: desired.is_root().then_some(desired.is_private),
            parent_space_uuid: desired.parent_space_uuid.clone(),
        };
        let space = self
            .client
            .spaces()
            .create(&desired.project_uuid, &request)
            .await
            .map_err(|e| ControllerError::api("create space", e))?;
        info!(
            project_uuid = %desired.project_uuid,
            space_uuid = %space.uuid,
            nested = !desired.is_root(),
            "created space"
        );

        let result = async {
            if desired.is_root() {
                let none = DirectAccess::default();
                self.apply_group_access(ctx, desired, &space.uuid, &none.groups)
                    .await?;
                self.apply_user_access(ctx, desired, &space.uuid, &none.users, false)
                    .await?;
            }
            self.fetch(&desired.project_uuid, &space.uuid).await
        }
        .await;

        match result {
            Ok(space) => Ok(space),
            Err(err) => {
                let outcome = self.rollback(&desired.project_uuid, &space.uuid).await;
                Err(err.with_rollback(outcome))
            }
        }
    }

    pub async fn update(
        &self,
        ctx: &Context,
        space_uuid: &str,
        desired: &DesiredSpace,
    ) -> Result<Space, ControllerError> {
        let project_uuid = desired.project_uuid.as_str();
        let current = self.fetch(project_uuid, space_uuid).await?;
        let transition = SpaceTransition::classify(
            current.parent_space_uuid.as_deref(),
            desired.parent_space_uuid.as_deref(),
        );
        debug!(%space_uuid, ?transition, "reconciling space");

        // privacy only exists for root spaces; a space moving to the root
        // gets its name and privacy in one patch once the move is done
        let settle_privacy = transition == SpaceTransition::StaysRoot;
        if transition != SpaceTransition::NestedToRoot
            && (current.name != desired.name
                || (settle_privacy && current.is_private != desired.is_private))
        {
            checkpoint(ctx, "update space")?;
            self.patch(project_uuid, space_uuid, desired, settle_privacy)
                .await?;
        }

        match transition {
            SpaceTransition::StaysRoot => {
                let access = DirectAccess::of(&current);
                self.apply_group_access(ctx, desired, space_uuid, &access.groups)
                    .await?;
                self.apply_user_access(ctx, desired, space_uuid, &access.users, true)
                    .await?;
            }
            SpaceTransition::RootToNested => {
                self.move_space(ctx, project_uuid, space_uuid, desired.parent_space_uuid.as_deref())
                    .await?;
            }
            SpaceTransition::NestedToRoot => {
                self.move_space(ctx, project_uuid, space_uuid, None).await?;
                checkpoint(ctx, "update space")?;
                self.patch(project_uuid, space_uuid, desired, true).await?;

                let none = DirectAccess::default();
                self.apply_group_access(ctx, desired, space_uuid, &none.groups)
                    .await?;
                self.apply_user_access(ctx, desired, space_uuid, &none.users, false)
                    .await?;
            }
            SpaceTransition::StaysNested => {
                if current.parent_space_uuid != desired.parent_space_uuid {
                    self.move_space(
                        ctx,
                        project_uuid,
                        space_uuid,
                        desired.parent_space_uuid.as_deref(),
                    )
                    .await?;
                }
            }
        }

        self.fetch(project_uuid, space_uuid).await
    }

    /// Deletes the space; an already missing space counts as deleted
    pub async fn delete(
        &self,
        ctx: &Context,
        project_uuid: &str,
        space_uuid: &str,
        deletion_protection: bool,
    ) -> Result<(), ControllerError> {
        if deletion_protection {
            return Err(ControllerError::DeletionProtected(space_uuid.to_string()));
        }
        checkpoint(ctx, "delete space")?;

        match self.client.spaces().delete(project_uuid, space_uuid).await {
            Ok(()) => {
                info!(%project_uuid, %space_uuid, "deleted space");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(%space_uuid, "space already deleted");
                Ok(())
            }
            Err(e) => Err(ControllerError::api("delete space", e)),
        }
    }

    async fn fetch(&self, project_uuid: &str, space_uuid: &str) -> Result<Space, ControllerError> {
        self.client
            .spaces()
            .get(project_uuid, space_uuid)
            .await
            .map_err(|e| ControllerError::api("read space", e))
    }

    async fn patch(
        &self,
        project_uuid: &str,
        space_uuid: &str,
        desired: &DesiredSpace,
        with_privacy: bool,
    ) -> Result<(), ControllerError> {
        let request = UpdateSpaceRequest {
            name: desired.name.clone(),
            is_private: with_privacy.then_some(desired.is_private),
        };
        self.client
            .spaces()
            .update(project_uuid, space_uuid, &request)
            .await
            .map_err(|e| ControllerError::api("update space", e))
    }

    async fn move_space(
        &self,
        ctx: &Context,
        project_uuid: &str,
        space_uuid: &str,
        target: Option<&str>,
    ) -> Result<(), ControllerError> {
        checkpoint(ctx, "move space")?;
        self.client
            .content()
            .move_space(project_uuid, space_uuid, target)
            .await
            .map_err(|e| ControllerError::api("move space", e))?;
        info!(%space_uuid, target = target.unwrap_or("<root>"), "moved space");
        Ok(())
    }

    async fn apply_group_access(
        &self,
        ctx: &Context,
        desired: &DesiredSpace,
        space_uuid: &str,
        current: &BTreeMap<String, String>,
    ) -> Result<(), ControllerError> {
        let Some(wanted) = &desired.group_access else {
            return Ok(());
        };
        let diff = diff_access(current, wanted);
        let spaces = self.client.spaces();
        let project_uuid = desired.project_uuid.as_str();

        for (group_uuid, role) in diff.grants() {
            checkpoint(ctx, "share space with group")?;
            spaces
                .share_with_group(
                    project_uuid,
                    space_uuid,
                    &ShareSpaceWithGroupRequest {
                        group_uuid: group_uuid.clone(),
                        space_role: *role,
                    },
                )
                .await
                .map_err(|e| ControllerError::api("share space with group", e))?;
            debug!(%space_uuid, %group_uuid, %role, "granted group space access");
        }

        for group_uuid in &diff.remove {
            checkpoint(ctx, "unshare space with group")?;
            spaces
                .unshare_with_group(project_uuid, space_uuid, group_uuid)
                .await
                .map_err(|e| ControllerError::api("unshare space with group", e))?;
            debug!(%space_uuid, %group_uuid, "revoked group space access");
        }
        Ok(())
    }

    async fn apply_user_access(
        &self,
        ctx: &Context,
        desired: &DesiredSpace,
        space_uuid: &str,
        current: &BTreeMap<String, String>,
        revoke: bool,
    ) -> Result<(), ControllerError> {
        let Some(wanted) = &desired.access else {
            return Ok(());
        };
        let diff = diff_access(current, wanted);
        let spaces = self.client.spaces();
        let project_uuid = desired.project_uuid.as_str();

        for (user_uuid, role) in diff.grants() {
            checkpoint(ctx, "share space with user")?;
            spaces
                .share_with_user(
                    project_uuid,
                    space_uuid,
                    &ShareSpaceWithUserRequest {
                        user_uuid: user_uuid.clone(),
                        space_role: *role,
                    },
                )
                .await
                .map_err(|e| ControllerError::api("share space with user", e))?;
            debug!(%space_uuid, %user_uuid, %role, "granted user space access");
        }

        if revoke {
            for user_uuid in &diff.remove {
                checkpoint(ctx, "unshare space with user")?;
                spaces
                    .unshare_with_user(project_uuid, space_uuid, user_uuid)
                    .await
                    .map_err(|e| ControllerError::api("unshare space with user", e))?;
                debug!(%space_uuid, %user_uuid, "revoked user space access");
            }
        }
        Ok(())
    }

    async fn rollback(&self, project_uuid: &str, space_uuid: &str) -> RollbackOutcome {
        warn!(%project_uuid, %space_uuid, "rolling back partially created space");
        match self.client.spaces().delete(project_uuid, space_uuid).await {
            Ok(()) => RollbackOutcome::Succeeded,
            Err(e) => {
                warn!(%space_uuid, error = %e, "rollback delete failed");
                RollbackOutcome::Failed(e.to_string())
            }
        }
    }
}

fn checkpoint(ctx: &Context, next_step: &str) -> Result<(), ControllerError> {
    if ctx.is_cancelled() {
        return Err(ControllerError::cancelled(next_step));
    }
    Ok(())
}

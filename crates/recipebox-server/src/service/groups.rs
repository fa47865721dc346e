use recipebox_auth::{AccessMode, AccessTarget, Capability, Principal};
use recipebox_core::{Group, GroupId, Membership, Page, UserId};
use recipebox_storage::RecordTransaction;

use super::ResourceService;
use crate::cache::keys::paths;
use crate::cache::{InvalidationSet, ListQuery, ViewerScope, group_key, recipe_key};
use crate::error::{ServiceError, ServiceResult};

impl ResourceService {
    /// Create a group owned by the caller. The owner membership is written
    /// in the same transaction.
    pub async fn create_group(&self, principal: &Principal, name: &str) -> ServiceResult<Group> {
        self.gate(principal, Capability::CreateGroup)?;
        let group = Group::new(principal.id, name)?;
        let owner = Membership::new(principal.id, group.id);

        let mut tx = self.begin().await?;
        let result: ServiceResult<()> = async {
            self.storage("insert_group", tx.insert_group(&group)).await?;
            self.storage("insert_membership", tx.insert_membership(&owner))
                .await
        }
        .await;
        self.finish(tx, result).await?;

        self.cache
            .invalidate(
                &InvalidationSet::new()
                    .key(group_key(group.id))
                    .list_for(paths::MY_GROUPS, ViewerScope::User(principal.id)),
            )
            .await;
        tracing::info!(group_id = %group.id, owner_id = %principal.id, "group created");
        Ok(group)
    }

    /// Groups the caller belongs to, oldest first.
    pub async fn list_my_groups(
        &self,
        principal: &Principal,
        page: Page,
    ) -> ServiceResult<Vec<Group>> {
        self.gate(principal, Capability::ViewGroups)?;
        let page = page.normalized();
        let key = ListQuery::new(paths::MY_GROUPS)
            .scoped(ViewerScope::User(principal.id))
            .page(page)
            .key();
        self.cache
            .get_or_load(&key, || {
                self.storage(
                    "list_groups_for_user",
                    self.store.list_groups_for_user(principal.id, page),
                )
            })
            .await
    }

    pub async fn get_group(&self, principal: &Principal, id: GroupId) -> ServiceResult<Group> {
        self.gate(principal, Capability::ViewGroups)?;
        let group = self.cached_group(id).await?;
        self.membership
            .require(principal, AccessTarget::from(&group), AccessMode::Read)
            .await?;
        Ok(group)
    }

    pub async fn list_group_members(
        &self,
        principal: &Principal,
        id: GroupId,
    ) -> ServiceResult<Vec<Membership>> {
        self.gate(principal, Capability::ViewGroups)?;
        let group = self.cached_group(id).await?;
        self.membership
            .require(principal, AccessTarget::from(&group), AccessMode::Read)
            .await?;
        let key = ListQuery::new(paths::group_members(id)).key();
        self.cache
            .get_or_load(&key, || {
                self.storage("list_members", self.store.list_members(id))
            })
            .await
    }

    /// Add `user` to the group. A second add of the same pair is a
    /// `Conflict`.
    pub async fn add_member(
        &self,
        principal: &Principal,
        group_id: GroupId,
        user: UserId,
    ) -> ServiceResult<Membership> {
        self.gate(principal, Capability::ManageMembers)?;
        let group = self.fetch_group(group_id).await?;
        let membership = Membership::new(user, group.id);

        let mut tx = self.begin().await?;
        let result: ServiceResult<()> = async {
            self.group_in(&*tx, group.id).await?;
            self.storage("insert_membership", tx.insert_membership(&membership))
                .await
        }
        .await;
        self.finish(tx, result).await?;

        self.cache
            .invalidate(&membership_changed(group.id, user))
            .await;
        tracing::info!(group_id = %group.id, user_id = %user, actor = %principal.id, "member added");
        Ok(membership)
    }

    /// Remove `user` from the group. The owner cannot be removed.
    pub async fn remove_member(
        &self,
        principal: &Principal,
        group_id: GroupId,
        user: UserId,
    ) -> ServiceResult<()> {
        self.gate(principal, Capability::ViewGroups)?;
        let group = self.fetch_group(group_id).await?;
        self.membership.require_owner_or_elevated(principal, &group)?;
        if group.is_owned_by(user) {
            return Err(ServiceError::validation(
                "the group owner cannot be removed from the group",
            ));
        }

        let mut tx = self.begin().await?;
        let result = match self
            .storage("delete_membership", tx.delete_membership(user, group.id))
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(ServiceError::not_found(
                "membership",
                format!("{}/{}", group.id, user),
            )),
            Err(err) => Err(err),
        };
        self.finish(tx, result).await?;

        self.cache
            .invalidate(&membership_changed(group.id, user))
            .await;
        tracing::info!(group_id = %group.id, user_id = %user, actor = %principal.id, "member removed");
        Ok(())
    }

    /// Delete a group with its memberships and recipes as one unit.
    pub async fn delete_group(&self, principal: &Principal, id: GroupId) -> ServiceResult<()> {
        self.gate(principal, Capability::ViewGroups)?;
        let group = self.fetch_group(id).await?;
        self.membership.require_owner_or_elevated(principal, &group)?;

        let mut tx = self.begin().await?;
        let result: ServiceResult<_> = async {
            let members = self
                .storage(
                    "delete_memberships_for_group",
                    tx.delete_memberships_for_group(id),
                )
                .await?;
            let recipes = self
                .storage("delete_recipes_for_group", tx.delete_recipes_for_group(id))
                .await?;
            self.storage("delete_group", tx.delete_group(id))
                .await?
                .ok_or_else(|| ServiceError::not_found("group", id))?;
            Ok((members, recipes))
        }
        .await;
        let (members, recipes) = self.finish(tx, result).await?;

        let mut set = InvalidationSet::new()
            .key(group_key(id))
            .list(paths::group_members(id))
            .list(paths::group_recipes(id))
            .list(paths::RECIPES);
        for member in &members {
            set = set.list_for(paths::MY_GROUPS, ViewerScope::User(member.user_id));
        }
        for recipe in &recipes {
            set = set.key(recipe_key(recipe.id));
        }
        self.cache.invalidate(&set).await;

        tracing::info!(
            group_id = %id,
            actor = %principal.id,
            memberships = members.len(),
            recipes = recipes.len(),
            "group deleted"
        );
        Ok(())
    }

    /// Group through the cache, for read paths.
    pub(super) async fn cached_group(&self, id: GroupId) -> ServiceResult<Group> {
        self.cache
            .get_or_load(&group_key(id), || {
                self.storage("get_group", self.store.get_group(id))
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("group", id))
    }

    /// Group as seen by `tx`. It may have been deleted after the gates ran.
    pub(super) async fn group_in(
        &self,
        tx: &dyn RecordTransaction,
        id: GroupId,
    ) -> ServiceResult<Group> {
        self.storage("get_group", tx.get_group(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("group", id))
    }

    /// Group straight from the system of record, for write paths.
    pub(super) async fn fetch_group(&self, id: GroupId) -> ServiceResult<Group> {
        self.storage("get_group", self.store.get_group(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("group", id))
    }
}

/// A membership change affects the group's member list, the user's own
/// group list, and which recipes the user can see.
fn membership_changed(group: GroupId, user: UserId) -> InvalidationSet {
    InvalidationSet::new()
        .list(paths::group_members(group))
        .list_for(paths::MY_GROUPS, ViewerScope::User(user))
        .list(paths::RECIPES)
}

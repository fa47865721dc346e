use std::collections::{BTreeMap, HashSet};

use recipebox_core::{Group, GroupId, Membership, Page, Recipe, RecipeId, UserId};
use recipebox_storage::RecipeFilter;

/// The full data set. Transactions work on a clone and swap it in on commit.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub(crate) groups: BTreeMap<GroupId, Group>,
    pub(crate) memberships: BTreeMap<(GroupId, UserId), Membership>,
    pub(crate) recipes: BTreeMap<RecipeId, Recipe>,
}

impl Tables {
    pub(crate) fn is_member(&self, user: UserId, group: GroupId) -> bool {
        self.memberships.contains_key(&(group, user))
    }

    pub(crate) fn members_of(&self, group: GroupId) -> Vec<Membership> {
        let mut members: Vec<Membership> = self
            .memberships
            .iter()
            .filter(|((g, _), _)| *g == group)
            .map(|(_, m)| m.clone())
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user_id.cmp(&b.user_id)));
        members
    }

    pub(crate) fn group_ids_for(&self, user: UserId) -> Vec<GroupId> {
        self.memberships
            .keys()
            .filter(|(_, u)| *u == user)
            .map(|(g, _)| *g)
            .collect()
    }

    pub(crate) fn groups_for(&self, user: UserId, page: Page) -> Vec<Group> {
        let mut groups: Vec<&Group> = self
            .group_ids_for(user)
            .into_iter()
            .filter_map(|id| self.groups.get(&id))
            .collect();
        groups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        page.apply(groups.into_iter().cloned())
    }

    pub(crate) fn recipes(&self, filter: &RecipeFilter, page: Page) -> Vec<Recipe> {
        let groups: HashSet<GroupId> = match filter {
            RecipeFilter::PublicOrGroups(ids) => ids.iter().copied().collect(),
            _ => HashSet::new(),
        };
        let mut matched: Vec<&Recipe> = self
            .recipes
            .values()
            .filter(|r| match filter {
                RecipeFilter::PublicOnly => r.visibility.is_public(),
                RecipeFilter::PublicOrGroups(_) => {
                    r.visibility.is_public() || groups.contains(&r.group_id)
                }
                RecipeFilter::Group(id) => r.group_id == *id,
                RecipeFilter::All => true,
            })
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        page.apply(matched.into_iter().cloned())
    }
}

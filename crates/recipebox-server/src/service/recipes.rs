use recipebox_auth::{AccessMode, AccessTarget, Capability, Principal, RolePolicy};
use recipebox_core::{GroupId, Page, Recipe, RecipeDraft, RecipeId, RecipePatch};
use recipebox_storage::RecipeFilter;

use super::ResourceService;
use crate::cache::keys::paths;
use crate::cache::{InvalidationSet, ListQuery, ViewerScope, recipe_key};
use crate::error::{ServiceError, ServiceResult};

impl ResourceService {
    /// Create a recipe in a group the caller belongs to. Publishing it
    /// directly needs `PublishRecipe` as well.
    pub async fn create_recipe(
        &self,
        principal: &Principal,
        group_id: GroupId,
        draft: RecipeDraft,
    ) -> ServiceResult<Recipe> {
        self.gate(principal, Capability::WriteRecipes)?;
        if draft.visibility.is_public() {
            self.gate(principal, Capability::PublishRecipe)?;
        }
        let group = self.fetch_group(group_id).await?;
        self.membership
            .require(principal, AccessTarget::from(&group), AccessMode::Write)
            .await?;
        let recipe = Recipe::from_draft(group.id, principal.id, draft)?;

        let mut tx = self.begin().await?;
        let result: ServiceResult<()> = async {
            self.group_in(&*tx, group.id).await?;
            self.storage("insert_recipe", tx.insert_recipe(&recipe)).await
        }
        .await;
        self.finish(tx, result).await?;

        self.cache.invalidate(&recipe_changed(&recipe)).await;
        tracing::info!(recipe_id = %recipe.id, group_id = %group.id, "recipe created");
        Ok(recipe)
    }

    pub async fn get_recipe(&self, principal: &Principal, id: RecipeId) -> ServiceResult<Recipe> {
        self.gate(principal, Capability::BrowseRecipes)?;
        let recipe = self
            .cache
            .get_or_load(&recipe_key(id), || {
                self.storage("get_recipe", self.store.get_recipe(id))
            })
            .await?
            .ok_or_else(|| ServiceError::not_found("recipe", id))?;
        self.membership
            .require(principal, AccessTarget::from(&recipe), AccessMode::Read)
            .await?;
        Ok(recipe)
    }

    /// The general recipe list. What it contains depends on who asks:
    /// guests get public recipes only, staff get everything, everyone else
    /// gets public recipes plus those of their own groups.
    pub async fn list_recipes(
        &self,
        principal: &Principal,
        page: Page,
    ) -> ServiceResult<Vec<Recipe>> {
        self.gate(principal, Capability::BrowseRecipes)?;
        let page = page.normalized();
        let scope = recipe_scope(&self.policy, principal);
        let key = ListQuery::new(paths::RECIPES).scoped(scope).page(page).key();

        self.cache
            .get_or_load(&key, || async move {
                let filter = match scope {
                    ViewerScope::Public => RecipeFilter::PublicOnly,
                    ViewerScope::All => RecipeFilter::All,
                    ViewerScope::User(user) => RecipeFilter::PublicOrGroups(
                        self.storage("group_ids_for_user", self.store.group_ids_for_user(user))
                            .await?,
                    ),
                };
                self.storage("list_recipes", self.store.list_recipes(&filter, page))
                    .await
            })
            .await
    }

    pub async fn list_group_recipes(
        &self,
        principal: &Principal,
        group_id: GroupId,
        page: Page,
    ) -> ServiceResult<Vec<Recipe>> {
        self.gate(principal, Capability::BrowseRecipes)?;
        let group = self.cached_group(group_id).await?;
        self.membership
            .require(principal, AccessTarget::from(&group), AccessMode::Read)
            .await?;
        let page = page.normalized();
        let key = ListQuery::new(paths::group_recipes(group.id))
            .page(page)
            .key();
        let filter = RecipeFilter::Group(group.id);
        self.cache
            .get_or_load(&key, || {
                self.storage("list_recipes", self.store.list_recipes(&filter, page))
            })
            .await
    }

    /// Partial update. Making a recipe public needs `PublishRecipe`.
    pub async fn update_recipe(
        &self,
        principal: &Principal,
        id: RecipeId,
        patch: RecipePatch,
    ) -> ServiceResult<Recipe> {
        self.gate(principal, Capability::WriteRecipes)?;
        if patch.makes_public() {
            self.gate(principal, Capability::PublishRecipe)?;
        }
        let mut recipe = self.fetch_recipe(id).await?;
        self.membership
            .require(principal, AccessTarget::from(&recipe), AccessMode::Write)
            .await?;
        recipe.apply(patch)?;

        let mut tx = self.begin().await?;
        let result = match self
            .storage("update_recipe", tx.update_recipe(&recipe))
            .await
        {
            Ok(lookup) => lookup.ok_or_else(|| ServiceError::not_found("recipe", id)),
            Err(err) => Err(err),
        };
        let updated = self.finish(tx, result).await?;

        self.cache.invalidate(&recipe_changed(&updated)).await;
        tracing::info!(recipe_id = %id, actor = %principal.id, "recipe updated");
        Ok(updated)
    }

    pub async fn delete_recipe(&self, principal: &Principal, id: RecipeId) -> ServiceResult<()> {
        self.gate(principal, Capability::WriteRecipes)?;
        let recipe = self.fetch_recipe(id).await?;
        self.membership
            .require(principal, AccessTarget::from(&recipe), AccessMode::Write)
            .await?;

        let mut tx = self.begin().await?;
        let result = match self.storage("delete_recipe", tx.delete_recipe(id)).await {
            Ok(lookup) => lookup.ok_or_else(|| ServiceError::not_found("recipe", id)),
            Err(err) => Err(err),
        };
        let deleted = self.finish(tx, result).await?;

        self.cache.invalidate(&recipe_changed(&deleted)).await;
        tracing::info!(recipe_id = %id, actor = %principal.id, "recipe deleted");
        Ok(())
    }

    async fn fetch_recipe(&self, id: RecipeId) -> ServiceResult<Recipe> {
        self.storage("get_recipe", self.store.get_recipe(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("recipe", id))
    }
}

/// Which slice of the recipe list `principal` may see.
fn recipe_scope(policy: &RolePolicy, principal: &Principal) -> ViewerScope {
    if !policy
        .check(principal, Capability::BrowseGroupRecipes)
        .is_allowed()
    {
        ViewerScope::Public
    } else if policy
        .check(principal, Capability::BypassMembership)
        .is_allowed()
    {
        ViewerScope::All
    } else {
        ViewerScope::User(principal.id)
    }
}

fn recipe_changed(recipe: &Recipe) -> InvalidationSet {
    InvalidationSet::new()
        .key(recipe_key(recipe.id))
        .list(paths::group_recipes(recipe.group_id))
        .list(paths::RECIPES)
}

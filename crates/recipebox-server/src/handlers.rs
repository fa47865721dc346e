use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use recipebox_auth::Principal;
use recipebox_auth::middleware::{AuthState, BearerAuth};
use recipebox_core::{
    Group, GroupId, Membership, Page, Recipe, RecipeDraft, RecipeId, RecipePatch, UserId,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::ServiceResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::rate_limit::RateLimiter;
use crate::service::ResourceService;

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ResourceService>,
    pub auth: AuthState,
    /// `None` when rate limiting is disabled.
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.service.cache();
    Json(json!({
        "status": "ok",
        "storage": state.service.backend_name(),
        "cache": cache.stats(),
        "cache_available": cache.is_available().await,
    }))
}

pub async fn me(BearerAuth(principal): BearerAuth) -> Json<Principal> {
    Json(principal)
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub async fn create_group(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiJson(body): ApiJson<CreateGroupRequest>,
) -> ServiceResult<(StatusCode, Json<Group>)> {
    let group = state.service.create_group(&principal, &body.name).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_my_groups(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiQuery(page): ApiQuery<Page>,
) -> ServiceResult<Json<Vec<Group>>> {
    Ok(Json(state.service.list_my_groups(&principal, page).await?))
}

pub async fn get_group(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(id): ApiPath<GroupId>,
) -> ServiceResult<Json<Group>> {
    Ok(Json(state.service.get_group(&principal, id).await?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(id): ApiPath<GroupId>,
) -> ServiceResult<StatusCode> {
    state.service.delete_group(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_group_members(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(id): ApiPath<GroupId>,
) -> ServiceResult<Json<Vec<Membership>>> {
    Ok(Json(state.service.list_group_members(&principal, id).await?))
}

pub async fn add_member(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(id): ApiPath<GroupId>,
    ApiJson(body): ApiJson<AddMemberRequest>,
) -> ServiceResult<(StatusCode, Json<Membership>)> {
    let membership = state
        .service
        .add_member(&principal, id, body.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath((id, user_id)): ApiPath<(GroupId, UserId)>,
) -> ServiceResult<StatusCode> {
    state.service.remove_member(&principal, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

pub async fn create_recipe(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(group_id): ApiPath<GroupId>,
    ApiJson(draft): ApiJson<RecipeDraft>,
) -> ServiceResult<(StatusCode, Json<Recipe>)> {
    let recipe = state
        .service
        .create_recipe(&principal, group_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn list_group_recipes(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(group_id): ApiPath<GroupId>,
    ApiQuery(page): ApiQuery<Page>,
) -> ServiceResult<Json<Vec<Recipe>>> {
    Ok(Json(
        state
            .service
            .list_group_recipes(&principal, group_id, page)
            .await?,
    ))
}

pub async fn list_recipes(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiQuery(page): ApiQuery<Page>,
) -> ServiceResult<Json<Vec<Recipe>>> {
    Ok(Json(state.service.list_recipes(&principal, page).await?))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(id): ApiPath<RecipeId>,
) -> ServiceResult<Json<Recipe>> {
    Ok(Json(state.service.get_recipe(&principal, id).await?))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(id): ApiPath<RecipeId>,
    ApiJson(patch): ApiJson<RecipePatch>,
) -> ServiceResult<Json<Recipe>> {
    Ok(Json(state.service.update_recipe(&principal, id, patch).await?))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    BearerAuth(principal): BearerAuth,
    ApiPath(id): ApiPath<RecipeId>,
) -> ServiceResult<StatusCode> {
    state.service.delete_recipe(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Moderation endpoints. Every handler requires a key belonging to an
//! admin user.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::storage::AdminStats;

use super::handlers::{
    api_error, bad_request, forbidden, internal, not_found, require_user, ApiError, ApiState,
    SuccessResponse, UserProfile,
};

async fn require_admin(state: &ApiState, headers: &HeaderMap) -> Result<User, ApiError> {
    let user = require_user(state, headers).await?;
    if !user.is_admin {
        return Err(forbidden("Admin access required"));
    }
    Ok(user)
}

pub async fn stats(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<AdminStats>, ApiError> {
    require_admin(&state, &headers).await?;
    let stats = state.storage.admin_stats().await.map_err(internal)?;
    Ok(Json(stats))
}

pub async fn list_users(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    require_admin(&state, &headers).await?;

    let users = state.users.list().await.map_err(internal)?;
    Ok(Json(users.into_iter().map(UserProfile::from).collect()))
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct AdminLinkSummary {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub owner_id: Option<i64>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub is_active: bool,
    pub click_count: i64,
}

/// Every link in the system, active or not, newest first.
pub async fn list_links(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<AdminLinkSummary>>, ApiError> {
    require_admin(&state, &headers).await?;

    let limit = query.limit.clamp(1, 1000);
    let offset = query.offset.max(0);

    let links = state
        .storage
        .list_all_links(limit, offset)
        .await
        .map_err(internal)?;

    let mut summaries = Vec::with_capacity(links.len());
    for link in links {
        let click_count = state
            .storage
            .count_clicks(link.id)
            .await
            .map_err(internal)?;
        summaries.push(AdminLinkSummary {
            id: link.id,
            short_code: link.short_code,
            original_url: link.original_url,
            owner_id: link.owner_id,
            created_at: link.created_at,
            expires_at: link.expires_at,
            is_active: link.is_active,
            click_count,
        });
    }

    Ok(Json(summaries))
}

#[derive(Serialize)]
pub struct ToggleAdminResponse {
    pub success: bool,
    pub is_admin: bool,
}

/// Flip another user's admin flag. Admins cannot demote themselves, which
/// keeps the system from losing its last admin by accident.
pub async fn toggle_admin(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ToggleAdminResponse>, ApiError> {
    let caller = require_admin(&state, &headers).await?;

    if caller.id == user_id {
        return Err(bad_request("Cannot change your own admin status"));
    }

    let Some(target) = state.users.get(user_id).await.map_err(internal)? else {
        return Err(not_found("User not found"));
    };

    let is_admin = !target.is_admin;
    let success = state
        .users
        .set_admin(user_id, is_admin)
        .await
        .map_err(internal)?;

    Ok(Json(ToggleAdminResponse { success, is_admin }))
}

pub async fn delete_user(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    let caller = require_admin(&state, &headers).await?;

    if caller.id == user_id {
        return Err(bad_request("Cannot delete yourself"));
    }

    let deleted = state.users.delete(user_id).await.map_err(internal)?;
    if deleted {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(not_found("User not found"))
    }
}

/// Moderation soft delete, not owner-scoped.
pub async fn delete_link(
    State(state): State<Arc<ApiState>>,
    Path(link_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let deleted = state
        .storage
        .deactivate_link_any_owner(link_id)
        .await
        .map_err(internal)?;

    if deleted {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(api_error(StatusCode::NOT_FOUND, "Link not found"))
    }
}

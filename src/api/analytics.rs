//! Analytics API handlers.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::analytics::LinkAnalytics;

use super::handlers::{internal, not_found, require_user, ApiError, ApiState};

/// Analytics summary for one owned link. Absent, not-owned and untracked
/// links are the same 404.
pub async fn link_analytics(
    State(state): State<Arc<ApiState>>,
    Path(link_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<LinkAnalytics>, ApiError> {
    let user = require_user(&state, &headers).await?;

    match state
        .analytics
        .link_analytics(link_id, user.id)
        .await
        .map_err(internal)?
    {
        Some(summary) => Ok(Json(summary)),
        None => Err(not_found("Link not found or you don't have access")),
    }
}

/// Summaries for all of the caller's active links.
pub async fn user_analytics(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LinkAnalytics>>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let summaries = state
        .analytics
        .user_analytics(user.id)
        .await
        .map_err(internal)?;

    Ok(Json(summaries))
}

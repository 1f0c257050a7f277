use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::storage::Storage;

use super::handlers::{
    create_key, delete_link, health_check, list_keys, list_links, login, register, revoke_key,
    shorten, ApiState,
};
use super::{admin, analytics};

pub fn create_api_router(storage: Arc<dyn Storage>, base_url: String) -> Router {
    let state = Arc::new(ApiState::new(storage, base_url));

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/shorten", post(shorten))
        .route("/api/links", get(list_links))
        .route("/api/links/{id}", delete(delete_link))
        .route("/api/analytics", get(analytics::user_analytics))
        .route("/api/analytics/{id}", get(analytics::link_analytics))
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/keys", post(create_key).get(list_keys))
        .route("/api/keys/{id}", delete(revoke_key))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/toggle-admin", post(admin::toggle_admin))
        .route("/api/admin/users/{id}", delete(admin::delete_user))
        .route("/api/admin/links", get(admin::list_links))
        .route("/api/admin/links/{id}", delete(admin::delete_link))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

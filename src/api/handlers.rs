use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::AnalyticsService;
use crate::auth::{ApiKeyService, Caller};
use crate::links::{LinkResolver, ShortenError};
use crate::models::{ApiKey, CreateLinkRequest, ShortLink, User};
use crate::storage::Storage;
use crate::users::UserService;

pub struct ApiState {
    pub storage: Arc<dyn Storage>,
    pub resolver: LinkResolver,
    pub analytics: AnalyticsService,
    pub users: UserService,
    pub api_keys: ApiKeyService,
    pub base_url: String,
}

impl ApiState {
    pub fn new(storage: Arc<dyn Storage>, base_url: String) -> Self {
        Self {
            resolver: LinkResolver::new(Arc::clone(&storage)),
            analytics: AnalyticsService::new(Arc::clone(&storage)),
            users: UserService::new(Arc::clone(&storage)),
            api_keys: ApiKeyService::new(Arc::clone(&storage)),
            storage,
            base_url,
        }
    }

    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), short_code)
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub fn bad_request(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message)
}

pub fn unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, message)
}

pub fn forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, message)
}

pub fn not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, message)
}

pub fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "internal error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Resolve the caller, requiring a valid key.
pub async fn require_user(state: &ApiState, headers: &HeaderMap) -> Result<User, ApiError> {
    match state
        .api_keys
        .caller_from_headers(headers)
        .await
        .map_err(internal)?
    {
        Caller::User(user) => Ok(user),
        Caller::Anonymous | Caller::InvalidKey => Err(unauthorized("Valid API key required")),
    }
}

/// A user's public shape; never exposes the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: i64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ShortenResponse {
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub has_analytics: bool,
    pub expires_at: Option<i64>,
}

#[derive(Serialize)]
pub struct LinkSummary {
    pub id: i64,
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub has_analytics: bool,
    pub click_count: i64,
}

/// Create a short link. Anonymous callers (no `X-API-Key` header) are
/// allowed and get an untracked link; a present-but-invalid key is
/// rejected rather than silently downgraded to anonymous.
pub async fn shorten(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), ApiError> {
    let owner_id = match state
        .api_keys
        .caller_from_headers(&headers)
        .await
        .map_err(internal)?
    {
        Caller::Anonymous => None,
        Caller::User(user) => Some(user.id),
        Caller::InvalidKey => return Err(unauthorized("Invalid or expired API key")),
    };

    let link = state
        .resolver
        .create(
            &payload.url,
            owner_id,
            payload.custom_code.as_deref(),
            payload.expires_at,
        )
        .await
        .map_err(shorten_error)?;

    let response = ShortenResponse {
        short_url: state.short_url(&link.short_code),
        has_analytics: link.has_analytics(),
        short_code: link.short_code,
        original_url: link.original_url,
        expires_at: link.expires_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

fn shorten_error(err: ShortenError) -> ApiError {
    match err {
        ShortenError::InvalidUrl | ShortenError::InvalidCode => bad_request(&err.to_string()),
        ShortenError::CodeTaken => api_error(StatusCode::CONFLICT, &err.to_string()),
        ShortenError::GenerationExhausted(_) => {
            tracing::warn!("random code generation exhausted its retries");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Could not allocate a short code, please retry",
            )
        }
        ShortenError::Store(err) => internal(err),
    }
}

/// List the caller's active links, newest first.
pub async fn list_links(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LinkSummary>>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let links = state
        .resolver
        .list_by_owner(user.id)
        .await
        .map_err(internal)?;

    let mut summaries = Vec::with_capacity(links.len());
    for link in links {
        let click_count = state
            .storage
            .count_clicks(link.id)
            .await
            .map_err(internal)?;
        summaries.push(link_summary(&state, link, click_count));
    }

    Ok(Json(summaries))
}

fn link_summary(state: &ApiState, link: ShortLink, click_count: i64) -> LinkSummary {
    LinkSummary {
        id: link.id,
        short_url: state.short_url(&link.short_code),
        has_analytics: link.has_analytics(),
        short_code: link.short_code,
        original_url: link.original_url,
        created_at: link.created_at,
        expires_at: link.expires_at,
        click_count,
    }
}

/// Soft-delete one of the caller's links. Absent and not-owned links are
/// the same 404.
pub async fn delete_link(
    State(state): State<Arc<ApiState>>,
    Path(link_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let deleted = state
        .resolver
        .deactivate(link_id, user.id)
        .await
        .map_err(internal)?;

    if deleted {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(not_found("Link not found or you don't have access"))
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    if username.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(bad_request("Username, email and password are required"));
    }
    if !email.contains('@') {
        return Err(bad_request("Email address is not valid"));
    }

    match state
        .users
        .register(username, email, &payload.password)
        .await
        .map_err(internal)?
    {
        Some(user) => Ok((StatusCode::CREATED, Json(user.into()))),
        None => Err(api_error(
            StatusCode::CONFLICT,
            "Username or email already taken",
        )),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    match state
        .users
        .login(&payload.username, &payload.password)
        .await
        .map_err(internal)?
    {
        Some(user) => Ok(Json(user.into())),
        None => Err(unauthorized("Invalid username or password")),
    }
}

#[derive(Deserialize)]
pub struct CreateKeyRequest {
    pub username: String,
    pub password: String,
    pub description: Option<String>,
    pub expires_at: Option<i64>,
}

/// Issue a new API key. Authenticates with username and password so a first
/// key can be created before any key exists.
pub async fn create_key(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<ApiKey>), ApiError> {
    let user = state
        .users
        .login(&payload.username, &payload.password)
        .await
        .map_err(internal)?
        .ok_or_else(|| unauthorized("Invalid username or password"))?;

    let api_key = state
        .api_keys
        .issue(user.id, payload.description.as_deref(), payload.expires_at)
        .await
        .map_err(internal)?;

    Ok((StatusCode::CREATED, Json(api_key)))
}

pub async fn list_keys(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiKey>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let keys = state.api_keys.list(user.id).await.map_err(internal)?;
    Ok(Json(keys))
}

pub async fn revoke_key(
    State(state): State<Arc<ApiState>>,
    Path(key_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let revoked = state
        .api_keys
        .revoke(key_id, user.id)
        .await
        .map_err(internal)?;

    if revoked {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(not_found("API key not found"))
    }
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

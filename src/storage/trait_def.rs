use crate::models::{ApiKey, ClickEvent, ShortLink, User};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique column rejected the write (short code, username, email or
    /// API key already present). The store is the single authority on
    /// uniqueness; callers translate this into their own taxonomy.
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One row of a GROUP BY aggregation over click events (day or country).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClickBucket {
    pub bucket: String,
    pub clicks: i64,
}

/// Moderation counters for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_links: i64,
    pub total_clicks: i64,
    pub active_links: i64,
    pub links_with_analytics: i64,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes).
    async fn init(&self) -> Result<()>;

    // -- short links --

    /// Insert a link with a caller-provided code. The UNIQUE column on
    /// `short_code` is the collision check: a duplicate (active or soft
    /// deleted) yields `StorageError::Conflict` and writes nothing.
    async fn insert_link(
        &self,
        short_code: &str,
        original_url: &str,
        owner_id: Option<i64>,
        expires_at: Option<i64>,
    ) -> StorageResult<ShortLink>;

    /// Fetch a link by code regardless of its lifecycle state.
    async fn find_link_by_code(&self, short_code: &str) -> Result<Option<ShortLink>>;

    async fn find_link_by_id(&self, link_id: i64) -> Result<Option<ShortLink>>;

    /// Soft-delete a link iff it exists and belongs to `owner_id`. Returns
    /// false otherwise without distinguishing absent from not-owned.
    async fn deactivate_link(&self, link_id: i64, owner_id: i64) -> Result<bool>;

    /// Soft-delete regardless of owner (moderation path).
    async fn deactivate_link_any_owner(&self, link_id: i64) -> Result<bool>;

    /// Active links owned by `owner_id`, most recently created first.
    async fn list_links_by_owner(&self, owner_id: i64) -> Result<Vec<ShortLink>>;

    /// All links regardless of state or owner (moderation path).
    async fn list_all_links(&self, limit: i64, offset: i64) -> Result<Vec<ShortLink>>;

    // -- click events --

    async fn insert_click(
        &self,
        link_id: i64,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        referer: Option<&str>,
        country: Option<&str>,
        city: Option<&str>,
    ) -> Result<()>;

    async fn count_clicks(&self, link_id: i64) -> Result<i64>;

    /// Distinct non-null IP addresses seen for a link.
    async fn count_unique_visitors(&self, link_id: i64) -> Result<i64>;

    /// Clicks grouped by UTC calendar day (`YYYY-MM-DD`), ascending.
    async fn clicks_by_day(&self, link_id: i64) -> Result<Vec<ClickBucket>>;

    /// Clicks grouped by country, most-visited first. Rows with no country
    /// recorded are excluded.
    async fn clicks_by_country(&self, link_id: i64) -> Result<Vec<ClickBucket>>;

    async fn recent_clicks(&self, link_id: i64, limit: i64) -> Result<Vec<ClickEvent>>;

    // -- users --

    /// Insert a user; duplicate username or email yields `Conflict`.
    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> StorageResult<User>;

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn count_users(&self) -> Result<i64>;

    async fn set_user_admin(&self, user_id: i64, is_admin: bool) -> Result<bool>;

    /// All users, most recently registered first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Hard delete. The schema detaches the user's links (owner set to NULL)
    /// and removes their API keys.
    async fn delete_user(&self, user_id: i64) -> Result<bool>;

    // -- API keys --

    /// Insert a key; a duplicate key string yields `Conflict`.
    async fn insert_api_key(
        &self,
        user_id: i64,
        key: &str,
        description: Option<&str>,
        expires_at: Option<i64>,
    ) -> StorageResult<ApiKey>;

    /// Fetch a key by its bearer string, only if still active.
    async fn find_active_api_key(&self, key: &str) -> Result<Option<ApiKey>>;

    /// Stamp `last_used_at` for a key.
    async fn touch_api_key(&self, key: &str) -> Result<()>;

    async fn list_api_keys_by_user(&self, user_id: i64) -> Result<Vec<ApiKey>>;

    /// Revoke (deactivate) a key iff it belongs to `user_id`.
    async fn revoke_api_key(&self, key_id: i64, user_id: i64) -> Result<bool>;

    // -- settings --

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;

    // -- moderation --

    async fn admin_stats(&self) -> Result<AdminStats>;
}

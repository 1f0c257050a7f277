use crate::models::{ApiKey, ClickEvent, ShortLink, User};
use crate::storage::{AdminStats, ClickBucket, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS short_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL UNIQUE,
                original_url TEXT NOT NULL,
                owner_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS click_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                link_id INTEGER NOT NULL REFERENCES short_links(id) ON DELETE CASCADE,
                ip_address TEXT,
                user_agent TEXT,
                referer TEXT,
                country TEXT,
                city TEXT,
                clicked_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                key TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at INTEGER NOT NULL,
                expires_at INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_used_at INTEGER
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                value TEXT,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_owner ON short_links(owner_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_link ON click_events(link_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_time ON click_events(clicked_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert_link(
        &self,
        short_code: &str,
        original_url: &str,
        owner_id: Option<i64>,
        expires_at: Option<i64>,
    ) -> StorageResult<ShortLink> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            INSERT INTO short_links (short_code, original_url, owner_id, created_at, expires_at, is_active)
            VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT DO NOTHING
            RETURNING id, short_code, original_url, owner_id, created_at, expires_at, is_active
            "#,
        )
        .bind(short_code)
        .bind(original_url)
        .bind(owner_id)
        .bind(now())
        .bind(expires_at)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        link.ok_or(StorageError::Conflict)
    }

    async fn find_link_by_code(&self, short_code: &str) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, original_url, owner_id, created_at, expires_at, is_active
            FROM short_links
            WHERE short_code = ?
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn find_link_by_id(&self, link_id: i64) -> Result<Option<ShortLink>> {
        let link = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, original_url, owner_id, created_at, expires_at, is_active
            FROM short_links
            WHERE id = ?
            "#,
        )
        .bind(link_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(link)
    }

    async fn deactivate_link(&self, link_id: i64, owner_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE short_links
            SET is_active = 0
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(link_id)
        .bind(owner_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_link_any_owner(&self, link_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE short_links
            SET is_active = 0
            WHERE id = ?
            "#,
        )
        .bind(link_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_links_by_owner(&self, owner_id: i64) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, original_url, owner_id, created_at, expires_at, is_active
            FROM short_links
            WHERE owner_id = ? AND is_active = 1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn list_all_links(&self, limit: i64, offset: i64) -> Result<Vec<ShortLink>> {
        let links = sqlx::query_as::<_, ShortLink>(
            r#"
            SELECT id, short_code, original_url, owner_id, created_at, expires_at, is_active
            FROM short_links
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(links)
    }

    async fn insert_click(
        &self,
        link_id: i64,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        referer: Option<&str>,
        country: Option<&str>,
        city: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO click_events (link_id, ip_address, user_agent, referer, country, city, clicked_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(link_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(referer)
        .bind(country)
        .bind(city)
        .bind(now())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn count_clicks(&self, link_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM click_events WHERE link_id = ?",
        )
        .bind(link_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn count_unique_visitors(&self, link_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT ip_address) FROM click_events WHERE link_id = ?",
        )
        .bind(link_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn clicks_by_day(&self, link_id: i64) -> Result<Vec<ClickBucket>> {
        let buckets = sqlx::query_as::<_, ClickBucket>(
            r#"
            SELECT DATE(clicked_at, 'unixepoch') AS bucket, COUNT(*) AS clicks
            FROM click_events
            WHERE link_id = ?
            GROUP BY bucket
            ORDER BY bucket ASC
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(buckets)
    }

    async fn clicks_by_country(&self, link_id: i64) -> Result<Vec<ClickBucket>> {
        let buckets = sqlx::query_as::<_, ClickBucket>(
            r#"
            SELECT country AS bucket, COUNT(*) AS clicks
            FROM click_events
            WHERE link_id = ? AND country IS NOT NULL AND country != ''
            GROUP BY country
            ORDER BY clicks DESC
            "#,
        )
        .bind(link_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(buckets)
    }

    async fn recent_clicks(&self, link_id: i64, limit: i64) -> Result<Vec<ClickEvent>> {
        let clicks = sqlx::query_as::<_, ClickEvent>(
            r#"
            SELECT id, link_id, ip_address, user_agent, referer, country, city, clicked_at
            FROM click_events
            WHERE link_id = ?
            ORDER BY clicked_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(link_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(clicks)
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> StorageResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            RETURNING id, username, email, password_hash, is_admin, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(is_admin)
        .bind(now())
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        user.ok_or(StorageError::Conflict)
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_admin, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_admin, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn count_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn set_user_admin(&self, user_id: i64, is_admin: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE id = ?")
            .bind(is_admin)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_admin, created_at
            FROM users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(users)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_api_key(
        &self,
        user_id: i64,
        key: &str,
        description: Option<&str>,
        expires_at: Option<i64>,
    ) -> StorageResult<ApiKey> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (user_id, key, description, created_at, expires_at, is_active)
            VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT DO NOTHING
            RETURNING id, user_id, key, description, created_at, expires_at, is_active, last_used_at
            "#,
        )
        .bind(user_id)
        .bind(key)
        .bind(description)
        .bind(now())
        .bind(expires_at)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        api_key.ok_or(StorageError::Conflict)
    }

    async fn find_active_api_key(&self, key: &str) -> Result<Option<ApiKey>> {
        let api_key = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, key, description, created_at, expires_at, is_active, last_used_at
            FROM api_keys
            WHERE key = ? AND is_active = 1
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(api_key)
    }

    async fn touch_api_key(&self, key: &str) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE key = ? AND is_active = 1")
            .bind(now())
            .bind(key)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn list_api_keys_by_user(&self, user_id: i64) -> Result<Vec<ApiKey>> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, user_id, key, description, created_at, expires_at, is_active, last_used_at
            FROM api_keys
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(keys)
    }

    async fn revoke_api_key(&self, key_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET is_active = 0
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(key_id)
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, Option<String>>(
            "SELECT value FROM app_settings WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(value.flatten())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn admin_stats(&self) -> Result<AdminStats> {
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.as_ref())
            .await?;
        let total_links = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM short_links")
            .fetch_one(self.pool.as_ref())
            .await?;
        let total_clicks = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM click_events")
            .fetch_one(self.pool.as_ref())
            .await?;
        let active_links =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM short_links WHERE is_active = 1")
                .fetch_one(self.pool.as_ref())
                .await?;
        let links_with_analytics = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM short_links WHERE owner_id IS NOT NULL",
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(AdminStats {
            total_users,
            total_links,
            total_clicks,
            active_links,
            links_with_analytics,
        })
    }
}

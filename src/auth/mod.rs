//! API key issuance and caller identity resolution.
//!
//! The API surface authenticates with a per-user bearer key in the
//! `X-API-Key` header. A missing header is a legitimate anonymous caller on
//! endpoints that allow it; a present-but-invalid key is always rejected.

use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderMap;

use crate::links::codegen;
use crate::models::{ApiKey, User};
use crate::storage::{Storage, StorageError};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Key generation retries on the (astronomically unlikely) key collision.
const MAX_KEY_ATTEMPTS: u32 = 3;

/// Who is making the request.
#[derive(Debug, Clone)]
pub enum Caller {
    Anonymous,
    User(User),
    InvalidKey,
}

#[derive(Clone)]
pub struct ApiKeyService {
    storage: Arc<dyn Storage>,
}

impl ApiKeyService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Issue a fresh key for a user.
    pub async fn issue(
        &self,
        user_id: i64,
        description: Option<&str>,
        expires_at: Option<i64>,
    ) -> Result<ApiKey> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = codegen::generate_api_key();
            match self
                .storage
                .insert_api_key(user_id, &key, description, expires_at)
                .await
            {
                Ok(api_key) => return Ok(api_key),
                Err(StorageError::Conflict) => continue,
                Err(StorageError::Other(err)) => return Err(err),
            }
        }
        Err(anyhow::anyhow!(
            "could not generate a unique API key after {MAX_KEY_ATTEMPTS} attempts"
        ))
    }

    /// Resolve a bearer key to its owning user. Inactive, expired and
    /// unknown keys all come back `None`. A successful use stamps
    /// `last_used_at` (best effort; a failed stamp does not fail the
    /// request).
    pub async fn authenticate(&self, key: &str) -> Result<Option<User>> {
        let Some(api_key) = self.storage.find_active_api_key(key).await? else {
            return Ok(None);
        };

        if api_key.is_expired(chrono::Utc::now().timestamp()) {
            return Ok(None);
        }

        let Some(user) = self.storage.find_user_by_id(api_key.user_id).await? else {
            return Ok(None);
        };

        if let Err(err) = self.storage.touch_api_key(key).await {
            tracing::warn!(key_id = api_key.id, error = %err, "failed to stamp API key last_used_at");
        }

        Ok(Some(user))
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<ApiKey>> {
        self.storage.list_api_keys_by_user(user_id).await
    }

    /// Owner-scoped revocation; absent and not-owned both come back false.
    pub async fn revoke(&self, key_id: i64, user_id: i64) -> Result<bool> {
        self.storage.revoke_api_key(key_id, user_id).await
    }

    /// Resolve the `X-API-Key` header to a caller identity.
    pub async fn caller_from_headers(&self, headers: &HeaderMap) -> Result<Caller> {
        let Some(value) = headers.get(API_KEY_HEADER) else {
            return Ok(Caller::Anonymous);
        };
        let Ok(key) = value.to_str() else {
            return Ok(Caller::InvalidKey);
        };
        if key.is_empty() {
            return Ok(Caller::InvalidKey);
        }

        match self.authenticate(key).await? {
            Some(user) => Ok(Caller::User(user)),
            None => Ok(Caller::InvalidKey),
        }
    }
}

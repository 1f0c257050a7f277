//! Link creation, lookup and lifecycle.
//!
//! All exclusivity lives in the store's unique constraint on `short_code`:
//! creation inserts optimistically and maps the conflict back into the
//! domain (`CodeTaken` for custom codes, another attempt for random ones).

use std::sync::Arc;

use url::Url;

use crate::links::codegen::{self, DEFAULT_CODE_LENGTH};
use crate::links::ShortenError;
use crate::models::{
    LinkStatus, ShortLink, MAX_ORIGINAL_URL_LEN, MAX_SHORT_CODE_LEN,
};
use crate::storage::{Storage, StorageError};

const MAX_GENERATION_ATTEMPTS: u32 = 10;

#[derive(Clone)]
pub struct LinkResolver {
    storage: Arc<dyn Storage>,
}

impl LinkResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create a link under a custom or freshly generated code.
    ///
    /// A custom code that is syntactically fine but already present (active
    /// or soft deleted) fails with `CodeTaken`; soft-deleted codes are never
    /// reassigned. Random generation retries on collision up to
    /// `MAX_GENERATION_ATTEMPTS` before giving up with
    /// `GenerationExhausted`.
    pub async fn create(
        &self,
        original_url: &str,
        owner_id: Option<i64>,
        custom_code: Option<&str>,
        expires_at: Option<i64>,
    ) -> Result<ShortLink, ShortenError> {
        if !is_valid_original_url(original_url) {
            return Err(ShortenError::InvalidUrl);
        }

        if let Some(code) = custom_code {
            if !codegen::is_valid_custom_code(code) || code.len() > MAX_SHORT_CODE_LEN {
                return Err(ShortenError::InvalidCode);
            }

            return match self
                .storage
                .insert_link(code, original_url, owner_id, expires_at)
                .await
            {
                Ok(link) => Ok(link),
                Err(StorageError::Conflict) => Err(ShortenError::CodeTaken),
                Err(StorageError::Other(err)) => Err(ShortenError::Store(err)),
            };
        }

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let code = codegen::generate_code(DEFAULT_CODE_LENGTH);
            match self
                .storage
                .insert_link(&code, original_url, owner_id, expires_at)
                .await
            {
                Ok(link) => return Ok(link),
                Err(StorageError::Conflict) => {
                    tracing::debug!(short_code = %code, "generated code collided, retrying");
                }
                Err(StorageError::Other(err)) => return Err(ShortenError::Store(err)),
            }
        }

        Err(ShortenError::GenerationExhausted(MAX_GENERATION_ATTEMPTS))
    }

    /// Resolve a code to its link. Soft-deleted and absent codes are both
    /// `None`; callers cannot tell the two apart.
    pub async fn lookup(&self, short_code: &str) -> anyhow::Result<Option<ShortLink>> {
        let link = self.storage.find_link_by_code(short_code).await?;
        Ok(link.filter(|l| matches!(l.status(), LinkStatus::Active)))
    }

    /// Owner-scoped soft delete. Absent and not-owned both come back false.
    pub async fn deactivate(&self, link_id: i64, owner_id: i64) -> anyhow::Result<bool> {
        self.storage.deactivate_link(link_id, owner_id).await
    }

    /// Active links for one owner, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> anyhow::Result<Vec<ShortLink>> {
        self.storage.list_links_by_owner(owner_id).await
    }
}

/// Only host-carrying http(s) URLs are accepted. Host-less schemes
/// (`mailto:`, `data:`, `file:`, `javascript:`) parse as absolute URIs but
/// must never become redirect targets.
fn is_valid_original_url(raw: &str) -> bool {
    if raw.len() > MAX_ORIGINAL_URL_LEN {
        return false;
    }
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

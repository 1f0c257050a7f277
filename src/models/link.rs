use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Column limits enforced at creation time.
pub const MAX_ORIGINAL_URL_LEN: usize = 2048;
pub const MAX_SHORT_CODE_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShortLink {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    /// Absent when the link was created anonymously.
    pub owner_id: Option<i64>,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub is_active: bool,
}

/// Lifecycle state of a link. `Inactive` is terminal (soft delete).
/// Expiry is not a state here: it is derived from `expires_at` at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Active,
    Inactive,
}

impl ShortLink {
    pub fn status(&self) -> LinkStatus {
        if self.is_active {
            LinkStatus::Active
        } else {
            LinkStatus::Inactive
        }
    }

    /// Click tracking is tied to ownership, fixed at creation. Never stored
    /// as its own column.
    pub fn has_analytics(&self) -> bool {
        self.owner_id.is_some()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at < now)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    pub custom_code: Option<String>,
    pub expires_at: Option<i64>,
}

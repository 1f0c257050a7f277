use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recorded visit to a short link. Append-only: rows are never mutated
/// or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClickEvent {
    pub id: i64,
    pub link_id: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Reserved for a future geolocation collaborator; the redirect path
    /// always stores NULL.
    pub country: Option<String>,
    pub city: Option<String>,
    pub clicked_at: i64,
}

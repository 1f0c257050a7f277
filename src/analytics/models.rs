use serde::Serialize;

use crate::models::ClickEvent;
use crate::storage::ClickBucket;

/// One entry of the recent-clicks feed.
#[derive(Debug, Clone, Serialize)]
pub struct RecentClick {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub clicked_at: i64,
}

impl From<ClickEvent> for RecentClick {
    fn from(event: ClickEvent) -> Self {
        Self {
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            referer: event.referer,
            clicked_at: event.clicked_at,
        }
    }
}

/// Full analytics summary for one link.
#[derive(Debug, Clone, Serialize)]
pub struct LinkAnalytics {
    pub link_id: i64,
    pub short_code: String,
    pub original_url: String,
    pub total_clicks: i64,
    /// Distinct IP addresses seen.
    pub unique_visitors: i64,
    /// Per UTC calendar day, ascending.
    pub clicks_by_day: Vec<ClickBucket>,
    /// Most-visited countries first; empty until geolocation lands.
    pub clicks_by_country: Vec<ClickBucket>,
    /// Newest first.
    pub recent_clicks: Vec<RecentClick>,
}

use std::sync::Arc;

use anyhow::Result;

use crate::analytics::models::{LinkAnalytics, RecentClick};
use crate::models::ShortLink;
use crate::storage::Storage;

/// Recent-clicks feed sizes, matching the single-link and the all-links
/// overview views.
const RECENT_CLICKS_DETAIL: i64 = 50;
const RECENT_CLICKS_OVERVIEW: i64 = 10;

#[derive(Clone)]
pub struct AnalyticsService {
    storage: Arc<dyn Storage>,
}

impl AnalyticsService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Summary for one link, only if `owner_id` owns it. Absent, not-owned
    /// and untracked links all come back `None` so callers cannot probe for
    /// other users' links.
    pub async fn link_analytics(
        &self,
        link_id: i64,
        owner_id: i64,
    ) -> Result<Option<LinkAnalytics>> {
        let Some(link) = self.storage.find_link_by_id(link_id).await? else {
            return Ok(None);
        };
        if link.owner_id != Some(owner_id) {
            return Ok(None);
        }

        let summary = self.summarize(&link, RECENT_CLICKS_DETAIL).await?;
        Ok(Some(summary))
    }

    /// Summaries for every active link the user owns, newest link first.
    pub async fn user_analytics(&self, owner_id: i64) -> Result<Vec<LinkAnalytics>> {
        let links = self.storage.list_links_by_owner(owner_id).await?;

        let mut summaries = Vec::with_capacity(links.len());
        for link in &links {
            summaries.push(self.summarize(link, RECENT_CLICKS_OVERVIEW).await?);
        }
        Ok(summaries)
    }

    async fn summarize(&self, link: &ShortLink, recent_limit: i64) -> Result<LinkAnalytics> {
        let total_clicks = self.storage.count_clicks(link.id).await?;
        let unique_visitors = self.storage.count_unique_visitors(link.id).await?;
        let clicks_by_day = self.storage.clicks_by_day(link.id).await?;
        let clicks_by_country = self.storage.clicks_by_country(link.id).await?;
        let recent_clicks = self
            .storage
            .recent_clicks(link.id, recent_limit)
            .await?
            .into_iter()
            .map(RecentClick::from)
            .collect();

        Ok(LinkAnalytics {
            link_id: link.id,
            short_code: link.short_code.clone(),
            original_url: link.original_url.clone(),
            total_clicks,
            unique_visitors,
            clicks_by_day,
            clicks_by_country,
            recent_clicks,
        })
    }
}

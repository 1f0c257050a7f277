//! Conditional click capture on the redirect path.

use std::sync::Arc;

use crate::models::ShortLink;
use crate::storage::Storage;

const MAX_IP_LEN: usize = 45;
const MAX_USER_AGENT_LEN: usize = 500;
const MAX_REFERER_LEN: usize = 500;

/// What happened to one redirect's click event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The link is tracked and the event was persisted.
    Recorded,
    /// The link was created anonymously; nothing is written.
    Skipped,
    /// Persistence failed. Logged, never surfaced to the visitor.
    Failed,
}

/// Request metadata captured alongside a click. Country and city stay empty
/// until a geolocation collaborator fills them in.
#[derive(Debug, Clone, Default)]
pub struct ClickMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl ClickMetadata {
    /// Bound each field to its column limit, dropping empty values.
    pub fn new(
        ip_address: Option<String>,
        user_agent: Option<String>,
        referer: Option<String>,
    ) -> Self {
        Self {
            ip_address: clamp(ip_address, MAX_IP_LEN),
            user_agent: clamp(user_agent, MAX_USER_AGENT_LEN),
            referer: clamp(referer, MAX_REFERER_LEN),
        }
    }
}

fn clamp(value: Option<String>, max: usize) -> Option<String> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| {
            if v.len() <= max {
                return v;
            }
            let mut end = max;
            while !v.is_char_boundary(end) {
                end -= 1;
            }
            v[..end].to_string()
        })
}

#[derive(Clone)]
pub struct ClickRecorder {
    storage: Arc<dyn Storage>,
}

impl ClickRecorder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Persist a click event iff the link is tracked (created under an
    /// owner). The caller has already refused expired links; recording only
    /// runs for redirects that proceed. Best-effort: a store failure is
    /// logged and reported as `Failed` without propagating.
    pub async fn record_if_eligible(
        &self,
        link: &ShortLink,
        metadata: ClickMetadata,
    ) -> RecordOutcome {
        if !link.has_analytics() {
            return RecordOutcome::Skipped;
        }

        match self
            .storage
            .insert_click(
                link.id,
                metadata.ip_address.as_deref(),
                metadata.user_agent.as_deref(),
                metadata.referer.as_deref(),
                None,
                None,
            )
            .await
        {
            Ok(()) => RecordOutcome::Recorded,
            Err(err) => {
                tracing::warn!(
                    link_id = link.id,
                    short_code = %link.short_code,
                    error = %err,
                    "failed to record click event"
                );
                RecordOutcome::Failed
            }
        }
    }
}

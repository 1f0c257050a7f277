//! Read-side click analytics.
//!
//! Summaries are computed from persisted click events on demand; nothing
//! here writes. Access is owner-gated: a caller only sees analytics for
//! links they own, and links without an owner have nothing to show.

pub mod aggregator;
pub mod models;

pub use aggregator::AnalyticsService;
pub use models::{LinkAnalytics, RecentClick};

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use serde::{Deserialize, Serialize};

use crate::sanitize::{normalize_link, sanitize_html};

/// A single normalized entry from a feed.
///
/// `link` is the dedup key: the entry URL with its query string stripped.
/// `source` is the feed's resolved fetch URL (post-redirect) and keys the
/// per-feed statistics, distinct from `link`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub time: DateTime<Utc>,
    pub feed: String,
    pub source: String,
}

impl FeedEntry {
    /// Converts a parsed feed-rs entry into a FeedEntry.
    ///
    /// Missing fields fall back to defaults: "-" for the title, empty
    /// strings for summary and feed name, `fetched_at` for the timestamp.
    pub fn from_feed(feed: &Feed, entry: &Entry, source: &str, fetched_at: DateTime<Utc>) -> Self {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_else(|| "-".to_string());
        let summary = entry
            .summary
            .as_ref()
            .map(|s| sanitize_html(&s.content))
            .unwrap_or_default();
        let link = entry
            .links
            .first()
            .map(|l| normalize_link(&l.href))
            .unwrap_or_default();
        let time = entry.published.unwrap_or(fetched_at);
        let feed_title = feed
            .title
            .as_ref()
            .map(|t| t.content.clone())
            .unwrap_or_default();

        Self {
            title,
            summary,
            link,
            time,
            feed: feed_title,
            source: source.to_string(),
        }
    }
}

/// Per-source fetch statistics, keyed by the subscribed URL.
#[derive(Debug, Clone)]
pub struct FeedRecord {
    pub url: String,
    pub last_fetched: DateTime<Utc>,
    pub successful_fetches: i64,
    pub failed_fetches: i64,
}

/// Ordering applied when selecting feeds to re-poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOrder {
    /// Oldest `last_fetched` first.
    Standard,
    /// Randomized order.
    Shuffle,
}

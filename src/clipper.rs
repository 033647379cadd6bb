use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use feed_rs::parser;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::Client;
use thiserror::Error;

use crate::db::Database;
use crate::models::{FeedEntry, FeedOrder};
use crate::render;

/// Per-request cap; a stalled source costs at most this long.
const FETCH_TIMEOUT: Duration = Duration::from_secs(1);

/// Failures recovered per-source during ingestion. Anything outside
/// these two classes (storage, output) propagates and aborts the run.
#[derive(Debug, Error)]
enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("feed parse failed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Downloads, cleans up and stores entries from feeds, and renders
/// clippings of stored entries. Holds one reused HTTP client and the
/// RNG driving retry-weighted scheduling.
pub struct Clipper {
    db: Database,
    client: Client,
    rng: StdRng,
}

impl Clipper {
    pub fn new(db: Database) -> Result<Self> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            db,
            client,
            rng: StdRng::from_entropy(),
        })
    }

    /// Fetches one feed and stores its entries.
    ///
    /// Fetch and parse failures are recorded against the feed's
    /// statistics and swallowed; a bad source never aborts a batch.
    pub async fn ingest_one(&mut self, url: &str) -> Result<()> {
        info!("Fetching feed: {}", url);
        let entries = match self.fetch_and_parse(url).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Failed to fetch {}: {}", url, err);
                self.db.record_fetch_outcome(url, false).await?;
                return Ok(());
            }
        };
        debug!("Finished fetching feed ({} entries).", entries.len());
        self.db.write_entries(&entries).await?;
        self.db.record_fetch_outcome(url, true).await?;
        Ok(())
    }

    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<FeedEntry>, IngestError> {
        let response = self.client.get(url).send().await?;
        // Redirecting feeds are tracked under their final address.
        let source = response.url().to_string();
        let body = response.text().await?;
        let feed = parser::parse(body.as_bytes())?;
        let fetched_at = Utc::now();
        Ok(feed
            .entries
            .iter()
            .map(|entry| FeedEntry::from_feed(&feed, entry, &source, fetched_at))
            .collect())
    }

    /// Ingests each URL in turn; outcomes are independent.
    pub async fn ingest_many(&mut self, urls: &[String]) -> Result<()> {
        for url in urls {
            self.ingest_one(url).await?;
        }
        Ok(())
    }

    /// Re-polls feeds already known to the database, selected by the
    /// retry-weighted policy.
    pub async fn refetch(&mut self, order: FeedOrder) -> Result<()> {
        info!("Re-fetching available feeds.");
        let urls = self.db.list_feeds(order, &mut self.rng).await?;
        for url in urls {
            self.ingest_one(&url).await?;
        }
        Ok(())
    }

    /// Renders a static HTML digest of every stored entry matching any
    /// of the patterns and writes it to `file`.
    pub async fn build_clipping(&self, title: &str, patterns: &[String], file: &Path) -> Result<()> {
        info!("Building clipping \"{}\" -> {}", title, file.display());
        let entries = self.db.search(patterns).await?;
        let document = render::render_clipping(title, patterns, &entries);
        std::fs::write(file, document)
            .with_context(|| format!("writing clipping to {}", file.display()))?;
        Ok(())
    }
}

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::debug;
use rand::Rng;
use regex::Regex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;

use crate::models::{FeedEntry, FeedOrder, FeedRecord};

pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(file: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(file)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entry (
                title TEXT,
                feed TEXT,
                link TEXT PRIMARY KEY,
                time TEXT,
                source TEXT,
                summary TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS title_idx ON entry(title)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS summary_idx ON entry(summary)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed (
                url TEXT PRIMARY KEY,
                last_fetched TEXT NOT NULL,
                successful_fetches INTEGER DEFAULT(1),
                failed_fetches INTEGER DEFAULT(0)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes a batch of entries. The `link` column is the dedup key:
    /// an entry whose link is already stored is skipped, never
    /// overwritten. Each distinct `source` in the batch has its feed
    /// row's `last_fetched` upserted.
    pub async fn write_entries(&self, entries: &[FeedEntry]) -> Result<()> {
        debug!("Writing {} entries to the database.", entries.len());
        for entry in entries {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO entry
                (title, summary, link, time, feed, source)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&entry.title)
            .bind(&entry.summary)
            .bind(&entry.link)
            .bind(entry.time)
            .bind(&entry.feed)
            .bind(&entry.source)
            .execute(&self.pool)
            .await?;
        }

        let sources: BTreeSet<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        for source in sources {
            debug!("Updating fetched status of {}.", source);
            sqlx::query(
                r#"
                INSERT INTO feed (url, last_fetched) VALUES (?, ?)
                ON CONFLICT(url) DO UPDATE SET last_fetched = excluded.last_fetched
                "#,
            )
            .bind(source)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Records the outcome of a fetch attempt against `feed_url`,
    /// creating the statistics row if this is the first attempt.
    pub async fn record_fetch_outcome(&self, feed_url: &str, success: bool) -> Result<()> {
        debug!("Updating feed: {} (success = {}).", feed_url, success);
        sqlx::query("INSERT OR IGNORE INTO feed (url, last_fetched) VALUES (?, ?)")
            .bind(feed_url)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        sqlx::query("UPDATE feed SET last_fetched = ? WHERE url = ?")
            .bind(Utc::now())
            .bind(feed_url)
            .execute(&self.pool)
            .await?;

        let bump = if success {
            "UPDATE feed SET successful_fetches = successful_fetches + 1 WHERE url = ?"
        } else {
            "UPDATE feed SET failed_fetches = failed_fetches + 1 WHERE url = ?"
        };
        sqlx::query(bump).bind(feed_url).execute(&self.pool).await?;

        Ok(())
    }

    /// Returns candidate feed URLs to re-poll.
    ///
    /// A feed with at least as many successes as failures is always
    /// included. A failing-majority feed is included only when a fresh
    /// uniform draw in [0,1) exceeds `successful / failed`, so a sick
    /// source is retried with diminishing but never-zero probability.
    /// The RNG is caller-supplied so scheduling is reproducible.
    pub async fn list_feeds<R: Rng>(&self, order: FeedOrder, rng: &mut R) -> Result<Vec<String>> {
        debug!("Getting list of available feeds.");
        let query = match order {
            FeedOrder::Standard => {
                r#"
                SELECT url, last_fetched, successful_fetches, failed_fetches
                FROM feed ORDER BY last_fetched ASC
                "#
            }
            FeedOrder::Shuffle => {
                r#"
                SELECT url, last_fetched, successful_fetches, failed_fetches
                FROM feed ORDER BY RANDOM()
                "#
            }
        };

        let records: Vec<FeedRecord> = sqlx::query(query)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| FeedRecord {
                url: row.get(0),
                last_fetched: row.get(1),
                successful_fetches: row.get(2),
                failed_fetches: row.get(3),
            })
            .collect();

        Ok(records
            .into_iter()
            .filter(|record| {
                // The unconditional guard runs first, so the division
                // below never sees a zero failure count.
                record.successful_fetches >= record.failed_fetches
                    || rng.gen::<f64>()
                        > record.successful_fetches as f64 / record.failed_fetches as f64
            })
            .map(|record| record.url)
            .collect())
    }

    /// Fetch statistics for a single feed, if any attempt was recorded.
    pub async fn feed_record(&self, feed_url: &str) -> Result<Option<FeedRecord>> {
        let row = sqlx::query(
            r#"
            SELECT url, last_fetched, successful_fetches, failed_fetches
            FROM feed WHERE url = ?
            "#,
        )
        .bind(feed_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| FeedRecord {
            url: row.get(0),
            last_fetched: row.get(1),
            successful_fetches: row.get(2),
            failed_fetches: row.get(3),
        }))
    }

    /// Returns every stored entry matched by at least one of the
    /// patterns against its title or summary, newest first.
    pub async fn search(&self, patterns: &[String]) -> Result<Vec<FeedEntry>> {
        debug!("Searching database for entries matching {:?}.", patterns);
        let compiled = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<Regex>, _>>()?;

        let rows = sqlx::query(
            r#"
            SELECT title, summary, link, time, feed, source
            FROM entry ORDER BY time DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut output = Vec::new();
        for row in rows {
            let entry = FeedEntry {
                title: row.get::<Option<String>, _>(0).unwrap_or_default(),
                summary: row.get::<Option<String>, _>(1).unwrap_or_default(),
                link: row.get::<Option<String>, _>(2).unwrap_or_default(),
                time: row.get::<DateTime<Utc>, _>(3),
                feed: row.get::<Option<String>, _>(4).unwrap_or_default(),
                source: row.get::<Option<String>, _>(5).unwrap_or_default(),
            };
            if compiled
                .iter()
                .any(|p| p.is_match(&entry.title) || p.is_match(&entry.summary))
            {
                output.push(entry);
            }
        }
        debug!("Found {} entries.", output.len());
        Ok(output)
    }
}

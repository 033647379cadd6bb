use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::clipper::Clipper;
use crate::db::Database;
use crate::models::FeedOrder;

/// A run described by a JSON config file: which database to use, which
/// feeds to (re-)ingest and which clippings to produce.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default)]
    pub refetch: bool,
    #[serde(default)]
    pub new_feeds: Vec<String>,
    #[serde(default)]
    pub clippings: Vec<ClippingSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ClippingSpec {
    pub title: String,
    pub regex: Vec<String>,
    pub file: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

/// Runs one full pass: refetch known feeds if asked, ingest any new
/// subscriptions, then build every configured clipping.
pub async fn run(config: Config) -> Result<()> {
    let db = Database::new(&config.database).await?;
    let mut clipper = Clipper::new(db)?;

    if config.refetch {
        clipper.refetch(FeedOrder::Standard).await?;
    }
    clipper.ingest_many(&config.new_feeds).await?;
    for clipping in &config.clippings {
        clipper
            .build_clipping(&clipping.title, &clipping.regex, &clipping.file)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "database": "feeds.db",
                "refetch": true,
                "new_feeds": ["https://example.com/rss"],
                "clippings": [
                    {{"title": "Foo", "regex": ["Foo", "foo"], "file": "foo.html"}}
                ]
            }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database, "feeds.db");
        assert!(config.refetch);
        assert_eq!(config.new_feeds, vec!["https://example.com/rss"]);
        assert_eq!(config.clippings.len(), 1);
        assert_eq!(config.clippings[0].regex.len(), 2);
    }

    #[test]
    fn optional_fields_default() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"database": "feeds.db"}}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(!config.refetch);
        assert!(config.new_feeds.is_empty());
        assert!(config.clippings.is_empty());
    }

    #[test]
    fn missing_database_key_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"refetch": false}}"#).unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}

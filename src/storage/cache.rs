use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{KvStore, StoreError};
use crate::model::ArticleCard;

const FEED_KEY: &str = "feed_cache";
const ARCHIVE_KEY: &str = "archive_cache";
const TIMESTAMP_PREFIX: &str = "cache_timestamp_";

const FEED_TTL: Duration = Duration::minutes(5);
const ARCHIVE_TTL: Duration = Duration::hours(1);

/// TTL cache for the remote feed and archive lists.
#[derive(Clone, Debug)]
pub struct FeedCache {
    kv: KvStore,
}

impl FeedCache {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub fn feed(&self) -> Option<Vec<ArticleCard>> {
        self.get_at(FEED_KEY, FEED_TTL, Utc::now())
    }

    pub fn set_feed(&self, cards: &[ArticleCard]) -> Result<(), StoreError> {
        self.set_at(FEED_KEY, &cards, Utc::now())
    }

    pub fn archive(&self) -> Option<Vec<ArticleCard>> {
        self.get_at(ARCHIVE_KEY, ARCHIVE_TTL, Utc::now())
    }

    pub fn set_archive(&self, cards: &[ArticleCard]) -> Result<(), StoreError> {
        self.set_at(ARCHIVE_KEY, &cards, Utc::now())
    }

    pub fn invalidate_feed(&self) -> Result<(), StoreError> {
        self.kv
            .remove(&[FEED_KEY, format!("{TIMESTAMP_PREFIX}{FEED_KEY}").as_str()])
    }

    pub fn invalidate_archive(&self) -> Result<(), StoreError> {
        self.kv
            .remove(&[ARCHIVE_KEY, format!("{TIMESTAMP_PREFIX}{ARCHIVE_KEY}").as_str()])
    }

    /// Misses on absent, expired or undecodable entries.
    fn get_at<T: DeserializeOwned>(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Option<T> {
        let stamp: i64 = self
            .kv
            .get(&format!("{TIMESTAMP_PREFIX}{key}"))?
            .parse()
            .ok()?;
        let written = DateTime::from_timestamp_millis(stamp)?;
        if now - written > ttl {
            debug!(key, "cache entry expired");
            return None;
        }
        let text = self.kv.get(key)?;
        serde_json::from_str(&text)
            .inspect_err(|e| warn!(key, error = %e, "cache entry unreadable"))
            .ok()
    }

    fn set_at<T: Serialize>(&self, key: &str, value: &T, now: DateTime<Utc>) -> Result<(), StoreError> {
        let stamp_key = format!("{TIMESTAMP_PREFIX}{key}");
        self.kv.set_many(&[
            (key, serde_json::to_string(value)?),
            (stamp_key.as_str(), now.timestamp_millis().to_string()),
        ])
    }
}

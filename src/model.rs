//! Wire and storage shapes shared by the generator, the feed and the REST client.
//!
//! Everything serializes as camelCase JSON with epoch-millisecond timestamps so
//! that stored state and backend payloads use the same representation.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current time at the millisecond precision used on the wire, so values
/// compare equal after a storage round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A user-defined recurring search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "now")]
    pub created_at: DateTime<Utc>,
}

impl Topic {
    pub fn new(query: &str, icon: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.trim().to_string(),
            icon: icon.map(str::to_string),
            created_at: now(),
        }
    }
}

/// Citation attached to a card at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// One generated content unit shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCard {
    pub id: String,
    pub topic_id: String,
    pub topic_query: String,
    pub title: String,
    pub teaser: String,
    pub content: String,
    pub image_url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<GroundingSource>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_archived: bool,
}

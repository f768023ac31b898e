use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::generator::placeholder_image;
use crate::model::{self, ArticleCard, GroundingSource};

#[derive(Debug, Serialize)]
pub struct CreateTopicRequest<'a> {
    pub id: &'a str,
    pub query: &'a str,
    pub icon: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GoogleLoginRequest<'a> {
    pub token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

/// Article as serialized by the backend (snake_case, summary only).
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteArticle {
    pub id: String,
    #[serde(default)]
    pub topic_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_read: bool,
}

impl RemoteArticle {
    /// Maps onto the local card shape. `topic_query` is left empty; see
    /// [`label_topics`](super::label_topics).
    pub fn into_card(self) -> ArticleCard {
        let mut uris: Vec<String> = Vec::new();
        for uri in self.source_url.into_iter().chain(self.citations) {
            if !uri.is_empty() && !uris.contains(&uri) {
                uris.push(uri);
            }
        }
        let sources = uris
            .into_iter()
            .map(|uri| GroundingSource {
                title: citation_title(&uri),
                uri,
            })
            .collect();

        ArticleCard {
            image_url: self
                .image_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| placeholder_image(&self.title)),
            generated_at: self
                .published_date
                .as_deref()
                .and_then(parse_published)
                .unwrap_or_else(model::now),
            content: self
                .content
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| self.summary.clone()),
            teaser: self.summary,
            id: self.id,
            topic_id: self.topic_id.unwrap_or_default(),
            topic_query: String::new(),
            title: self.title,
            sources,
            is_read: self.is_read,
            is_archived: self.is_archived,
        }
    }
}

/// Host of a citation URL, or the URL itself when it does not parse.
fn citation_title(uri: &str) -> String {
    Url::parse(uri)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| uri.to_string())
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc).trunc_subsecs(3));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_article() -> serde_json::Value {
        serde_json::json!({
            "id": "a1",
            "topic_id": "t1",
            "title": "Fusion record",
            "summary": "A reactor held plasma for 20 minutes.",
            "image_url": null,
            "source_url": "https://www.nature.com/articles/x",
            "published_date": "2026-10-18",
            "citations": ["https://www.nature.com/articles/x", "https://iter.org/news"],
            "is_archived": false,
            "is_read": true
        })
    }

    #[test]
    fn backend_article_maps_to_card() {
        let remote: RemoteArticle = serde_json::from_value(backend_article()).unwrap();
        let card = remote.into_card();

        assert_eq!(card.id, "a1");
        assert_eq!(card.topic_id, "t1");
        assert_eq!(card.teaser, "A reactor held plasma for 20 minutes.");
        assert_eq!(card.content, card.teaser);
        assert_eq!(card.image_url, placeholder_image("Fusion record"));
        assert_eq!(card.generated_at.to_rfc3339(), "2026-10-18T00:00:00+00:00");
        assert!(card.is_read);
        assert!(card.topic_query.is_empty());

        let uris: Vec<_> = card.sources.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, ["https://www.nature.com/articles/x", "https://iter.org/news"]);
        assert_eq!(card.sources[0].title, "nature.com");
    }

    #[test]
    fn sparse_article_gets_defaults() {
        let remote: RemoteArticle = serde_json::from_value(serde_json::json!({
            "id": "a2",
            "title": "Bare",
            "summary": "s",
            "content": "full text",
            "published_date": "not a date"
        }))
        .unwrap();
        let before = Utc::now() - chrono::Duration::seconds(1);

        let card = remote.into_card();

        assert_eq!(card.content, "full text");
        assert!(card.topic_id.is_empty());
        assert!(card.sources.is_empty());
        assert!(card.generated_at >= before);
    }

    #[test]
    fn rfc3339_published_date() {
        let at = parse_published("2026-10-18T08:30:00Z").unwrap();
        assert_eq!(at.to_rfc3339(), "2026-10-18T08:30:00+00:00");
    }
}

//! REST backend client (remote mode).
//!
//! Every request carries the stored bearer token. A 401 from any endpoint
//! clears that token; logging in again is left to the user.

mod types;

pub use types::{LoginResponse, User};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::model::{ArticleCard, Topic};
use crate::storage::{FeedCache, StoreError, TokenStore};
use types::{CreateTopicRequest, ErrorBody, GoogleLoginRequest, RemoteArticle};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_TOPIC_ICON: &str = "📰";

/// Characters left unescaped in an id path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid backend URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("not authorized; log in again")]
    Unauthorized,

    #[error("backend error ({code}): {message}")]
    Status { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: TokenStore,
    cache: FeedCache,
}

impl ApiClient {
    pub fn new(
        http: Client,
        base_url: &str,
        tokens: TokenStore,
        cache: FeedCache,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            tokens,
            cache,
        })
    }

    pub async fn topics(&self) -> Result<Vec<Topic>, ApiError> {
        self.json(self.request(Method::GET, "/topics")).await
    }

    pub async fn create_topic(&self, query: &str, icon: Option<&str>) -> Result<Topic, ApiError> {
        let id = Uuid::new_v4().to_string();
        let body = CreateTopicRequest {
            id: &id,
            query: query.trim(),
            icon: icon.unwrap_or(DEFAULT_TOPIC_ICON),
        };
        self.json(self.request(Method::POST, "/topics").json(&body))
            .await
    }

    pub async fn delete_topic(&self, topic_id: &str) -> Result<(), ApiError> {
        let path = format!("/topics/{}", segment(topic_id));
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    /// Active cards. Served from the cache while fresh unless `refresh` is set.
    pub async fn feed(&self, refresh: bool) -> Result<Vec<ArticleCard>, ApiError> {
        if !refresh && let Some(cards) = self.cache.feed() {
            debug!(cards = cards.len(), "feed served from cache");
            return Ok(cards);
        }
        let cards = self.articles(self.request(Method::GET, "/feed")).await?;
        self.cache.set_feed(&cards)?;
        Ok(cards)
    }

    pub async fn archived(&self, refresh: bool) -> Result<Vec<ArticleCard>, ApiError> {
        if !refresh && let Some(cards) = self.cache.archive() {
            debug!(cards = cards.len(), "archive served from cache");
            return Ok(cards);
        }
        let cards = self.articles(self.request(Method::GET, "/archive")).await?;
        self.cache.set_archive(&cards)?;
        Ok(cards)
    }

    pub async fn generate(&self, topic_id: &str) -> Result<ArticleCard, ApiError> {
        let path = format!("/generate/{}", segment(topic_id));
        let article: RemoteArticle = self.json(self.request(Method::POST, &path)).await?;
        self.cache.invalidate_feed()?;
        Ok(article.into_card())
    }

    pub async fn archive_article(&self, article_id: &str) -> Result<(), ApiError> {
        let path = format!("/articles/{}/archive", segment(article_id));
        self.send(self.request(Method::POST, &path)).await?;
        self.cache.invalidate_feed()?;
        self.cache.invalidate_archive()?;
        Ok(())
    }

    /// Marks a card consumed so the backend stops serving it.
    pub async fn swipe_article(&self, article_id: &str) -> Result<(), ApiError> {
        let path = format!("/articles/{}/swipe", segment(article_id));
        self.send(self.request(Method::POST, &path)).await?;
        self.cache.invalidate_feed()?;
        Ok(())
    }

    pub async fn delete_article(&self, article_id: &str) -> Result<(), ApiError> {
        let path = format!("/articles/{}", segment(article_id));
        self.send(self.request(Method::DELETE, &path)).await?;
        self.cache.invalidate_feed()?;
        self.cache.invalidate_archive()?;
        Ok(())
    }

    /// Exchanges a Google ID token for a backend token and stores it.
    pub async fn login_google(&self, id_token: &str) -> Result<LoginResponse, ApiError> {
        let body = GoogleLoginRequest { token: id_token };
        let login: LoginResponse = self
            .json(self.request(Method::POST, "/auth/google").json(&body))
            .await?;
        self.tokens.set(&login.access_token)?;
        info!(user = ?login.user_id, "logged in");
        Ok(login)
    }

    /// `None` when no token is stored.
    pub async fn me(&self) -> Result<Option<User>, ApiError> {
        if self.tokens.get().is_none() {
            return Ok(None);
        }
        self.json(self.request(Method::GET, "/auth/me")).await.map(Some)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.tokens.clear()?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .header("User-Agent", crate::USER_AGENT);
        match self.tokens.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("backend rejected token, clearing it");
            self.tokens.clear()?;
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(ErrorBody {
                    detail: serde_json::Value::String(detail),
                }) => detail,
                Ok(body) => body.detail.to_string(),
                Err(_) => text[..text.floor_char_boundary(200)].to_string(),
            };
            warn!(status = %status, %message, "backend error");
            return Err(ApiError::Status {
                code: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request).await?.json().await.map_err(|e| {
            if e.is_decode() {
                warn!(error = %e, "backend response did not match the expected shape");
                ApiError::Decode(e)
            } else {
                ApiError::Network(e)
            }
        })
    }

    async fn articles(&self, request: RequestBuilder) -> Result<Vec<ArticleCard>, ApiError> {
        let articles: Vec<RemoteArticle> = self.json(request).await?;
        Ok(articles.into_iter().map(RemoteArticle::into_card).collect())
    }
}

/// Fills `topic_query` from the topic list; unknown topics stay unlabeled.
pub fn label_topics(cards: &mut [ArticleCard], topics: &[Topic]) {
    for card in cards {
        if let Some(topic) = topics.iter().find(|t| t.id == card.topic_id) {
            card.topic_query = topic.query.clone();
        }
    }
}

fn segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

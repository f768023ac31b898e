//! Standalone feed state: topics, the active list, the archive and the day marker.
//!
//! Cards move between the two lists; they are never copied. Every card in
//! `archived_cards` has `is_archived == true` and every active card has it
//! false.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{self, ArticleCard, Topic};

const SEED_TOPIC_ID: &str = "default-russia-ukraine";
const SEED_TOPIC_QUERY: &str = "what is happening with russia and ukraine now?";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("topic query must not be empty")]
    EmptyQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    topics: Vec<Topic>,
    #[serde(default)]
    active_cards: Vec<ArticleCard>,
    #[serde(default)]
    archived_cards: Vec<ArticleCard>,
    #[serde(default)]
    last_fetch_date: Option<NaiveDate>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            topics: vec![Topic {
                id: SEED_TOPIC_ID.to_string(),
                query: SEED_TOPIC_QUERY.to_string(),
                icon: None,
                created_at: model::now(),
            }],
            active_cards: Vec::new(),
            archived_cards: Vec::new(),
            last_fetch_date: None,
        }
    }
}

impl AppState {
    /// State with no topics at all, not even the seed topic.
    #[cfg(test)]
    pub fn empty() -> Self {
        Self {
            topics: Vec::new(),
            ..Self::default()
        }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn active_cards(&self) -> &[ArticleCard] {
        &self.active_cards
    }

    /// Newest first.
    pub fn archived_cards(&self) -> &[ArticleCard] {
        &self.archived_cards
    }

    pub fn last_fetch_date(&self) -> Option<NaiveDate> {
        self.last_fetch_date
    }

    pub fn add_topic(&mut self, query: &str, icon: Option<&str>) -> Result<Topic, FeedError> {
        if query.trim().is_empty() {
            return Err(FeedError::EmptyQuery);
        }
        let topic = Topic::new(query, icon);
        self.topics.push(topic.clone());
        info!(topic = %topic.query, id = %topic.id, "topic added");
        Ok(topic)
    }

    /// Cards already generated for the topic stay until the day ends.
    pub fn remove_topic(&mut self, id: &str) -> bool {
        let before = self.topics.len();
        self.topics.retain(|t| t.id != id);
        before != self.topics.len()
    }

    /// Moves an active card to the front of the archive.
    pub fn archive_card(&mut self, id: &str) -> bool {
        let Some(index) = self.active_cards.iter().position(|c| c.id == id) else {
            return false;
        };
        let mut card = self.active_cards.remove(index);
        card.is_archived = true;
        self.archived_cards.insert(0, card);
        debug!(card = %id, "card archived");
        true
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        match self
            .active_cards
            .iter_mut()
            .chain(self.archived_cards.iter_mut())
            .find(|c| c.id == id)
        {
            Some(card) => {
                card.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn find_card(&self, id: &str) -> Option<&ArticleCard> {
        self.active_cards
            .iter()
            .chain(self.archived_cards.iter())
            .find(|c| c.id == id)
    }

    /// Puts freshly generated cards on top of the active list.
    pub fn prepend_active(&mut self, cards: Vec<ArticleCard>) {
        let cards = cards.into_iter().map(Self::as_active);
        self.active_cards.splice(0..0, cards);
    }

    /// Replaces the active list. Cards it held are archived rather than dropped.
    pub fn set_active(&mut self, cards: Vec<ArticleCard>) {
        self.archive_all_active();
        self.active_cards = cards.into_iter().map(Self::as_active).collect();
    }

    /// Day-boundary check. When `today` differs from the last fetch date, every
    /// active card is archived, the active list is emptied and the marker is
    /// moved to `today`. Returns whether the rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_fetch_date == Some(today) {
            return false;
        }
        let moved = self.archive_all_active();
        self.last_fetch_date = Some(today);
        info!(%today, archived = moved, "new day, active cards archived");
        true
    }

    /// Same as a rollover but regardless of the date.
    pub fn force_roll_over(&mut self, today: NaiveDate) {
        self.last_fetch_date = None;
        self.roll_over(today);
    }

    /// Appends every active card to the end of the archive, in order.
    fn archive_all_active(&mut self) -> usize {
        let moved = self.active_cards.len();
        self.archived_cards
            .extend(self.active_cards.drain(..).map(|mut c| {
                c.is_archived = true;
                c
            }));
        moved
    }

    fn as_active(mut card: ArticleCard) -> ArticleCard {
        card.is_archived = false;
        card
    }
}

use futures::future::join_all;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{info, warn};
use uuid::Uuid;

use super::search::search_topic;
use super::structure::{RawCard, structure_results};
use super::{GenerateError, MAX_CARDS_PER_TOPIC};
use crate::gemini::GenerativeClient;
use crate::model::{self, ArticleCard, GroundingSource, Topic};

/// Titles of earlier cards handed to the search prompt so it looks for new angles.
const AVOID_TITLES_PER_TOPIC: usize = 10;
const IMAGE_SEED_CHARS: usize = 10;

/// Runs the search → structure pipeline per topic and turns the result into cards.
pub struct CardGenerator<C> {
    client: C,
    cards_per_topic: usize,
}

impl<C: GenerativeClient> CardGenerator<C> {
    pub fn new(client: C, cards_per_topic: usize) -> Self {
        Self {
            client,
            cards_per_topic: cards_per_topic.clamp(1, MAX_CARDS_PER_TOPIC),
        }
    }

    #[cfg(test)]
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cards_per_topic(&self) -> usize {
        self.cards_per_topic
    }

    /// Generates cards for a single topic. Only the search stage can fail;
    /// structuring problems surface as an empty list.
    pub async fn generate_for_topic(
        &self,
        topic: &Topic,
        avoid_titles: &[String],
    ) -> Result<Vec<ArticleCard>, GenerateError> {
        let search = search_topic(&self.client, &topic.query, self.cards_per_topic, avoid_titles)
            .await?;

        if search.text.trim().is_empty() {
            warn!(topic = %topic.query, "search returned no text, skipping formatting");
            return Ok(Vec::new());
        }

        let raw = structure_results(&self.client, &search.text, &topic.query, self.cards_per_topic)
            .await;

        Ok(raw
            .into_iter()
            .map(|item| enrich(item, topic, &search.sources))
            .collect())
    }

    /// Fans out one pipeline per topic and merges the results in random order.
    /// A failed topic contributes no cards and never aborts the others.
    pub async fn generate_for_topics(
        &self,
        topics: &[Topic],
        history: &[ArticleCard],
    ) -> Vec<ArticleCard> {
        let pipelines = topics.iter().map(|topic| async move {
            let avoid = recent_titles(history, &topic.id);
            match self.generate_for_topic(topic, &avoid).await {
                Ok(cards) => cards,
                Err(e) => {
                    warn!(topic = %topic.query, error = %e, "topic generation failed");
                    Vec::new()
                }
            }
        });

        let mut cards: Vec<ArticleCard> = join_all(pipelines).await.into_iter().flatten().collect();
        fastrand::shuffle(&mut cards);

        info!(topics = topics.len(), cards = cards.len(), "generation complete");
        cards
    }
}

fn enrich(item: RawCard, topic: &Topic, sources: &[GroundingSource]) -> ArticleCard {
    ArticleCard {
        id: Uuid::new_v4().to_string(),
        topic_id: topic.id.clone(),
        topic_query: topic.query.clone(),
        image_url: placeholder_image(&item.title),
        title: item.title,
        teaser: item.teaser,
        content: item.content,
        generated_at: model::now(),
        sources: sources.to_vec(),
        is_read: false,
        is_archived: false,
    }
}

fn recent_titles(history: &[ArticleCard], topic_id: &str) -> Vec<String> {
    let mut cards: Vec<&ArticleCard> = history.iter().filter(|c| c.topic_id == topic_id).collect();
    cards.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
    cards
        .into_iter()
        .take(AVOID_TITLES_PER_TOPIC)
        .map(|c| c.title.clone())
        .collect()
}

/// Stable picsum.photos URL seeded by the first characters of the title.
pub fn placeholder_image(title: &str) -> String {
    let seed: String = title
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(IMAGE_SEED_CHARS)
        .collect();
    let seed = if seed.is_empty() { "crawler".to_string() } else { seed };
    format!(
        "https://picsum.photos/seed/{}/600/400",
        utf8_percent_encode(&seed, NON_ALPHANUMERIC)
    )
}

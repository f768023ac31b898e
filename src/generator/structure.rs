use serde::Deserialize;
use tracing::{debug, warn};

use crate::gemini::GenerativeClient;
use crate::gemini::types::Schema;

/// One card as returned by the model, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawCard {
    pub title: String,
    pub teaser: String,
    pub content: String,
}

pub fn card_schema(count: usize) -> Schema {
    Schema::array_of(
        Schema::object(vec![
            (
                "title",
                Schema::string("A catchy, clickbait-style headline for the news item. Max 10 words."),
            ),
            (
                "teaser",
                Schema::string(
                    "A short, intriguing summary (under 150 chars) that makes the user want to read more.",
                ),
            ),
            (
                "content",
                Schema::string(
                    "A detailed explanation of the news item, main findings, or key points. Markdown supported.",
                ),
            ),
        ]),
        Some(count),
    )
}

pub fn structure_prompt(search_text: &str, query: &str, count: usize) -> String {
    format!(
        "You are an editor for a tech news aggregator called \"Crawler\".\n\
         Here is raw information gathered from a search about \"{query}\":\n\
         \n\
         ---\n\
         {search_text}\n\
         ---\n\
         \n\
         Extract exactly {count} distinct news items/stories from this text.\n\
         Format them into the requested JSON structure.\n\
         Make the titles punchy and interesting."
    )
}

/// Parses the model's JSON array, tolerating a surrounding Markdown code fence.
/// Items without a title are dropped and the list is capped at `count`.
pub fn parse_cards(text: &str, count: usize) -> Result<Vec<RawCard>, serde_json::Error> {
    let cards: Vec<RawCard> = serde_json::from_str(strip_code_fence(text))?;
    Ok(cards
        .into_iter()
        .filter(|c| !c.title.trim().is_empty())
        .take(count)
        .collect())
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Splits search text into cards. Never fails: provider and parse errors yield no cards.
pub async fn structure_results(
    client: &impl GenerativeClient,
    search_text: &str,
    query: &str,
    count: usize,
) -> Vec<RawCard> {
    let prompt = structure_prompt(search_text, query, count);
    let text = match client.generate_json(&prompt, &card_schema(count)).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            warn!(topic = %query, "formatting step returned no text");
            return Vec::new();
        }
        Err(e) => {
            warn!(topic = %query, error = %e, "formatting step failed");
            return Vec::new();
        }
    };

    match parse_cards(&text, count) {
        Ok(cards) => {
            debug!(topic = %query, cards = cards.len(), "formatting step complete");
            cards
        }
        Err(e) => {
            warn!(topic = %query, error = %e, "formatting step returned invalid JSON");
            Vec::new()
        }
    }
}

use tracing::{debug, warn};

use super::GenerateError;
use crate::gemini::GenerativeClient;
use crate::model::GroundingSource;

#[derive(Debug, Default)]
pub struct SearchOutput {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

pub fn search_prompt(query: &str, stories: usize, avoid_titles: &[String]) -> String {
    let mut prompt = format!(
        "Find the latest, most interesting, and specific news, research papers, or developments regarding: \"{query}\".\n\
         Focus on items from the last 24-48 hours if possible.\n\
         Provide a comprehensive summary of {stories} distinct stories/papers found."
    );
    if !avoid_titles.is_empty() {
        prompt.push_str(
            "\n\nThese stories were already covered recently. Do not repeat them; find new developments or a different angle:\n",
        );
        for title in avoid_titles {
            prompt.push_str(&format!("- {title}\n"));
        }
    }
    prompt
}

/// Grounded search for one topic. Provider failures collapse into `SearchFailed`.
pub async fn search_topic(
    client: &impl GenerativeClient,
    query: &str,
    stories: usize,
    avoid_titles: &[String],
) -> Result<SearchOutput, GenerateError> {
    let prompt = search_prompt(query, stories, avoid_titles);
    let result = client.search(&prompt).await.map_err(|source| {
        warn!(topic = %query, error = %source, "search step failed");
        GenerateError::SearchFailed {
            query: query.to_string(),
            source,
        }
    })?;

    debug!(topic = %query, sources = result.sources.len(), "search step complete");
    Ok(SearchOutput {
        text: result.text.unwrap_or_default(),
        sources: result.sources,
    })
}

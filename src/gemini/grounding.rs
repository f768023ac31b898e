use std::collections::HashSet;

use tracing::warn;

use super::types::{GenerateContentResponse, GroundedResult};
use crate::model::GroundingSource;

pub fn extract_grounded_result(response: &GenerateContentResponse) -> GroundedResult {
    let text = response.text();

    if text.is_none() {
        warn!("Gemini returned empty answer (safety filter or empty response)");
    }

    let metadata = response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.grounding_metadata.as_ref());

    let mut seen = HashSet::new();
    let sources = metadata
        .and_then(|m| m.grounding_chunks.as_ref())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let web = chunk.web.as_ref()?;
                    let uri = web.uri.as_ref().filter(|u| !u.is_empty())?;
                    let title = web.title.as_ref().filter(|t| !t.is_empty())?;
                    Some(GroundingSource {
                        title: title.clone(),
                        uri: uri.clone(),
                    })
                })
                .filter(|source| seen.insert(source.uri.clone()))
                .collect()
        })
        .unwrap_or_default();

    GroundedResult { text, sources }
}

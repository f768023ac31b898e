//! Card generation: grounded search, structuring into cards, per-topic fan-out.

mod orchestrator;
mod search;
mod structure;

pub use orchestrator::{CardGenerator, placeholder_image};

#[cfg(test)]
pub(crate) use orchestrator::tests::MockModel;

use crate::gemini::GeminiError;

/// Stories requested per topic when nothing else is configured.
pub const DEFAULT_CARDS_PER_TOPIC: usize = 3;
/// Upper bound accepted for `cards_per_topic`.
pub const MAX_CARDS_PER_TOPIC: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("search failed for topic \"{query}\"")]
    SearchFailed {
        query: String,
        #[source]
        source: GeminiError,
    },
}

use tracing::{debug, error};

use super::{KvStore, StoreError};
use crate::feed::AppState;

const STATE_KEY: &str = "crawler_data_v1";

/// Persists the standalone `AppState` under a single key.
#[derive(Clone, Debug)]
pub struct StateStore {
    kv: KvStore,
}

impl StateStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Missing state yields the default state; so does an undecodable one, after logging.
    pub fn load(&self) -> AppState {
        let Some(text) = self.kv.get(STATE_KEY) else {
            return AppState::default();
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            error!(error = %e, "failed to load state, using defaults");
            AppState::default()
        })
    }

    pub fn save(&self, state: &AppState) -> Result<(), StoreError> {
        self.kv.set(STATE_KEY, serde_json::to_string(state)?)?;
        debug!(
            active = state.active_cards().len(),
            archived = state.archived_cards().len(),
            "state saved"
        );
        Ok(())
    }
}

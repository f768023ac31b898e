//! Local persistence: a JSON key-value file plus the typed views stored in it.

mod cache;
mod kv;
mod state;

pub use cache::FeedCache;
pub use kv::KvStore;
pub use state::StateStore;

const TOKEN_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Bearer token for the REST backend.
#[derive(Clone, Debug)]
pub struct TokenStore {
    kv: KvStore,
}

impl TokenStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub fn get(&self) -> Option<String> {
        self.kv.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set(&self, token: &str) -> Result<(), StoreError> {
        self.kv.set(TOKEN_KEY, token)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.kv.remove(&[TOKEN_KEY])
    }
}

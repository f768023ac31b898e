use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use reqwest::Client;
use tracing::debug;

use crate::api::DEFAULT_BACKEND_URL;
use crate::gemini::{GeminiClient, GeminiError};
use crate::generator::{CardGenerator, DEFAULT_CARDS_PER_TOPIC};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;
const FALLBACK_DATA_DIR: &str = ".crawler";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Gemini(#[from] GeminiError),
}

/// Settings shared by every subcommand. Each flag falls back to an environment variable.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Directory holding store.json (default: platform data dir)
    #[arg(long, env = "CRAWLER_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Gemini API key, required for generation
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", global = true)]
    pub gemini_model: Option<String>,

    /// REST backend base URL for `remote` commands
    #[arg(long, env = "CRAWLER_BACKEND_URL", default_value = DEFAULT_BACKEND_URL, global = true)]
    pub backend_url: String,

    /// Cards requested per topic (1-10)
    #[arg(
        long,
        default_value_t = DEFAULT_CARDS_PER_TOPIC as u8,
        value_parser = clap::value_parser!(u8).range(1..=10),
        global = true
    )]
    pub cards_per_topic: u8,
}

impl Settings {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "crawler")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
        })
    }

    pub fn http_client(&self) -> Result<Client, ConfigError> {
        Ok(Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?)
    }

    pub fn generator(&self, http: Client) -> Result<CardGenerator<GeminiClient>, ConfigError> {
        let gemini = GeminiClient::new(
            http,
            self.gemini_api_key.as_deref(),
            self.gemini_model.as_deref(),
        )?;
        let model = gemini.model().to_string();
        let generator = CardGenerator::new(gemini, usize::from(self.cards_per_topic));
        debug!(%model, cards_per_topic = generator.cards_per_topic(), "generator ready");
        Ok(generator)
    }
}

use std::error::Error;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::api::{ApiClient, label_topics};
use crate::config::Settings;
use crate::markdown;
use crate::model::{ArticleCard, Topic};
use crate::session::Session;
use crate::storage::{FeedCache, KvStore, StateStore, TokenStore};

#[derive(Debug, Parser)]
#[command(name = "crawler", version, about = "Topic news cards from Gemini search, in your terminal")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, add or remove topics
    Topics {
        #[command(subcommand)]
        action: Option<TopicsAction>,
    },
    /// Start a new day's feed: archive yesterday's cards and regenerate
    Refresh {
        /// Regenerate even if the feed was already fetched today
        #[arg(long)]
        force: bool,
    },
    /// Show active cards
    Feed,
    /// Show archived cards
    Archived,
    /// Move an active card to the archive
    Archive { card_id: String },
    /// Print a full article and mark it read
    Read { card_id: String },
    /// Generate cards for a one-off query without saving anything
    Generate {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Talk to the REST backend instead of generating locally
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum TopicsAction {
    List,
    Add {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    Remove {
        topic_id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum RemoteAction {
    Feed {
        /// Bypass the local cache
        #[arg(long)]
        refresh: bool,
    },
    Archived {
        #[arg(long)]
        refresh: bool,
    },
    Topics,
    AddTopic {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    RemoveTopic {
        topic_id: String,
    },
    Generate {
        topic_id: String,
    },
    Archive {
        card_id: String,
    },
    /// Mark a card consumed
    Swipe {
        card_id: String,
    },
    Delete {
        card_id: String,
    },
    /// Exchange a Google ID token for a backend session
    Login {
        id_token: String,
    },
    Me,
    Logout,
}

/// Commands that work on the local feed state.
enum LocalCommand {
    Topics(TopicsAction),
    Refresh { force: bool },
    Feed,
    Archived,
    Archive(String),
    Read(String),
}

pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = cli.settings;
    let kv = KvStore::open(&settings.data_dir())?;
    info!(store = %kv.path().display(), "using local store");

    let local = match cli.command {
        Command::Remote { action } => return run_remote(&settings, kv, action).await,
        Command::Generate { query } => return generate_once(&settings, &query.join(" ")).await,
        Command::Topics { action } => LocalCommand::Topics(action.unwrap_or(TopicsAction::List)),
        Command::Refresh { force } => LocalCommand::Refresh { force },
        Command::Feed => LocalCommand::Feed,
        Command::Archived => LocalCommand::Archived,
        Command::Archive { card_id } => LocalCommand::Archive(card_id),
        Command::Read { card_id } => LocalCommand::Read(card_id),
    };
    run_local(&settings, kv, local).await
}

async fn generate_once(settings: &Settings, query: &str) -> Result<(), Box<dyn Error>> {
    let generator = settings.generator(settings.http_client()?)?;
    let topic = Topic::new(query, None);
    let cards = generator.generate_for_topic(&topic, &[]).await?;
    for card in &cards {
        println!("{}", markdown::article(card));
    }
    if cards.is_empty() {
        println!("(no cards generated)");
    }
    Ok(())
}

async fn run_local(
    settings: &Settings,
    kv: KvStore,
    command: LocalCommand,
) -> Result<(), Box<dyn Error>> {
    let today = Utc::now().date_naive();
    let mut session = Session::open(StateStore::new(kv), today)?;

    // A new day regenerates the feed before any command runs, when a key is set.
    if session.needs_fetch() && !matches!(command, LocalCommand::Refresh { .. }) {
        match settings.generator(settings.http_client()?) {
            Ok(generator) => {
                if let Some(n) = session.refresh(&generator, false).await? {
                    println!("new day: {n} new cards for {today}");
                }
            }
            Err(e) => {
                warn!(error = %e, "new day started but the feed was not regenerated");
                println!("new day: yesterday's cards archived; run `crawler refresh` to fetch");
            }
        }
    }

    match command {
        LocalCommand::Topics(action) => match action {
            TopicsAction::List => print!("{}", markdown::topic_list(session.state().topics())),
            TopicsAction::Add { query, icon } => {
                let generator = settings.generator(settings.http_client()?)?;
                let (topic, cards) = session
                    .add_topic(&generator, &query.join(" "), icon.as_deref())
                    .await?;
                println!("added topic `{}` ({} new cards)", topic.id, cards);
            }
            TopicsAction::Remove { topic_id } => {
                if session.remove_topic(&topic_id)? {
                    println!("removed topic `{topic_id}`");
                } else {
                    println!("no topic `{topic_id}`");
                }
            }
        },
        LocalCommand::Refresh { force } => {
            let generator = settings.generator(settings.http_client()?)?;
            match session.refresh(&generator, force).await? {
                Some(n) => println!("{n} new cards for {today}"),
                None => println!("feed already fetched for {today} (use --force to regenerate)"),
            }
        }
        LocalCommand::Feed => print!(
            "{}",
            markdown::card_list(session.state().active_cards(), "feed is empty; run `crawler refresh`")
        ),
        LocalCommand::Archived => print!(
            "{}",
            markdown::card_list(session.state().archived_cards(), "archive is empty")
        ),
        LocalCommand::Archive(card_id) => {
            if session.archive(&card_id)? {
                println!("archived `{card_id}`");
            } else {
                println!("no active card `{card_id}`");
            }
        }
        LocalCommand::Read(card_id) => match session.read(&card_id)? {
            Some(card) => println!("{}", markdown::article(card)),
            None => println!("no card `{card_id}`"),
        },
    }
    Ok(())
}

async fn run_remote(settings: &Settings, kv: KvStore, action: RemoteAction) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::new(
        settings.http_client()?,
        &settings.backend_url,
        TokenStore::new(kv.clone()),
        FeedCache::new(kv),
    )?;

    match action {
        RemoteAction::Feed { refresh } => {
            let mut cards = api.feed(refresh).await?;
            label_remote(&api, &mut cards).await;
            print!("{}", markdown::card_list(&cards, "feed is empty"));
        }
        RemoteAction::Archived { refresh } => {
            let mut cards = api.archived(refresh).await?;
            label_remote(&api, &mut cards).await;
            print!("{}", markdown::card_list(&cards, "archive is empty"));
        }
        RemoteAction::Topics => print!("{}", markdown::topic_list(&api.topics().await?)),
        RemoteAction::AddTopic { query, icon } => {
            let topic = api.create_topic(&query.join(" "), icon.as_deref()).await?;
            println!("added topic `{}`", topic.id);
        }
        RemoteAction::RemoveTopic { topic_id } => {
            api.delete_topic(&topic_id).await?;
            println!("removed topic `{topic_id}`");
        }
        RemoteAction::Generate { topic_id } => {
            let card = api.generate(&topic_id).await?;
            println!("{}", markdown::article(&card));
        }
        RemoteAction::Archive { card_id } => {
            api.archive_article(&card_id).await?;
            println!("archived `{card_id}`");
        }
        RemoteAction::Swipe { card_id } => {
            api.swipe_article(&card_id).await?;
            println!("swiped `{card_id}`");
        }
        RemoteAction::Delete { card_id } => {
            api.delete_article(&card_id).await?;
            println!("deleted `{card_id}`");
        }
        RemoteAction::Login { id_token } => {
            let login = api.login_google(&id_token).await?;
            println!("logged in{}", login.user_id.map(|u| format!(" as {u}")).unwrap_or_default());
        }
        RemoteAction::Me => match api.me().await? {
            Some(user) => println!(
                "{} <{}> ({})",
                user.name.unwrap_or_default(),
                user.email.unwrap_or_default(),
                user.id
            ),
            None => println!("not logged in"),
        },
        RemoteAction::Logout => {
            api.logout()?;
            println!("logged out");
        }
    }
    Ok(())
}

/// Topic labels are cosmetic; a failed topic lookup leaves cards unlabeled.
async fn label_remote(api: &ApiClient, cards: &mut [ArticleCard]) {
    match api.topics().await {
        Ok(topics) => label_topics(cards, &topics),
        Err(e) => warn!(error = %e, "could not load topics for labels"),
    }
}

//! Standalone session: feed state loaded from storage, mutated, and saved back
//! after every change.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::feed::{AppState, FeedError};
use crate::gemini::GenerativeClient;
use crate::generator::CardGenerator;
use crate::model::{ArticleCard, Topic};
use crate::storage::{StateStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Session {
    state: AppState,
    store: StateStore,
    today: NaiveDate,
    rolled_over: bool,
}

impl Session {
    /// Loads the state and runs the day-boundary check for `today`. A rollover
    /// is saved before this returns, so no later step can see yesterday's
    /// cards as active.
    pub fn open(store: StateStore, today: NaiveDate) -> Result<Self, StoreError> {
        let mut state = store.load();
        let rolled_over = state.roll_over(today);
        if rolled_over {
            store.save(&state)?;
        }
        Ok(Self {
            state,
            store,
            today,
            rolled_over,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Whether opening this session started a new day whose cards have not
    /// been generated yet.
    pub fn needs_fetch(&self) -> bool {
        self.rolled_over
    }

    /// Generates cards for every topic. Without `force` this only runs after a
    /// rollover or when the active list is empty, and new cards go on top of
    /// whatever was already added today. With `force` the active cards are
    /// archived and saved first. Returns the number of new cards, or `None`
    /// when the feed is already current.
    pub async fn refresh<C: GenerativeClient>(
        &mut self,
        generator: &CardGenerator<C>,
        force: bool,
    ) -> Result<Option<usize>, StoreError> {
        if force {
            self.state.force_roll_over(self.today);
            self.store.save(&self.state)?;
        } else if !self.rolled_over && !self.state.active_cards().is_empty() {
            return Ok(None);
        }
        self.rolled_over = false;

        if self.state.topics().is_empty() {
            info!("no topics, nothing to fetch");
            return Ok(Some(0));
        }

        let cards = generator
            .generate_for_topics(self.state.topics(), self.state.archived_cards())
            .await;
        let count = cards.len();
        if force {
            self.state.set_active(cards);
        } else {
            self.state.prepend_active(cards);
        }
        self.store.save(&self.state)?;
        Ok(Some(count))
    }

    /// Adds a topic and immediately generates its first cards on top of the
    /// feed. A failed generation keeps the topic and yields zero cards.
    pub async fn add_topic<C: GenerativeClient>(
        &mut self,
        generator: &CardGenerator<C>,
        query: &str,
        icon: Option<&str>,
    ) -> Result<(Topic, usize), SessionError> {
        let topic = self.state.add_topic(query, icon)?;
        self.store.save(&self.state)?;

        let cards = match generator.generate_for_topic(&topic, &[]).await {
            Ok(cards) => cards,
            Err(e) => {
                warn!(topic = %topic.query, error = %e, "initial fetch for new topic failed");
                Vec::new()
            }
        };
        let count = cards.len();
        if count > 0 {
            self.state.prepend_active(cards);
            self.store.save(&self.state)?;
        }
        Ok((topic, count))
    }

    pub fn remove_topic(&mut self, id: &str) -> Result<bool, StoreError> {
        self.mutate(|state| state.remove_topic(id))
    }

    pub fn archive(&mut self, card_id: &str) -> Result<bool, StoreError> {
        self.mutate(|state| state.archive_card(card_id))
    }

    /// Marks the card read and returns it.
    pub fn read(&mut self, card_id: &str) -> Result<Option<&ArticleCard>, StoreError> {
        self.mutate(|state| state.mark_read(card_id))?;
        Ok(self.state.find_card(card_id))
    }

    fn mutate(&mut self, f: impl FnOnce(&mut AppState) -> bool) -> Result<bool, StoreError> {
        let changed = f(&mut self.state);
        if changed {
            self.store.save(&self.state)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::gemini::GeminiError;
    use crate::gemini::types::{GroundedResult, Schema};
    use crate::generator::MockModel;
    use crate::model::fixtures::card;
    use crate::storage::KvStore;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn store(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(KvStore::open(dir.path()).unwrap())
    }

    /// Records what the persisted state looked like when generation started.
    struct Probe {
        inner: MockModel,
        store: StateStore,
        active_at_search: Mutex<Vec<usize>>,
    }

    impl GenerativeClient for Probe {
        async fn search(&self, prompt: &str) -> Result<GroundedResult, GeminiError> {
            let persisted = self.store.load();
            self.active_at_search
                .lock()
                .unwrap()
                .push(persisted.active_cards().len());
            self.inner.search(prompt).await
        }

        async fn generate_json(
            &self,
            prompt: &str,
            schema: &Schema,
        ) -> Result<Option<String>, GeminiError> {
            self.inner.generate_json(prompt, schema).await
        }
    }

    fn seeded(dir: &tempfile::TempDir, day: &str) -> StateStore {
        let s = store(dir);
        let mut state = AppState::empty();
        let ai = state.add_topic("AI", None).unwrap();
        let space = state.add_topic("Space", None).unwrap();
        state.roll_over(date(day));
        state.prepend_active(vec![card("old1", &ai), card("old2", &space)]);
        s.save(&state).unwrap();
        s
    }

    fn archived_ids(state: &AppState) -> Vec<&str> {
        state.archived_cards().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn opening_on_a_new_day_archives_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-18");

        let session = Session::open(s.clone(), date("2026-10-19")).unwrap();

        assert!(session.needs_fetch());
        let reloaded = s.load();
        assert!(reloaded.active_cards().is_empty());
        assert_eq!(archived_ids(&reloaded), ["old1", "old2"]);
        assert_eq!(reloaded.last_fetch_date(), Some(date("2026-10-19")));
    }

    #[tokio::test]
    async fn new_day_archives_then_regenerates_all_topics() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-18");
        let probe = Probe {
            inner: MockModel::new()
                .topic_with_cards("AI", 3)
                .topic_with_cards("Space", 3),
            store: s.clone(),
            active_at_search: Mutex::new(Vec::new()),
        };
        let generator = CardGenerator::new(probe, 3);
        let mut session = Session::open(s.clone(), date("2026-10-19")).unwrap();

        let added = session.refresh(&generator, false).await.unwrap();

        assert_eq!(added, Some(6));
        assert!(!session.needs_fetch());
        assert_eq!(
            *generator.client().active_at_search.lock().unwrap(),
            [0, 0],
            "active list must be cleared and saved before fetching"
        );
        let reloaded = s.load();
        assert_eq!(reloaded.active_cards().len(), 6);
        assert_eq!(archived_ids(&reloaded), ["old1", "old2"]);
        assert_eq!(reloaded.last_fetch_date(), Some(date("2026-10-19")));
        assert!(
            reloaded
                .active_cards()
                .iter()
                .all(|c| !c.is_archived && reloaded.archived_cards().iter().all(|a| a.id != c.id))
        );
    }

    #[tokio::test]
    async fn same_day_refresh_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-19");
        let generator = CardGenerator::new(MockModel::new(), 3);
        let mut session = Session::open(s, date("2026-10-19")).unwrap();

        assert!(!session.needs_fetch());
        let added = session.refresh(&generator, false).await.unwrap();

        assert_eq!(added, None);
        assert_eq!(session.state().active_cards().len(), 2);
        assert!(generator.client().search_prompts().is_empty());
    }

    #[tokio::test]
    async fn refresh_fills_feed_left_empty_by_an_earlier_rollover() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-18");
        drop(Session::open(s.clone(), date("2026-10-19")).unwrap());

        let generator = CardGenerator::new(MockModel::new().topic_with_cards("AI", 3), 3);
        let mut session = Session::open(s, date("2026-10-19")).unwrap();
        assert!(!session.needs_fetch());

        let added = session.refresh(&generator, false).await.unwrap();

        assert_eq!(added, Some(3));
        assert_eq!(archived_ids(session.state()), ["old1", "old2"]);
    }

    #[tokio::test]
    async fn forced_refresh_regenerates_within_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-19");
        let generator = CardGenerator::new(MockModel::new().topic_with_cards("AI", 2), 3);
        let mut session = Session::open(s, date("2026-10-19")).unwrap();

        let added = session.refresh(&generator, true).await.unwrap();

        // Space has no canned response and fails; AI still delivers.
        assert_eq!(added, Some(2));
        assert_eq!(session.state().archived_cards().len(), 2);
        assert_eq!(session.state().active_cards().len(), 2);
    }

    #[tokio::test]
    async fn topic_added_on_a_new_day_keeps_its_cards_through_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-18");
        let generator = CardGenerator::new(
            MockModel::new()
                .topic_with_cards("Biology", 3)
                .topic_with_cards("AI", 3)
                .topic_with_cards("Space", 3),
            3,
        );
        let mut session = Session::open(s.clone(), date("2026-10-19")).unwrap();

        let (bio, count) = session.add_topic(&generator, "Biology", None).await.unwrap();
        assert_eq!(count, 3);
        let after_add = s.load();
        assert_eq!(after_add.last_fetch_date(), Some(date("2026-10-19")));
        assert_eq!(after_add.active_cards().len(), 3);

        // Biology's canned response is used up, so only AI and Space add cards.
        let added = session.refresh(&generator, false).await.unwrap();

        assert_eq!(added, Some(6));
        let reloaded = s.load();
        assert_eq!(reloaded.active_cards().len(), 9);
        assert_eq!(
            reloaded.active_cards().iter().filter(|c| c.topic_id == bio.id).count(),
            3
        );
        assert_eq!(archived_ids(&reloaded), ["old1", "old2"]);
    }

    #[tokio::test]
    async fn add_topic_prepends_its_cards() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-19");
        let generator = CardGenerator::new(MockModel::new().topic_with_cards("Biology", 3), 3);
        let mut session = Session::open(s.clone(), date("2026-10-19")).unwrap();

        let (topic, count) = session.add_topic(&generator, "Biology", None).await.unwrap();

        assert_eq!(count, 3);
        let reloaded = s.load();
        assert!(reloaded.topics().iter().any(|t| t.id == topic.id));
        assert_eq!(reloaded.active_cards().len(), 5);
        assert!(reloaded.active_cards()[..3].iter().all(|c| c.topic_id == topic.id));
    }

    #[tokio::test]
    async fn add_topic_keeps_topic_when_generation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-19");
        let generator = CardGenerator::new(MockModel::new(), 3);
        let mut session = Session::open(s.clone(), date("2026-10-19")).unwrap();

        let (topic, count) = session.add_topic(&generator, "Chemistry", None).await.unwrap();

        assert_eq!(count, 0);
        assert!(s.load().topics().iter().any(|t| t.id == topic.id));
    }

    #[tokio::test]
    async fn add_topic_rejects_blank_query() {
        let dir = tempfile::tempdir().unwrap();
        let generator = CardGenerator::new(MockModel::new(), 3);
        let mut session = Session::open(store(&dir), date("2026-10-19")).unwrap();

        let err = session.add_topic(&generator, "  ", None).await.unwrap_err();
        assert!(matches!(err, SessionError::Feed(FeedError::EmptyQuery)));
    }

    #[test]
    fn archive_and_read_persist() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-19");
        let mut session = Session::open(s.clone(), date("2026-10-19")).unwrap();

        assert!(session.archive("old2").unwrap());
        assert!(!session.archive("old2").unwrap());
        let read = session.read("old1").unwrap().unwrap();
        assert!(read.is_read);
        assert!(session.read("nope").unwrap().is_none());

        let reloaded = s.load();
        assert_eq!(reloaded.archived_cards()[0].id, "old2");
        assert!(reloaded.archived_cards()[0].is_archived);
        assert!(reloaded.find_card("old1").unwrap().is_read);
    }

    #[test]
    fn remove_topic_persists() {
        let dir = tempfile::tempdir().unwrap();
        let s = seeded(&dir, "2026-10-19");
        let mut session = Session::open(s.clone(), date("2026-10-19")).unwrap();

        let id = session.state().topics()[0].id.clone();
        assert!(session.remove_topic(&id).unwrap());
        assert_eq!(s.load().topics().len(), 1);
    }
}

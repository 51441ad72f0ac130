//! Test doubles for the catalog, favorites and credential seams.

use crate::catalog::{
    CastMember, CatalogError, Episode, PersonId, RemoteCatalog, ScoredPerson, ScoredShow, Show,
    ShowId,
};
use crate::favorites::FavoritesPersistence;
use crate::lock::CredentialStore;
use crate::storage::PersistenceError;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A recorded catalog request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    FetchPage { page: u32 },
    FetchShow { id: ShowId },
    SearchShows { query: String },
    FetchEpisodes { show_id: ShowId },
    FetchCast { show_id: ShowId },
    SearchPeople { query: String },
    FetchCastCredits { person_id: PersonId },
}

#[derive(Debug, Default)]
struct MockCatalogData {
    pages: HashMap<u32, Vec<Show>>,
    failing_pages: HashSet<u32>,
    shows: HashMap<ShowId, Show>,
    failing_shows: HashSet<ShowId>,
    search_results: Vec<ScoredShow>,
    fail_searches: bool,
    episodes: HashMap<ShowId, Vec<Episode>>,
    cast: HashMap<ShowId, Vec<CastMember>>,
    people_results: Vec<ScoredPerson>,
    cast_credits: HashMap<PersonId, Vec<Show>>,
    calls: Vec<RecordedCall>,
    page_gate: Option<Arc<Notify>>,
    show_gate: Option<Arc<Notify>>,
}

/// Mock implementation of the RemoteCatalog trait.
///
/// Clones share their data, so a test can keep one handle for assertions
/// while the store owns another. Unknown pages are empty, unknown shows are
/// `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    data: Arc<Mutex<MockCatalogData>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_data<R>(&self, f: impl FnOnce(&mut MockCatalogData) -> R) -> R {
        f(&mut self.data.lock().unwrap())
    }

    fn record(&self, call: RecordedCall) {
        self.with_data(|data| data.calls.push(call));
    }

    pub fn set_page(&self, page: u32, shows: Vec<Show>) {
        self.with_data(|data| {
            data.pages.insert(page, shows);
        });
    }

    pub fn fail_page(&self, page: u32) {
        self.with_data(|data| {
            data.failing_pages.insert(page);
        });
    }

    /// Makes every page fetch wait for a notification on `gate` first.
    pub fn set_page_gate(&self, gate: Arc<Notify>) {
        self.with_data(|data| data.page_gate = Some(gate));
    }

    /// Makes every single show fetch wait for a notification on `gate` first.
    pub fn set_show_gate(&self, gate: Arc<Notify>) {
        self.with_data(|data| data.show_gate = Some(gate));
    }

    pub fn add_show(&self, show: Show) {
        self.with_data(|data| {
            data.shows.insert(show.id, show);
        });
    }

    pub fn fail_show(&self, id: ShowId) {
        self.with_data(|data| {
            data.failing_shows.insert(id);
        });
    }

    pub fn set_search_results(&self, results: Vec<ScoredShow>) {
        self.with_data(|data| data.search_results = results);
    }

    pub fn fail_searches(&self, fail: bool) {
        self.with_data(|data| data.fail_searches = fail);
    }

    pub fn set_episodes(&self, show_id: ShowId, episodes: Vec<Episode>) {
        self.with_data(|data| {
            data.episodes.insert(show_id, episodes);
        });
    }

    pub fn set_cast(&self, show_id: ShowId, cast: Vec<CastMember>) {
        self.with_data(|data| {
            data.cast.insert(show_id, cast);
        });
    }

    pub fn set_people_results(&self, results: Vec<ScoredPerson>) {
        self.with_data(|data| data.people_results = results);
    }

    pub fn set_cast_credits(&self, person_id: PersonId, shows: Vec<Show>) {
        self.with_data(|data| {
            data.cast_credits.insert(person_id, shows);
        });
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.with_data(|data| data.calls.clone())
    }

    /// Pages requested so far, in order.
    pub fn page_requests(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::FetchPage { page } => Some(page),
                _ => None,
            })
            .collect()
    }

    /// Single shows requested so far, sorted.
    pub fn show_requests(&self) -> Vec<ShowId> {
        let mut ids: Vec<ShowId> = self
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::FetchShow { id } => Some(id),
                _ => None,
            })
            .collect();
        ids.sort_unstable();
        ids
    }

    fn search_failure(&self) -> Option<CatalogError> {
        self.with_data(|data| data.fail_searches)
            .then(|| CatalogError::Transport("simulated search failure".to_string()))
    }
}

#[async_trait]
impl RemoteCatalog for MockCatalog {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Show>, CatalogError> {
        self.record(RecordedCall::FetchPage { page });

        let gate = self.with_data(|data| data.page_gate.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.with_data(|data| {
            if data.failing_pages.contains(&page) {
                return Err(CatalogError::Decode("simulated page failure".to_string()));
            }
            Ok(data.pages.get(&page).cloned().unwrap_or_default())
        })
    }

    async fn fetch_show(&self, id: ShowId) -> Result<Show, CatalogError> {
        self.record(RecordedCall::FetchShow { id });

        let gate = self.with_data(|data| data.show_gate.clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.with_data(|data| {
            if data.failing_shows.contains(&id) {
                return Err(CatalogError::Transport("simulated show failure".to_string()));
            }
            data.shows
                .get(&id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("shows/{id}")))
        })
    }

    async fn search_shows(&self, query: &str) -> Result<Vec<ScoredShow>, CatalogError> {
        self.record(RecordedCall::SearchShows {
            query: query.to_string(),
        });

        if let Some(error) = self.search_failure() {
            return Err(error);
        }
        Ok(self.with_data(|data| data.search_results.clone()))
    }

    async fn fetch_episodes(&self, show_id: ShowId) -> Result<Vec<Episode>, CatalogError> {
        self.record(RecordedCall::FetchEpisodes { show_id });

        self.with_data(|data| {
            data.episodes
                .get(&show_id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("shows/{show_id}/episodes")))
        })
    }

    async fn fetch_cast(&self, show_id: ShowId) -> Result<Vec<CastMember>, CatalogError> {
        self.record(RecordedCall::FetchCast { show_id });

        self.with_data(|data| {
            data.cast
                .get(&show_id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("shows/{show_id}/cast")))
        })
    }

    async fn search_people(&self, query: &str) -> Result<Vec<ScoredPerson>, CatalogError> {
        self.record(RecordedCall::SearchPeople {
            query: query.to_string(),
        });

        if let Some(error) = self.search_failure() {
            return Err(error);
        }
        Ok(self.with_data(|data| data.people_results.clone()))
    }

    async fn fetch_cast_credits(&self, person_id: PersonId) -> Result<Vec<Show>, CatalogError> {
        self.record(RecordedCall::FetchCastCredits { person_id });

        self.with_data(|data| {
            data.cast_credits
                .get(&person_id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(format!("people/{person_id}/castcredits")))
        })
    }
}

fn simulated_io_error() -> io::Error {
    io::Error::other("simulated storage failure")
}

/// In-memory favorites that can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryFavorites {
    ids: Arc<Mutex<BTreeSet<ShowId>>>,
    fail_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryFavorites {
    pub fn with_ids(ids: impl IntoIterator<Item = ShowId>) -> Self {
        let favorites = Self::default();
        *favorites.ids.lock().unwrap() = ids.into_iter().collect();
        favorites
    }

    /// The last successfully saved set.
    pub fn stored(&self) -> BTreeSet<ShowId> {
        self.ids.lock().unwrap().clone()
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl FavoritesPersistence for MemoryFavorites {
    fn load(&self) -> Result<BTreeSet<ShowId>, PersistenceError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistenceError::ReadFailed {
                path: "memory://favorites".into(),
                source: simulated_io_error(),
            });
        }
        Ok(self.stored())
    }

    fn save(&self, ids: &BTreeSet<ShowId>) -> Result<(), PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::WriteFailed {
                path: "memory://favorites".into(),
                source: simulated_io_error(),
            });
        }
        *self.ids.lock().unwrap() = ids.clone();
        Ok(())
    }
}

/// In-memory credential store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentials {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl CredentialStore for MemoryCredentials {
    fn save(&self, key: &str, data: &[u8]) -> Result<(), PersistenceError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }
}

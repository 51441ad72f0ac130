//! Catalog store
//!
//! The store owns the shows known to the application, the favorites and the
//! pagination cursor. Screens share it through cheap clones of
//! [`CatalogStore`] and observe it through [`CatalogStore::subscribe`].
//!
//! Remote failures never reach the caller: a failed page ends pagination, a
//! failed favorite fetch is skipped and a failed search returns nothing.
//! Everything is logged.

mod state;

use crate::catalog::{
    CastMember, Person, PersonId, RemoteCatalog, ScoredShow, Season, Show, ShowId,
    group_into_seasons,
};
use crate::config::StoreConfig;
use crate::favorites::FavoritesPersistence;
use futures::stream::{self, StreamExt};
use state::CatalogState;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Change notification emitted by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A page load finished; `count` is zero when it failed or was empty
    PageLoaded { page: u32, count: usize },

    /// The favorite state of one show changed
    FavoriteToggled { id: ShowId, is_favorite: bool },

    /// Favorites reconciliation finished
    FavoritesReconciled { fetched: usize, failed: usize },
}

/// Outcome of [`CatalogStore::load_next_page`]
#[derive(Debug, Clone, PartialEq)]
pub enum PageLoad {
    /// The page was fetched and merged; an empty page ends pagination
    Loaded { page: u32, shows: Vec<Show> },

    /// The page fetch failed; pagination has ended
    Failed { page: u32 },

    /// Pagination ended earlier; the network was not contacted
    Exhausted,

    /// Another page load is in flight; this call was dropped
    InFlight,

    /// The store was shut down
    Cancelled,
}

impl PageLoad {
    /// Shows delivered by this load, empty unless [`PageLoad::Loaded`]
    pub fn shows(&self) -> &[Show] {
        match self {
            PageLoad::Loaded { shows, .. } => shows,
            _ => &[],
        }
    }
}

/// Result of [`CatalogStore::load_favorites`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Favorites fetched and cached, in completion order
    pub fetched: Vec<ShowId>,
    /// Favorites whose fetch failed
    pub failed: Vec<ShowId>,
    /// The store was shut down before reconciliation finished
    pub cancelled: bool,
}

/// Tuning knobs of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Upper bound of concurrent show fetches during reconciliation
    pub max_parallel_fetches: usize,
    /// Capacity of the event channel
    pub event_buffer: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreConfig::default().into()
    }
}

impl From<StoreConfig> for StoreOptions {
    fn from(config: StoreConfig) -> Self {
        Self {
            max_parallel_fetches: config.max_parallel_fetches.max(1),
            event_buffer: config.event_buffer.max(1),
        }
    }
}

struct StoreInner<C, P> {
    catalog: C,
    persistence: P,
    state: Mutex<CatalogState>,
    /// Held from a favorites change until its save finished
    save_lock: Mutex<()>,
    events: broadcast::Sender<StoreEvent>,
    shutdown: watch::Sender<bool>,
    options: StoreOptions,
}

/// Shared handle to the catalog and favorites
///
/// Cloning is cheap; all clones see the same state.
pub struct CatalogStore<C, P> {
    inner: Arc<StoreInner<C, P>>,
}

impl<C, P> Clone for CatalogStore<C, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Releases the page slot even if the load future is dropped midway
struct PageSlot<'a>(&'a Mutex<CatalogState>);

impl Drop for PageSlot<'_> {
    fn drop(&mut self) {
        lock_state(self.0).page_in_flight = false;
    }
}

/// Resolves once the store has been shut down
async fn shutdown_signal(mut shutdown: watch::Receiver<bool>) {
    loop {
        let stopped = *shutdown.borrow_and_update();
        if stopped {
            return;
        }
        if shutdown.changed().await.is_err() {
            // The sender lives as long as the store, so this never resolves
            std::future::pending::<()>().await;
        }
    }
}

fn lock_state(state: &Mutex<CatalogState>) -> MutexGuard<'_, CatalogState> {
    // State stays consistent between statements, so a poisoned lock is usable
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<C, P> CatalogStore<C, P>
where
    C: RemoteCatalog,
    P: FavoritesPersistence,
{
    /// Creates a store and loads the persisted favorites
    ///
    /// If the favorites cannot be read, the store starts without any and
    /// logs the error.
    pub fn new(catalog: C, persistence: P, options: StoreOptions) -> Self {
        let favorites = persistence.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load favorites, starting with none");
            BTreeSet::new()
        });
        debug!(count = favorites.len(), "Loaded favorites");

        let (events, _) = broadcast::channel(options.event_buffer.max(1));
        let (shutdown, _) = watch::channel(false);

        Self {
            inner: Arc::new(StoreInner {
                catalog,
                persistence,
                state: Mutex::new(CatalogState::new(favorites)),
                save_lock: Mutex::new(()),
                events,
                shutdown,
                options,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        lock_state(&self.inner.state)
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    /// Applies `change` to the favorites and saves the resulting set
    ///
    /// The save runs after the state lock is released. Saves are still
    /// written in mutation order because the save lock is taken first.
    /// Failures are logged and ignored.
    fn change_favorites<R>(&self, change: impl FnOnce(&mut CatalogState) -> R) -> R {
        let _saving = self
            .inner
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (result, snapshot) = {
            let mut state = self.state();
            let result = change(&mut state);
            (result, state.favorites().clone())
        };

        if let Err(e) = self.inner.persistence.save(&snapshot) {
            warn!(error = %e, "Failed to persist favorites");
        }
        result
    }

    /// Subscribes to store events
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of the cached shows, ascending by id
    pub fn cached_shows(&self) -> Vec<Show> {
        self.state().shows().to_vec()
    }

    /// A cached show by id
    pub fn show(&self, id: ShowId) -> Option<Show> {
        self.state().get(id).cloned()
    }

    /// Snapshot of the favorite ids
    pub fn favorite_ids(&self) -> BTreeSet<ShowId> {
        self.state().favorites().clone()
    }

    /// The page the next [`CatalogStore::load_next_page`] call will request
    pub fn next_page(&self) -> u32 {
        self.state().next_page
    }

    /// Whether pagination has ended
    pub fn is_exhausted(&self) -> bool {
        self.state().exhausted
    }

    /// Cancels in-flight page loads and stops applying remote results
    ///
    /// Loads started afterwards return [`PageLoad::Cancelled`].
    pub fn shutdown(&self) {
        self.state().closed = true;
        self.inner.shutdown.send_replace(true);
        debug!("Catalog store shut down");
    }

    /// Fetches the next page and merges it into the cached shows
    ///
    /// At most one page load runs at a time; a call made while one is in
    /// flight returns [`PageLoad::InFlight`] right away.
    pub async fn load_next_page(&self) -> PageLoad {
        let page = {
            let mut state = self.state();
            if state.closed {
                return PageLoad::Cancelled;
            }
            if state.exhausted {
                return PageLoad::Exhausted;
            }
            if state.page_in_flight {
                debug!(page = state.next_page, "Page load already in flight");
                return PageLoad::InFlight;
            }
            state.page_in_flight = true;
            state.next_page
        };
        let _slot = PageSlot(&self.inner.state);

        let result = tokio::select! {
            biased;
            _ = shutdown_signal(self.inner.shutdown.subscribe()) => return PageLoad::Cancelled,
            result = self.inner.catalog.fetch_page(page) => result,
        };

        match result {
            Ok(shows) => {
                {
                    let mut state = self.state();
                    if state.closed {
                        return PageLoad::Cancelled;
                    }
                    for show in &shows {
                        state.merge(show.clone());
                    }
                    state.exhausted = shows.is_empty();
                    state.next_page += 1;
                }

                if shows.is_empty() {
                    info!(page, "Reached the end of the show index");
                } else {
                    debug!(page, count = shows.len(), "Merged page of shows");
                }
                self.emit(StoreEvent::PageLoaded {
                    page,
                    count: shows.len(),
                });
                PageLoad::Loaded { page, shows }
            }
            Err(e) => {
                {
                    let mut state = self.state();
                    if state.closed {
                        return PageLoad::Cancelled;
                    }
                    state.exhausted = true;
                }

                warn!(page, error = %e, "Failed to load page, stopping pagination");
                self.emit(StoreEvent::PageLoaded { page, count: 0 });
                PageLoad::Failed { page }
            }
        }
    }

    /// Flips the favorite state of `show` and returns the new state
    ///
    /// A show that becomes a favorite is cached if it wasn't already.
    pub fn toggle_favorite(&self, show: &Show) -> bool {
        let is_favorite = self.change_favorites(|state| state.toggle_favorite(show));

        self.emit(StoreEvent::FavoriteToggled {
            id: show.id,
            is_favorite,
        });
        is_favorite
    }

    /// Marks `show` as favorite and caches it if it is unknown
    pub fn add_to_favorites(&self, show: &Show) {
        self.change_favorites(|state| state.add_favorite(show));

        self.emit(StoreEvent::FavoriteToggled {
            id: show.id,
            is_favorite: true,
        });
    }

    /// Removes `show` from the favorites; the cached show stays
    pub fn remove_from_favorites(&self, show: &Show) {
        self.change_favorites(|state| state.remove_favorite(show.id));

        self.emit(StoreEvent::FavoriteToggled {
            id: show.id,
            is_favorite: false,
        });
    }

    /// Whether `show` is a favorite
    pub fn is_favorite(&self, show: &Show) -> bool {
        self.state().is_favorite(show.id)
    }

    /// Fetches every favorite that is not cached yet
    ///
    /// Fetches run concurrently, bounded by
    /// [`StoreOptions::max_parallel_fetches`], and each result is applied as
    /// it arrives. A failed fetch only skips that show. After shutdown no
    /// fetch is started and pending ones are abandoned.
    pub async fn load_favorites(&self) -> Reconciliation {
        let mut report = Reconciliation::default();
        let missing = {
            let state = self.state();
            if state.closed {
                report.cancelled = true;
                return report;
            }
            state.missing_favorites()
        };

        if !missing.is_empty() {
            debug!(count = missing.len(), "Fetching uncached favorites");

            let catalog = &self.inner.catalog;
            let mut fetches = stream::iter(missing)
                .map(|id| async move { (id, catalog.fetch_show(id).await) })
                .buffer_unordered(self.inner.options.max_parallel_fetches.max(1));
            let stopped = shutdown_signal(self.inner.shutdown.subscribe());
            tokio::pin!(stopped);

            loop {
                let next = tokio::select! {
                    biased;
                    _ = &mut stopped => None,
                    next = fetches.next() => next.map(Some),
                };
                let Some(next) = next else {
                    report.cancelled = true;
                    break;
                };
                let Some((id, result)) = next else {
                    break;
                };

                match result {
                    Ok(show) => {
                        if self.apply_favorite_show(show) {
                            report.fetched.push(id);
                        } else {
                            report.cancelled = true;
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(show_id = id, error = %e, "Failed to fetch favorite show");
                        report.failed.push(id);
                    }
                }
            }
        }

        if report.cancelled {
            debug!(
                fetched = report.fetched.len(),
                "Favorites reconciliation cancelled by shutdown"
            );
        }

        self.emit(StoreEvent::FavoritesReconciled {
            fetched: report.fetched.len(),
            failed: report.failed.len(),
        });
        report
    }

    /// Returns whether the show was applied
    fn apply_favorite_show(&self, show: Show) -> bool {
        let mut state = self.state();
        if state.closed {
            return false;
        }
        state.insert_if_absent(show);
        true
    }

    /// Cached favorites ordered by name, ignoring case
    pub fn favorite_shows(&self) -> Vec<Show> {
        self.state().favorite_shows()
    }

    /// Searches the remote catalog
    ///
    /// Results are not cached. An empty query returns nothing without a
    /// request.
    pub async fn search_shows(&self, query: &str) -> Vec<ScoredShow> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        self.inner
            .catalog
            .search_shows(query)
            .await
            .unwrap_or_else(|e| {
                warn!(query, error = %e, "Show search failed");
                Vec::new()
            })
    }

    /// A show by id, from the cache or else from the remote catalog
    ///
    /// Remote lookups are not cached.
    pub async fn lookup_show(&self, id: ShowId) -> Option<Show> {
        if let Some(show) = self.show(id) {
            return Some(show);
        }

        match self.inner.catalog.fetch_show(id).await {
            Ok(show) => Some(show),
            Err(e) => {
                warn!(show_id = id, error = %e, "Failed to fetch show");
                None
            }
        }
    }

    /// Seasons of a show with their episodes
    pub async fn seasons(&self, show_id: ShowId) -> Vec<Season> {
        match self.inner.catalog.fetch_episodes(show_id).await {
            Ok(episodes) => group_into_seasons(episodes),
            Err(e) => {
                warn!(show_id, error = %e, "Failed to fetch episodes");
                Vec::new()
            }
        }
    }

    /// Main cast of a show
    pub async fn cast(&self, show_id: ShowId) -> Vec<CastMember> {
        self.inner
            .catalog
            .fetch_cast(show_id)
            .await
            .unwrap_or_else(|e| {
                warn!(show_id, error = %e, "Failed to fetch cast");
                Vec::new()
            })
    }

    /// Searches people, best match first
    ///
    /// An empty query returns nothing without a request.
    pub async fn search_people(&self, query: &str) -> Vec<Person> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.inner.catalog.search_people(query).await {
            Ok(mut results) => {
                results.sort_by(|a, b| b.score.total_cmp(&a.score));
                results.into_iter().map(|hit| hit.person).collect()
            }
            Err(e) => {
                warn!(query, error = %e, "People search failed");
                Vec::new()
            }
        }
    }

    /// Shows a person appeared in, once each, ordered by name
    pub async fn person_shows(&self, person_id: PersonId) -> Vec<Show> {
        let credits = match self.inner.catalog.fetch_cast_credits(person_id).await {
            Ok(credits) => credits,
            Err(e) => {
                warn!(person_id, error = %e, "Failed to fetch cast credits");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut shows: Vec<Show> = credits
            .into_iter()
            .filter(|show| seen.insert(show.id))
            .collect();
        shows.sort_by_cached_key(|show| show.name.to_lowercase());
        shows
    }
}

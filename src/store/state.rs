//! In-memory catalog state
//!
//! All mutation of cached shows and favorites goes through [`CatalogState`].
//! The store keeps it behind a single lock so every change is applied one at
//! a time.

use crate::catalog::{Show, ShowId};
use std::collections::BTreeSet;

#[derive(Debug)]
pub(super) struct CatalogState {
    /// Known shows, strictly ascending by id
    shows: Vec<Show>,
    favorites: BTreeSet<ShowId>,
    /// Next page to request, starting at 1
    pub next_page: u32,
    pub exhausted: bool,
    pub page_in_flight: bool,
    /// Set on shutdown; no results are applied afterwards
    pub closed: bool,
}

impl CatalogState {
    pub fn new(favorites: BTreeSet<ShowId>) -> Self {
        Self {
            shows: Vec::new(),
            favorites,
            next_page: 1,
            exhausted: false,
            page_in_flight: false,
            closed: false,
        }
    }

    pub fn shows(&self) -> &[Show] {
        &self.shows
    }

    pub fn favorites(&self) -> &BTreeSet<ShowId> {
        &self.favorites
    }

    /// Binary search for `id`: `Ok` with its index, or `Err` with the index
    /// that keeps the order when inserting it.
    fn position(&self, id: ShowId) -> Result<usize, usize> {
        self.shows.binary_search_by_key(&id, |show| show.id)
    }

    pub fn get(&self, id: ShowId) -> Option<&Show> {
        self.position(id).ok().map(|index| &self.shows[index])
    }

    pub fn contains(&self, id: ShowId) -> bool {
        self.position(id).is_ok()
    }

    /// Inserts `show`, or replaces the cached show with the same id.
    pub fn merge(&mut self, show: Show) {
        match self.position(show.id) {
            Ok(index) => self.shows[index] = show,
            Err(index) => self.shows.insert(index, show),
        }
    }

    /// Inserts `show` unless a show with the same id is cached already.
    ///
    /// Returns whether it was inserted.
    pub fn insert_if_absent(&mut self, show: Show) -> bool {
        match self.position(show.id) {
            Ok(_) => false,
            Err(index) => {
                self.shows.insert(index, show);
                true
            }
        }
    }

    pub fn is_favorite(&self, id: ShowId) -> bool {
        self.favorites.contains(&id)
    }

    /// Marks `show` as favorite and caches it if it is unknown.
    ///
    /// Returns whether the favorites changed.
    pub fn add_favorite(&mut self, show: &Show) -> bool {
        let added = self.favorites.insert(show.id);
        if !self.contains(show.id) {
            self.insert_if_absent(show.clone());
        }
        added
    }

    /// Returns whether the favorites changed.
    pub fn remove_favorite(&mut self, id: ShowId) -> bool {
        self.favorites.remove(&id)
    }

    /// Flips the favorite state of `show` and returns the new state.
    pub fn toggle_favorite(&mut self, show: &Show) -> bool {
        if self.is_favorite(show.id) {
            self.remove_favorite(show.id);
            false
        } else {
            self.add_favorite(show);
            true
        }
    }

    /// Favorite ids without a cached show, ascending.
    pub fn missing_favorites(&self) -> Vec<ShowId> {
        self.favorites
            .iter()
            .copied()
            .filter(|id| !self.contains(*id))
            .collect()
    }

    /// Cached favorites ordered by name, ignoring case.
    pub fn favorite_shows(&self) -> Vec<Show> {
        let mut favorites: Vec<Show> = self
            .shows
            .iter()
            .filter(|show| self.favorites.contains(&show.id))
            .cloned()
            .collect();
        favorites.sort_by_cached_key(|show| show.name.to_lowercase());
        favorites
    }
}

//! Favorites persistence
//!
//! The store keeps favorites in memory and hands every new set to a
//! [`FavoritesPersistence`] implementation so it survives restarts.

use crate::catalog::ShowId;
use crate::storage::{JsonDocument, PersistenceError};
use std::collections::BTreeSet;
use std::path::Path;

/// Durable storage of the favorite show ids
pub trait FavoritesPersistence: Send + Sync {
    /// Loads the stored favorites, empty if none were saved yet
    fn load(&self) -> Result<BTreeSet<ShowId>, PersistenceError>;

    /// Replaces the stored favorites
    fn save(&self, ids: &BTreeSet<ShowId>) -> Result<(), PersistenceError>;
}

/// Favorites stored as a JSON array in `favorites.json`
pub struct FavoritesFile {
    document: JsonDocument<Vec<ShowId>>,
}

impl FavoritesFile {
    /// Opens the favorites file inside the given data directory
    pub fn open(data_dir: &Path) -> Result<Self, PersistenceError> {
        Ok(Self {
            document: JsonDocument::open(data_dir, "favorites")?,
        })
    }

    /// Returns the path of the favorites file
    pub fn path(&self) -> &Path {
        self.document.path()
    }
}

impl FavoritesPersistence for FavoritesFile {
    fn load(&self) -> Result<BTreeSet<ShowId>, PersistenceError> {
        Ok(self
            .document
            .load()?
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default())
    }

    fn save(&self, ids: &BTreeSet<ShowId>) -> Result<(), PersistenceError> {
        let ids: Vec<ShowId> = ids.iter().copied().collect();
        self.document.store(&ids)
    }
}

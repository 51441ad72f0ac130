//! showshelf - Browse the TVMaze show catalog and keep a favorites shelf
//!
//! This library provides the catalog store that pages through the remote
//! show index, keeps favorites across restarts and reconciles the two, plus
//! the preferences and PIN lock around it.

mod catalog;
mod config;
mod favorites;
mod lock;
mod preferences;
mod storage;
mod store;
mod temp;

#[cfg(test)]
mod testing;

// Re-export the public surface
pub use catalog::{
    CastMember, CatalogError, Episode, Image, Person, PersonId, RemoteCatalog, Schedule,
    ScoredPerson, ScoredShow, Season, Show, ShowId, TvMazeCatalog, group_into_seasons,
};
pub use config::{
    ApiConfig, Config, ConfigError, StorageConfig, StoreConfig, default_config_path, load_config,
    load_config_from_str, validate_config,
};
pub use favorites::{FavoritesFile, FavoritesPersistence};
pub use lock::{CredentialStore, FileCredentialStore, LockError, PIN_LENGTH, PinLock};
pub use preferences::{Preferences, PreferencesStore, Theme};
pub use storage::{PersistenceError, default_data_dir};
pub use store::{CatalogStore, PageLoad, Reconciliation, StoreEvent, StoreOptions};

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Top-level error type for showshelf operations
#[derive(Debug, Error)]
pub enum ShowShelfError {
    /// Error while loading or validating configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error while setting up the remote catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error while reading or writing local data
    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Error from the PIN lock
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),
}

/// The store as wired up against TVMaze and the local data directory
pub type ShelfStore = CatalogStore<TvMazeCatalog, FavoritesFile>;

/// Application root owning the store, the preferences and the PIN lock
///
/// Build one per process and hand out clones of [`ShowShelf::store`] to
/// whatever needs the catalog.
pub struct ShowShelf {
    pub store: ShelfStore,
    pub preferences: PreferencesStore,
    pub lock: PinLock<FileCredentialStore>,
    data_dir: PathBuf,
}

impl ShowShelf {
    /// Wires up all components from the configuration
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use showshelf::{ShowShelf, load_config};
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = load_config(None)?;
    /// let shelf = ShowShelf::open(&config)?;
    ///
    /// let page = shelf.store.load_next_page().await;
    /// for show in page.shows() {
    ///     println!("{} {}", show.id, show.name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(config: &Config) -> Result<Self, ShowShelfError> {
        validate_config(config)?;

        let data_dir = match &config.storage.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        debug!(data_dir = %data_dir.display(), "Opening showshelf data");

        let catalog = TvMazeCatalog::new(&config.api)?;
        let favorites = FavoritesFile::open(&data_dir)?;
        let store = CatalogStore::new(catalog, favorites, config.store.clone().into());

        let preferences = PreferencesStore::open(&data_dir)?;
        let credentials = FileCredentialStore::open(&data_dir)?;
        let lock = PinLock::new(credentials, preferences.clone());

        Ok(Self {
            store,
            preferences,
            lock,
            data_dir,
        })
    }

    /// Directory holding favorites, preferences and credentials
    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }
}

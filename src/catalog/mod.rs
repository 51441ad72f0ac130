//! Remote catalog access.
//!
//! This module provides the show, episode and people structures, the
//! [`RemoteCatalog`] trait the store fetches through, and the TVMaze
//! implementation of that trait.
mod tvmaze;
mod tvmaze_types;
mod types;

pub use tvmaze::TvMazeCatalog;
pub use types::{
    CastMember, Episode, Image, Person, PersonId, Schedule, ScoredPerson, ScoredShow, Season,
    Show, ShowId, group_into_seasons,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network failure, timeout or a non-success HTTP status
    #[error("Request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Failed to decode API response: {0}")]
    Decode(String),

    /// The requested resource does not exist (any longer)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Trait for remote catalogs that serve shows, episodes and people.
///
/// Implementations are shared between tasks, so they must be `Send + Sync`.
/// They report failures as [`CatalogError`]; the store decides how to
/// degrade.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Fetches one page of the show index.
    ///
    /// Pages are numbered from 1. A page past the end yields an empty list.
    async fn fetch_page(&self, page: u32) -> Result<Vec<Show>, CatalogError>;

    /// Fetches a single show by id.
    async fn fetch_show(&self, id: ShowId) -> Result<Show, CatalogError>;

    /// Searches shows by free text, best match first.
    async fn search_shows(&self, query: &str) -> Result<Vec<ScoredShow>, CatalogError>;

    /// Fetches all regular episodes of a show.
    async fn fetch_episodes(&self, show_id: ShowId) -> Result<Vec<Episode>, CatalogError>;

    /// Fetches the main cast of a show.
    async fn fetch_cast(&self, show_id: ShowId) -> Result<Vec<CastMember>, CatalogError>;

    /// Searches people by free text, best match first.
    async fn search_people(&self, query: &str) -> Result<Vec<ScoredPerson>, CatalogError>;

    /// Fetches the shows a person has appeared in.
    ///
    /// The list may contain the same show more than once.
    async fn fetch_cast_credits(&self, person_id: PersonId) -> Result<Vec<Show>, CatalogError>;
}

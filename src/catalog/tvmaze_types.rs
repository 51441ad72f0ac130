/// TVMaze API response wrappers for deserialization.
///
/// Shows, episodes and people decode straight into the catalog types; these
/// structures only cover the envelopes around them.
use super::types::{Person, Show};
use serde::Deserialize;

/// A single entry of `/shows/{id}/cast`.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeCastEntry {
    pub person: Person,
    pub character: TvMazeCharacter,
}

/// The character part of a cast entry.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeCharacter {
    pub name: String,
}

/// A single entry of `/people/{id}/castcredits?embed=show`.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeCastCredit {
    /// Embedded resources when requested with ?embed=show
    #[serde(rename = "_embedded")]
    pub embedded: TvMazeEmbeddedShow,
}

/// Embedded show of a cast credit.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEmbeddedShow {
    pub show: Show,
}

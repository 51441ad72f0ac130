//! Catalog entities shared by the store, the TVMaze client and the CLI.
//!
//! The structures deserialize directly from TVMaze JSON. Optional fields
//! default to `None` so partial payloads still decode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Stable remote identifier of a show.
pub type ShowId = u32;

/// Stable remote identifier of a person.
pub type PersonId = u32;

/// Poster artwork in two resolutions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub medium: String,
    #[serde(default)]
    pub original: String,
}

/// Weekly airing slot of a show.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub days: Vec<String>,
    #[serde(default)]
    pub time: String,
}

impl Schedule {
    /// Formats the schedule for display, e.g. `Monday, Tuesday at 21:00`.
    ///
    /// Returns `None` when neither days nor time are known.
    pub fn display(&self) -> Option<String> {
        match (self.days.is_empty(), self.time.is_empty()) {
            (true, true) => None,
            (false, true) => Some(self.days.join(", ")),
            (true, false) => Some(format!("at {}", self.time)),
            (false, false) => Some(format!("{} at {}", self.days.join(", "), self.time)),
        }
    }
}

/// A catalog entry for a TV series.
///
/// Two shows are equal when their ids match, regardless of the other fields.
/// This lets a refreshed payload replace a stale copy of the same show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    /// HTML fragment as delivered by the API
    #[serde(default)]
    pub summary: Option<String>,
}

impl Show {
    /// Creates a show with only an id and a name set.
    pub fn new(id: ShowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            url: String::new(),
            image: None,
            genres: None,
            schedule: None,
            summary: None,
        }
    }

    /// The summary converted from HTML to plain text.
    pub fn summary_text(&self) -> Option<String> {
        self.summary.as_deref().map(html_to_text)
    }
}

impl PartialEq for Show {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Show {}

impl Hash for Show {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A search hit together with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredShow {
    pub score: f64,
    pub show: Show,
}

/// A single installment of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: u32,
    pub name: String,
    pub season: u32,
    /// Position within the season (null for some specials)
    #[serde(default)]
    pub number: Option<u32>,
    /// ISO date, e.g. `2013-06-24`
    #[serde(default)]
    pub airdate: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
    /// Runtime in minutes
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Episode {
    /// The summary converted from HTML to plain text.
    pub fn summary_text(&self) -> Option<String> {
        self.summary.as_deref().map(html_to_text)
    }
}

/// Episodes of one season, ordered by episode number.
#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    pub number: u32,
    pub episodes: Vec<Episode>,
}

/// Groups episodes into seasons.
///
/// Seasons come back in ascending order and episodes are sorted by number
/// within each season. Season 0 (specials) is dropped.
pub fn group_into_seasons(episodes: Vec<Episode>) -> Vec<Season> {
    let mut seasons: BTreeMap<u32, Vec<Episode>> = BTreeMap::new();

    for episode in episodes.into_iter().filter(|e| e.season > 0) {
        seasons.entry(episode.season).or_default().push(episode);
    }

    seasons
        .into_iter()
        .map(|(number, mut episodes)| {
            // Unnumbered episodes go last
            episodes.sort_by_key(|e| e.number.unwrap_or(u32::MAX));
            Season { number, episodes }
        })
        .collect()
}

/// A cast or crew member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub image: Option<Image>,
}

/// A search hit for a person together with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPerson {
    pub score: f64,
    pub person: Person,
}

/// A person appearing in a show, with the character they play.
#[derive(Debug, Clone, PartialEq)]
pub struct CastMember {
    pub person: Person,
    pub character: String,
}

fn html_to_text(html: &str) -> String {
    nanohtml2text::html2text(html).trim().to_string()
}

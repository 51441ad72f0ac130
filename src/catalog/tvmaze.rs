//! TVMaze catalog implementation.
use super::tvmaze_types::{TvMazeCastCredit, TvMazeCastEntry};
use super::{
    CastMember, CatalogError, Episode, PersonId, RemoteCatalog, ScoredPerson, ScoredShow, Show,
    ShowId,
};
use crate::config::ApiConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Remote catalog backed by the public TVMaze API.
///
/// This catalog talks to https://api.tvmaze.com (or the configured base URL).
/// The API needs no key; the HTTP client timeout bounds every request.
#[derive(Debug, Clone)]
pub struct TvMazeCatalog {
    client: Client,
    base_url: String,
}

impl TvMazeCatalog {
    /// Creates a new TVMaze catalog from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds the absolute URL for an API path.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issues a GET request and decodes the JSON body.
    ///
    /// HTTP 404 maps to [`CatalogError::NotFound`], any other non-success
    /// status to [`CatalogError::Transport`].
    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(url = %url, ?query, "TVMaze request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url));
        }

        if !status.is_success() {
            return Err(CatalogError::Transport(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

/// Maps a 1-based page number to the 0-based TVMaze index page.
fn index_page(page: u32) -> u32 {
    page.saturating_sub(1)
}

#[async_trait]
impl RemoteCatalog for TvMazeCatalog {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Show>, CatalogError> {
        match self
            .get_json("shows", &[("page", index_page(page).to_string())])
            .await
        {
            // TVMaze answers 404 once the index runs out
            Err(CatalogError::NotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn fetch_show(&self, id: ShowId) -> Result<Show, CatalogError> {
        self.get_json(&format!("shows/{id}"), &[]).await
    }

    async fn search_shows(&self, query: &str) -> Result<Vec<ScoredShow>, CatalogError> {
        self.get_json("search/shows", &[("q", query.to_string())])
            .await
    }

    async fn fetch_episodes(&self, show_id: ShowId) -> Result<Vec<Episode>, CatalogError> {
        self.get_json(&format!("shows/{show_id}/episodes"), &[])
            .await
    }

    async fn fetch_cast(&self, show_id: ShowId) -> Result<Vec<CastMember>, CatalogError> {
        let entries: Vec<TvMazeCastEntry> =
            self.get_json(&format!("shows/{show_id}/cast"), &[]).await?;

        Ok(entries
            .into_iter()
            .map(|entry| CastMember {
                person: entry.person,
                character: entry.character.name,
            })
            .collect())
    }

    async fn search_people(&self, query: &str) -> Result<Vec<ScoredPerson>, CatalogError> {
        self.get_json("search/people", &[("q", query.to_string())])
            .await
    }

    async fn fetch_cast_credits(&self, person_id: PersonId) -> Result<Vec<Show>, CatalogError> {
        let credits: Vec<TvMazeCastCredit> = self
            .get_json(
                &format!("people/{person_id}/castcredits"),
                &[("embed", "show".to_string())],
            )
            .await?;

        Ok(credits
            .into_iter()
            .map(|credit| credit.embedded.show)
            .collect())
    }
}

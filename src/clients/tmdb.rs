use std::collections::HashMap;

use chrono::NaiveDate;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::models::configuration::ConfigurationDetails;
use crate::models::show::{EpisodeStub, Genre, ProviderOffers, SeasonStub};

use super::CatalogClient;

pub const TMDB_API_BASE: &str = "https://api.themoviedb.org";

/// Concurrent in-flight requests while sweeping the changed-ids feed.
const CHANGED_PAGE_CONCURRENCY: usize = 4;

/// A failed round trip to the catalog: either the transport gave up or the
/// service answered with a non-success status. The upstream status and body
/// are preserved for the caller.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog responded {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowDetails {
    pub id: i64,
    pub name: String,
    pub overview: Option<String>,
    pub backdrop_path: Option<String>,
    pub poster_path: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub number_of_episodes: Option<i32>,
    pub number_of_seasons: Option<i32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub seasons: Vec<SeasonStub>,
    pub last_episode_to_air: Option<EpisodeStub>,
    pub next_episode_to_air: Option<EpisodeStub>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    /// Only present when the watch/providers sub-resource was requested via
    /// `append_to_response`. The remote key contains a slash; it is exposed
    /// under a normalized name.
    #[serde(rename = "watch/providers")]
    pub watch_providers: Option<WatchProviders>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchProviders {
    #[serde(default)]
    pub results: HashMap<String, ProviderOffers>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowSummary {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<String>,
    /// Human-readable form of `first_air_date`, filled in client-side.
    #[serde(default)]
    pub display_air_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub origin_country: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChangedShow {
    pub id: i64,
    #[serde(default)]
    pub adult: Option<bool>,
}

/// Options for `search_shows`. Absent fields are omitted from the request.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub page: Option<u32>,
    pub language: Option<String>,
    pub include_adult: Option<bool>,
    pub first_air_date_year: Option<i32>,
}

/// Date window and page for the changed-ids feed. With both dates absent the
/// server applies its default window of the last 24 hours.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeWindow {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
}

/// Aggregate result of a full changed-ids sweep. Returning the value is the
/// completion signal; pages that failed are listed rather than retried.
#[derive(Debug, Clone, Default)]
pub struct ChangedIdSweep {
    pub changed: Vec<ChangedShow>,
    pub total_pages: u32,
    pub failed_pages: Vec<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestTokenInfo {
    pub success: bool,
    pub request_token: String,
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenInfo {
    pub success: bool,
    pub access_token: String,
    pub account_id: Option<String>,
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub success: bool,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDetails {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
    #[serde(default)]
    pub results: Vec<ListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub id: i64,
    pub media_type: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
}

/// Typed wrapper over the TMDB HTTP API. Authenticates every request with
/// the bearer credential fixed at construction; holds no other state.
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(TMDB_API_BASE, api_key)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Primary information about a tv show.
    pub async fn show_details(
        &self,
        id: i64,
        language: Option<&str>,
    ) -> Result<ShowDetails, RemoteError> {
        let mut query = Vec::new();
        push_opt(&mut query, "language", language.map(str::to_string));
        self.get(&format!("/3/tv/{id}"), &query).await
    }

    /// Show details with the watch-providers sub-resource embedded in the
    /// same round trip.
    pub async fn show_details_with_watch_providers(
        &self,
        id: i64,
        language: Option<&str>,
    ) -> Result<ShowDetails, RemoteError> {
        let mut query = vec![("append_to_response", "watch/providers".to_string())];
        push_opt(&mut query, "language", language.map(str::to_string));
        self.get(&format!("/3/tv/{id}"), &query).await
    }

    /// Search for tv shows. Each result's raw air date is reformatted into a
    /// display string; a date that fails to parse is logged and left without
    /// one, never failing the search.
    pub async fn search_shows(
        &self,
        query_text: &str,
        options: &SearchOptions,
    ) -> Result<Page<ShowSummary>, RemoteError> {
        let mut query = vec![("query", query_text.to_string())];
        push_opt(&mut query, "page", options.page.map(|p| p.to_string()));
        push_opt(&mut query, "language", options.language.clone());
        push_opt(
            &mut query,
            "include_adult",
            options.include_adult.map(|a| a.to_string()),
        );
        push_opt(
            &mut query,
            "first_air_date_year",
            options.first_air_date_year.map(|y| y.to_string()),
        );

        let mut page: Page<ShowSummary> = self.get("/3/search/tv", &query).await?;
        for result in &mut page.results {
            result.display_air_date = result
                .first_air_date
                .as_deref()
                .and_then(|raw| format_air_date(raw, result.id));
        }
        Ok(page)
    }

    /// One page of the changed-ids feed.
    pub async fn changed_show_ids(
        &self,
        window: &ChangeWindow,
    ) -> Result<Page<ChangedShow>, RemoteError> {
        let mut query = Vec::new();
        push_opt(
            &mut query,
            "start_date",
            window.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
        );
        push_opt(
            &mut query,
            "end_date",
            window.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
        );
        push_opt(&mut query, "page", window.page.map(|p| p.to_string()));
        self.get("/3/tv/changes", &query).await
    }

    /// Sweeps every page of the changed-ids feed: page one first to learn
    /// the page count, the rest concurrently in unspecified order. Failed
    /// pages are recorded in the result, not retried.
    pub async fn all_changed_show_ids(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<ChangedIdSweep, RemoteError> {
        let first = self
            .changed_show_ids(&ChangeWindow {
                start_date,
                end_date,
                page: Some(1),
            })
            .await?;

        let total_pages = first.total_pages.max(1);
        let mut sweep = ChangedIdSweep {
            changed: first.results,
            total_pages,
            failed_pages: Vec::new(),
        };

        if total_pages <= 1 {
            return Ok(sweep);
        }

        let mut pages = futures::stream::iter(2..=total_pages)
            .map(|page_number| async move {
                let window = ChangeWindow {
                    start_date,
                    end_date,
                    page: Some(page_number),
                };
                (page_number, self.changed_show_ids(&window).await)
            })
            .buffer_unordered(CHANGED_PAGE_CONCURRENCY);

        while let Some((page_number, result)) = pages.next().await {
            match result {
                Ok(batch) => sweep.changed.extend(batch.results),
                Err(e) => {
                    warn!("changed-ids feed page {} failed: {}", page_number, e);
                    sweep.failed_pages.push(page_number);
                }
            }
        }

        sweep.failed_pages.sort_unstable();
        Ok(sweep)
    }

    /// System-wide configuration: image base URLs, size classes, change keys.
    pub async fn configuration(&self) -> Result<ConfigurationDetails, RemoteError> {
        self.get("/3/configuration", &[]).await
    }

    /// A user's list by id. Private lists are only visible to their owner.
    pub async fn get_list(
        &self,
        list_id: i64,
        page: Option<u32>,
    ) -> Result<ListDetails, RemoteError> {
        let mut query = Vec::new();
        push_opt(&mut query, "page", page.map(|p| p.to_string()));
        self.get(&format!("/4/list/{list_id}"), &query).await
    }

    /// First step of the user authorization flow. The returned token must be
    /// approved by the user before it can be exchanged for an access token.
    pub async fn create_request_token(
        &self,
        redirect_to: Option<&str>,
    ) -> Result<RequestTokenInfo, RemoteError> {
        let mut body = serde_json::Map::new();
        if let Some(url) = redirect_to {
            body.insert("redirect_to".to_string(), url.into());
        }
        self.post("/4/auth/request_token", &[], Some(&body)).await
    }

    /// Exchanges an approved request token for a user access token.
    pub async fn create_access_token(
        &self,
        request_token: &str,
    ) -> Result<AccessTokenInfo, RemoteError> {
        self.post::<_, ()>(
            "/4/auth/access_token",
            &[("request_token", request_token.to_string())],
            None,
        )
        .await
    }

    /// Converts an access token into a session, the final authorization step.
    pub async fn create_session(&self, access_token: &str) -> Result<SessionInfo, RemoteError> {
        self.post::<_, ()>(
            "/3/authentication/session/convert/4",
            &[("access_token", access_token.to_string())],
            None,
        )
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, RemoteError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::parse(request.send().await?).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl CatalogClient for TmdbClient {
    async fn show_details_with_watch_providers(
        &self,
        id: i64,
        language: Option<&str>,
    ) -> Result<ShowDetails, RemoteError> {
        Self::show_details_with_watch_providers(self, id, language).await
    }

    async fn all_changed_show_ids(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<ChangedIdSweep, RemoteError> {
        Self::all_changed_show_ids(self, start_date, end_date).await
    }

    async fn configuration(&self) -> Result<ConfigurationDetails, RemoteError> {
        Self::configuration(self).await
    }
}

fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<String>) {
    if let Some(value) = value {
        query.push((key, value));
    }
}

/// "2008-01-20" becomes "January 20, 2008". Unparseable input is logged and
/// dropped; the raw date stays available on the summary.
fn format_air_date(raw: &str, show_id: i64) -> Option<String> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date.format("%B %-d, %Y").to_string()),
        Err(e) => {
            warn!("show {}: unparseable air date {:?}: {}", show_id, raw, e);
            None
        }
    }
}

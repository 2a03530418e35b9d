use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A mirrored catalog record: one TV show as last fetched from the remote
/// catalog. Field names follow the remote API so the same types deserialize
/// wire payloads and the JSON columns of the mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub name: String,
    pub overview: Option<String>,
    pub backdrop_path: Option<String>,
    pub poster_path: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub episode_count: Option<i32>,
    pub season_count: Option<i32>,
    pub genres: Vec<Genre>,
    pub seasons: Vec<SeasonStub>,
    pub last_episode_aired: Option<EpisodeStub>,
    pub next_episode_to_air: Option<EpisodeStub>,
    /// Region code ("US", "GB", ...) to the offers available there.
    pub watch_providers: HashMap<String, ProviderOffers>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub fetched_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStub {
    pub id: i64,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub episode_count: Option<i32>,
    pub poster_path: Option<String>,
    pub season_number: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStub {
    pub id: i64,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub air_date: Option<String>,
    pub episode_number: Option<i32>,
    pub season_number: Option<i32>,
    pub still_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderOffers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatrate: Option<Vec<ProviderRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent: Option<Vec<ProviderRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy: Option<Vec<ProviderRef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub display_priority: Option<i32>,
    pub logo_path: Option<String>,
    pub provider_id: i64,
    pub provider_name: String,
}

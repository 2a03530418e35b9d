use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shows")]
pub struct Model {
    /// TMDB show id. Assigned by the remote catalog, never generated locally.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub name: String,
    pub overview: Option<String>,
    pub backdrop_path: Option<String>,
    pub poster_path: Option<String>,
    pub first_air_date: Option<String>,
    pub last_air_date: Option<String>,
    pub episode_count: Option<i32>,
    pub season_count: Option<i32>,
    /// JSON array of `{id, name}` genre pairs.
    pub genres: Option<String>,
    /// JSON array of season stubs.
    pub seasons: Option<String>,
    /// JSON episode stub.
    pub last_episode_aired: Option<String>,
    /// JSON episode stub.
    pub next_episode_to_air: Option<String>,
    /// JSON map of region code to provider offers.
    pub watch_providers: Option<String>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub fetched_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

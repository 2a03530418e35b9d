use std::collections::HashSet;

use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, Set,
};
use tracing::debug;

use crate::entities::{prelude::*, show};
use crate::models::show::Show;

/// Keyed cache of catalog records, written only by the sync engine.
pub struct ShowRepository {
    conn: DatabaseConnection,
}

impl ShowRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model_to_show(model: show::Model) -> Show {
        Show {
            id: model.id,
            name: model.name,
            overview: model.overview,
            backdrop_path: model.backdrop_path,
            poster_path: model.poster_path,
            first_air_date: model.first_air_date,
            last_air_date: model.last_air_date,
            episode_count: model.episode_count,
            season_count: model.season_count,
            genres: model
                .genres
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            seasons: model
                .seasons
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            last_episode_aired: model
                .last_episode_aired
                .and_then(|s| serde_json::from_str(&s).ok()),
            next_episode_to_air: model
                .next_episode_to_air
                .and_then(|s| serde_json::from_str(&s).ok()),
            watch_providers: model
                .watch_providers
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            status: model.status,
            tagline: model.tagline,
            popularity: model.popularity,
            vote_average: model.vote_average,
            vote_count: model.vote_count,
            fetched_at: model.fetched_at,
        }
    }

    /// Inserts or fully replaces the record for the show's id. Idempotent;
    /// returns the stored record.
    pub async fn upsert(&self, show: &Show) -> Result<Show> {
        let active_model = show::ActiveModel {
            id: Set(show.id),
            name: Set(show.name.clone()),
            overview: Set(show.overview.clone()),
            backdrop_path: Set(show.backdrop_path.clone()),
            poster_path: Set(show.poster_path.clone()),
            first_air_date: Set(show.first_air_date.clone()),
            last_air_date: Set(show.last_air_date.clone()),
            episode_count: Set(show.episode_count),
            season_count: Set(show.season_count),
            genres: Set(serde_json::to_string(&show.genres).ok()),
            seasons: Set(serde_json::to_string(&show.seasons).ok()),
            last_episode_aired: Set(show
                .last_episode_aired
                .as_ref()
                .and_then(|e| serde_json::to_string(e).ok())),
            next_episode_to_air: Set(show
                .next_episode_to_air
                .as_ref()
                .and_then(|e| serde_json::to_string(e).ok())),
            watch_providers: Set(serde_json::to_string(&show.watch_providers).ok()),
            status: Set(show.status.clone()),
            tagline: Set(show.tagline.clone()),
            popularity: Set(show.popularity),
            vote_average: Set(show.vote_average),
            vote_count: Set(show.vote_count),
            fetched_at: Set(show.fetched_at.clone()),
        };

        Shows::insert(active_model)
            .on_conflict(
                OnConflict::column(show::Column::Id)
                    .update_columns([
                        show::Column::Name,
                        show::Column::Overview,
                        show::Column::BackdropPath,
                        show::Column::PosterPath,
                        show::Column::FirstAirDate,
                        show::Column::LastAirDate,
                        show::Column::EpisodeCount,
                        show::Column::SeasonCount,
                        show::Column::Genres,
                        show::Column::Seasons,
                        show::Column::LastEpisodeAired,
                        show::Column::NextEpisodeToAir,
                        show::Column::WatchProviders,
                        show::Column::Status,
                        show::Column::Tagline,
                        show::Column::Popularity,
                        show::Column::VoteAverage,
                        show::Column::VoteCount,
                        show::Column::FetchedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        debug!("Mirrored show {} ({})", show.id, show.name);
        Ok(show.clone())
    }

    /// Returns the subset of `ids` present in the mirror; missing ids are
    /// silently omitted.
    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Show>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Shows::find()
            .filter(show::Column::Id.is_in(ids.to_vec()))
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model_to_show).collect())
    }

    /// Removes the record; Ok(false) when it was not present.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let result = Shows::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Full id scan for the refresh sweep. Intentionally infrequent.
    pub async fn all_ids(&self) -> Result<HashSet<i64>> {
        let ids: Vec<i64> = Shows::find()
            .select_only()
            .column(show::Column::Id)
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(ids.into_iter().collect())
    }
}

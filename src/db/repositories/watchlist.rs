use anyhow::Result;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{prelude::*, watchlist_entry};
use crate::models::user::WatchlistEntry;

/// Per-user watchlist entries. The `(user_id, show_id)` unique index makes
/// the conditional insert race-free.
pub struct WatchlistRepository {
    conn: DatabaseConnection,
}

impl WatchlistRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model_to_entry(model: watchlist_entry::Model) -> WatchlistEntry {
        WatchlistEntry {
            show_id: model.show_id,
            watched: model.watched,
            favorite: model.favorite,
            rating: model.rating,
            added_at: model.added_at,
        }
    }

    /// Conditional insert: Ok(true) when a new entry was appended, Ok(false)
    /// when the user already had the show (a no-op, not an error).
    pub async fn add_entry(&self, user_id: i32, show_id: i64) -> Result<bool> {
        let active_model = watchlist_entry::ActiveModel {
            user_id: Set(user_id),
            show_id: Set(show_id),
            watched: Set(false),
            favorite: Set(false),
            rating: Set(None),
            added_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let result = WatchlistEntries::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    watchlist_entry::Column::UserId,
                    watchlist_entry::Column::ShowId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec(&self.conn)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the matching entry; Ok(false) when it was absent.
    pub async fn remove_entry(&self, user_id: i32, show_id: i64) -> Result<bool> {
        let result = WatchlistEntries::delete_many()
            .filter(watchlist_entry::Column::UserId.eq(user_id))
            .filter(watchlist_entry::Column::ShowId.eq(show_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Ok(false) means zero rows matched; the caller decides whether that is
    /// a not-found condition.
    pub async fn set_watched(&self, user_id: i32, show_id: i64, value: bool) -> Result<bool> {
        self.set_flag(user_id, show_id, watchlist_entry::Column::Watched, value)
            .await
    }

    pub async fn set_favorite(&self, user_id: i32, show_id: i64, value: bool) -> Result<bool> {
        self.set_flag(user_id, show_id, watchlist_entry::Column::Favorite, value)
            .await
    }

    pub async fn set_rating(
        &self,
        user_id: i32,
        show_id: i64,
        rating: Option<&str>,
    ) -> Result<bool> {
        let result = WatchlistEntries::update_many()
            .col_expr(
                watchlist_entry::Column::Rating,
                Expr::value(rating.map(str::to_string)),
            )
            .filter(watchlist_entry::Column::UserId.eq(user_id))
            .filter(watchlist_entry::Column::ShowId.eq(show_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn entries_for_user(&self, user_id: i32) -> Result<Vec<WatchlistEntry>> {
        let rows = WatchlistEntries::find()
            .filter(watchlist_entry::Column::UserId.eq(user_id))
            .order_by_asc(watchlist_entry::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model_to_entry).collect())
    }

    /// Users other than `excluding_user_id` that still reference the show.
    /// Drives the reference-counted mirror cleanup.
    pub async fn other_owners(&self, show_id: i64, excluding_user_id: i32) -> Result<Vec<i32>> {
        let ids: Vec<i32> = WatchlistEntries::find()
            .select_only()
            .column(watchlist_entry::Column::UserId)
            .filter(watchlist_entry::Column::ShowId.eq(show_id))
            .filter(watchlist_entry::Column::UserId.ne(excluding_user_id))
            .into_tuple()
            .all(&self.conn)
            .await?;

        Ok(ids)
    }

    async fn set_flag(
        &self,
        user_id: i32,
        show_id: i64,
        column: watchlist_entry::Column,
        value: bool,
    ) -> Result<bool> {
        let result = WatchlistEntries::update_many()
            .col_expr(column, Expr::value(value))
            .filter(watchlist_entry::Column::UserId.eq(user_id))
            .filter(watchlist_entry::Column::ShowId.eq(show_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

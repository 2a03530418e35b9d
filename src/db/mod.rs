use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tracing::info;

use crate::models::configuration::{CatalogConfiguration, ConfigurationDetails};
use crate::models::show::Show;
use crate::models::user::{ProfileUpdate, User, WatchlistEntry};

pub mod migrator;
pub mod repositories;

/// Facade over the three persisted collections: `shows` (the mirror),
/// `users` with their watchlist entries, and the `configuration` singleton.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn show_repo(&self) -> repositories::show::ShowRepository {
        repositories::show::ShowRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn watchlist_repo(&self) -> repositories::watchlist::WatchlistRepository {
        repositories::watchlist::WatchlistRepository::new(self.conn.clone())
    }

    fn configuration_repo(&self) -> repositories::configuration::ConfigurationRepository {
        repositories::configuration::ConfigurationRepository::new(self.conn.clone())
    }

    // Mirror store.

    pub async fn upsert_show(&self, show: &Show) -> Result<Show> {
        self.show_repo().upsert(show).await
    }

    pub async fn find_shows_by_ids(&self, ids: &[i64]) -> Result<Vec<Show>> {
        self.show_repo().find_by_ids(ids).await
    }

    pub async fn delete_show(&self, id: i64) -> Result<bool> {
        self.show_repo().delete_by_id(id).await
    }

    pub async fn all_show_ids(&self) -> Result<HashSet<i64>> {
        self.show_repo().all_ids().await
    }

    // User accounts.

    pub async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, first_name, last_name)
            .await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn update_user_profile(
        &self,
        id: i32,
        update: &ProfileUpdate,
    ) -> Result<Option<User>> {
        self.user_repo().update_profile(id, update).await
    }

    // Watchlists.

    pub async fn add_watchlist_entry(&self, user_id: i32, show_id: i64) -> Result<bool> {
        self.watchlist_repo().add_entry(user_id, show_id).await
    }

    pub async fn remove_watchlist_entry(&self, user_id: i32, show_id: i64) -> Result<bool> {
        self.watchlist_repo().remove_entry(user_id, show_id).await
    }

    pub async fn set_watched(&self, user_id: i32, show_id: i64, value: bool) -> Result<bool> {
        self.watchlist_repo()
            .set_watched(user_id, show_id, value)
            .await
    }

    pub async fn set_favorite(&self, user_id: i32, show_id: i64, value: bool) -> Result<bool> {
        self.watchlist_repo()
            .set_favorite(user_id, show_id, value)
            .await
    }

    pub async fn set_rating(
        &self,
        user_id: i32,
        show_id: i64,
        rating: Option<&str>,
    ) -> Result<bool> {
        self.watchlist_repo()
            .set_rating(user_id, show_id, rating)
            .await
    }

    pub async fn watchlist_entries(&self, user_id: i32) -> Result<Vec<WatchlistEntry>> {
        self.watchlist_repo().entries_for_user(user_id).await
    }

    pub async fn other_watchlist_owners(
        &self,
        show_id: i64,
        excluding_user_id: i32,
    ) -> Result<Vec<i32>> {
        self.watchlist_repo()
            .other_owners(show_id, excluding_user_id)
            .await
    }

    // Configuration singleton.

    pub async fn replace_configuration(
        &self,
        details: &ConfigurationDetails,
        fetched_at: &str,
    ) -> Result<()> {
        self.configuration_repo().replace(details, fetched_at).await
    }

    pub async fn get_configuration(&self) -> Result<Option<CatalogConfiguration>> {
        self.configuration_repo().get().await
    }
}

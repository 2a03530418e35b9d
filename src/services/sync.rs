//! The sync engine: keeps the local mirror consistent with the remote
//! catalog on demand and on a schedule, and computes the per-user joined
//! watchlist view.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clients::CatalogClient;
use crate::clients::tmdb::{RemoteError, ShowDetails};
use crate::db::Store;
use crate::models::show::Show;
use crate::models::user::UserShow;

/// Concurrent fetch-and-upsert operations during the changed-ids refresh.
const REFRESH_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no watchlist entry for show {show_id} on user {user_id}")]
    EntryNotFound { user_id: i32, show_id: i64 },

    #[error("catalog error: {0}")]
    Remote(#[from] RemoteError),

    #[error("database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result of `resolve_user_shows`. Ids whose catalog fetch failed are listed
/// separately; the caller chooses whether a partial view is acceptable.
#[derive(Debug, Default)]
pub struct ResolvedWatchlist {
    pub shows: Vec<UserShow>,
    pub failed: Vec<i64>,
}

/// Outcome of one changed-ids sweep.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshStats {
    /// Ids the feed reported as changed in the window.
    pub changed: usize,
    /// Mirrored records that were re-fetched and upserted.
    pub refreshed: usize,
    /// Mirrored records whose re-fetch failed.
    pub failed: usize,
    /// Feed pages that could not be fetched.
    pub failed_pages: usize,
}

#[derive(Clone)]
pub struct SyncEngine {
    store: Store,
    catalog: Arc<dyn CatalogClient>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(store: Store, catalog: Arc<dyn CatalogClient>) -> Self {
        Self { store, catalog }
    }

    /// Joins a user's watchlist entries against the mirror, fetching and
    /// mirroring any show not cached yet. Missing-id fetches run
    /// concurrently and independently; a failure excludes that id from the
    /// result instead of aborting the batch. The result is sorted by title,
    /// ascending, stable.
    pub async fn resolve_user_shows(&self, user_id: i32) -> Result<ResolvedWatchlist, SyncError> {
        let entries = self.store.watchlist_entries(user_id).await?;
        if entries.is_empty() {
            return Ok(ResolvedWatchlist::default());
        }

        let requested: Vec<i64> = entries.iter().map(|e| e.show_id).collect();
        let mut shows = self.store.find_shows_by_ids(&requested).await?;

        let present: HashSet<i64> = shows.iter().map(|s| s.id).collect();
        let missing: Vec<i64> = requested
            .iter()
            .copied()
            .filter(|id| !present.contains(id))
            .collect();

        let mut failed = Vec::new();
        if !missing.is_empty() {
            debug!(
                "resolve_user_shows: user {} needs {} of {} shows fetched",
                user_id,
                missing.len(),
                requested.len()
            );

            let fetches = missing
                .iter()
                .map(|&id| async move { (id, self.fetch_and_mirror(id).await) });

            for (id, result) in futures::future::join_all(fetches).await {
                match result {
                    Ok(show) => shows.push(show),
                    Err(e) => {
                        warn!("resolve_user_shows: fetch for show {} failed: {}", id, e);
                        failed.push(id);
                    }
                }
            }
        }

        let mut resolved: Vec<UserShow> = shows
            .into_iter()
            .filter_map(|show| {
                entries
                    .iter()
                    .find(|e| e.show_id == show.id)
                    .map(|entry| UserShow {
                        show,
                        user_show: entry.clone(),
                    })
            })
            .collect();

        resolved.sort_by(|a, b| a.show.name.cmp(&b.show.name));

        Ok(ResolvedWatchlist {
            shows: resolved,
            failed,
        })
    }

    /// Appends the show to the user's watchlist. The mirror fill runs on its
    /// own task; its failure is logged, never surfaced, since the entry and
    /// the cached record are independent. Returns false when the entry
    /// already existed (a no-op, not an error).
    pub async fn add_show_to_user_list(
        &self,
        user_id: i32,
        show_id: i64,
    ) -> Result<bool, SyncError> {
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.ensure_mirrored(show_id).await {
                warn!(
                    "add_show_to_user_list: mirror fill for show {} failed: {}",
                    show_id, e
                );
            }
        });

        Ok(self.store.add_watchlist_entry(user_id, show_id).await?)
    }

    /// Removes the user's entry, then drops the mirror record when no other
    /// user references it. The reference check is a live query, not a
    /// transaction: a racing add can briefly lose the cached record, which
    /// the next `resolve_user_shows` restores.
    pub async fn delete_user_show(&self, user_id: i32, show_id: i64) -> Result<(), SyncError> {
        let removed = self.store.remove_watchlist_entry(user_id, show_id).await?;
        if !removed {
            debug!(
                "delete_user_show: user {} had no entry for show {}",
                user_id, show_id
            );
        }

        let other_owners = self.store.other_watchlist_owners(show_id, user_id).await?;
        if other_owners.is_empty() && self.store.delete_show(show_id).await? {
            info!("Dropped unreferenced mirror record for show {}", show_id);
        }

        Ok(())
    }

    pub async fn set_has_watched(
        &self,
        user_id: i32,
        show_id: i64,
        value: bool,
    ) -> Result<(), SyncError> {
        if self.store.set_watched(user_id, show_id, value).await? {
            Ok(())
        } else {
            Err(SyncError::EntryNotFound { user_id, show_id })
        }
    }

    pub async fn set_is_favorite(
        &self,
        user_id: i32,
        show_id: i64,
        value: bool,
    ) -> Result<(), SyncError> {
        if self.store.set_favorite(user_id, show_id, value).await? {
            Ok(())
        } else {
            Err(SyncError::EntryNotFound { user_id, show_id })
        }
    }

    pub async fn set_rating(
        &self,
        user_id: i32,
        show_id: i64,
        rating: Option<&str>,
    ) -> Result<(), SyncError> {
        if self.store.set_rating(user_id, show_id, rating).await? {
            Ok(())
        } else {
            Err(SyncError::EntryNotFound { user_id, show_id })
        }
    }

    /// Returns the mirrored record, fetching and caching it first if absent.
    pub async fn ensure_mirrored(&self, show_id: i64) -> Result<Show, SyncError> {
        let existing = self.store.find_shows_by_ids(&[show_id]).await?;
        if let Some(show) = existing.into_iter().next() {
            return Ok(show);
        }
        self.fetch_and_mirror(show_id).await
    }

    /// Scheduled sweep: re-fetches every mirrored show the changed-ids feed
    /// reports as changed in the default window (last 24 hours). Ids nobody
    /// has added are ignored; individual failures are logged and counted but
    /// never abort the sweep.
    pub async fn refresh_changed_shows(&self) -> Result<RefreshStats, SyncError> {
        let mirrored = self.store.all_show_ids().await?;
        if mirrored.is_empty() {
            debug!("refresh_changed_shows: mirror is empty, skipping feed scan");
            return Ok(RefreshStats::default());
        }

        let sweep = self.catalog.all_changed_show_ids(None, None).await?;

        let stale: HashSet<i64> = sweep
            .changed
            .iter()
            .map(|c| c.id)
            .filter(|id| mirrored.contains(id))
            .collect();

        info!(
            "refresh_changed_shows: {} changed upstream, {} mirrored here",
            sweep.changed.len(),
            stale.len()
        );

        let mut stats = RefreshStats {
            changed: sweep.changed.len(),
            failed_pages: sweep.failed_pages.len(),
            ..RefreshStats::default()
        };

        let mut refreshes = futures::stream::iter(stale)
            .map(|id| async move { (id, self.fetch_and_mirror(id).await) })
            .buffer_unordered(REFRESH_CONCURRENCY);

        while let Some((id, result)) = refreshes.next().await {
            match result {
                Ok(_) => {
                    debug!("Refreshed show {}", id);
                    stats.refreshed += 1;
                }
                Err(e) => {
                    warn!("refresh_changed_shows: show {} failed: {}", id, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Fetches the remote configuration and replaces the cached singleton.
    /// On failure the previous record stays in place as a stale-but-valid
    /// fallback; callers log and continue.
    pub async fn refresh_configuration(&self) -> Result<(), SyncError> {
        let details = self.catalog.configuration().await?;
        self.store
            .replace_configuration(&details, &chrono::Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }

    async fn fetch_and_mirror(&self, show_id: i64) -> Result<Show, SyncError> {
        let details = self
            .catalog
            .show_details_with_watch_providers(show_id, None)
            .await?;
        let show = map_details_to_show(details);
        Ok(self.store.upsert_show(&show).await?)
    }
}

fn map_details_to_show(details: ShowDetails) -> Show {
    Show {
        id: details.id,
        name: details.name,
        overview: details.overview,
        backdrop_path: details.backdrop_path,
        poster_path: details.poster_path,
        first_air_date: details.first_air_date,
        last_air_date: details.last_air_date,
        episode_count: details.number_of_episodes,
        season_count: details.number_of_seasons,
        genres: details.genres,
        seasons: details.seasons,
        last_episode_aired: details.last_episode_to_air,
        next_episode_to_air: details.next_episode_to_air,
        watch_providers: details
            .watch_providers
            .map(|p| p.results)
            .unwrap_or_default(),
        status: details.status,
        tagline: details.tagline,
        popularity: details.popularity,
        vote_average: details.vote_average,
        vote_count: details.vote_count,
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::tmdb::{ChangedIdSweep, ChangedShow, WatchProviders};
    use crate::models::configuration::{ConfigurationDetails, ImageSettings};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockCatalog {
        shows: Mutex<HashMap<i64, ShowDetails>>,
        sweep: Mutex<ChangedIdSweep>,
        detail_calls: AtomicUsize,
        detail_ids: Mutex<Vec<i64>>,
        configuration_calls: AtomicUsize,
    }

    impl MockCatalog {
        fn with_show(self, details: ShowDetails) -> Self {
            self.shows.lock().unwrap().insert(details.id, details);
            self
        }

        fn with_changed(self, ids: &[i64]) -> Self {
            *self.sweep.lock().unwrap() = ChangedIdSweep {
                changed: ids.iter().map(|&id| ChangedShow { id, adult: None }).collect(),
                total_pages: 1,
                failed_pages: Vec::new(),
            };
            self
        }

        fn detail_calls(&self) -> usize {
            self.detail_calls.load(Ordering::SeqCst)
        }

        fn detail_ids(&self) -> Vec<i64> {
            self.detail_ids.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CatalogClient for MockCatalog {
        async fn show_details_with_watch_providers(
            &self,
            id: i64,
            _language: Option<&str>,
        ) -> Result<ShowDetails, RemoteError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            self.detail_ids.lock().unwrap().push(id);

            self.shows.lock().unwrap().get(&id).cloned().ok_or_else(|| {
                RemoteError::Status {
                    status: reqwest::StatusCode::NOT_FOUND,
                    body: format!("show {id} not found"),
                }
            })
        }

        async fn all_changed_show_ids(
            &self,
            _start_date: Option<chrono::NaiveDate>,
            _end_date: Option<chrono::NaiveDate>,
        ) -> Result<ChangedIdSweep, RemoteError> {
            Ok(self.sweep.lock().unwrap().clone())
        }

        async fn configuration(&self) -> Result<ConfigurationDetails, RemoteError> {
            self.configuration_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ConfigurationDetails {
                images: ImageSettings {
                    base_url: "http://image.tmdb.org/t/p/".to_string(),
                    secure_base_url: "https://image.tmdb.org/t/p/".to_string(),
                    backdrop_sizes: vec!["w300".to_string()],
                    logo_sizes: vec![],
                    poster_sizes: vec!["w92".to_string(), "w500".to_string()],
                    profile_sizes: vec![],
                    still_sizes: vec![],
                },
                change_keys: vec!["overview".to_string(), "name".to_string()],
            })
        }
    }

    fn details(id: i64, name: &str) -> ShowDetails {
        ShowDetails {
            id,
            name: name.to_string(),
            overview: Some("overview".to_string()),
            backdrop_path: None,
            poster_path: None,
            first_air_date: Some("2008-01-20".to_string()),
            last_air_date: None,
            number_of_episodes: Some(62),
            number_of_seasons: Some(5),
            genres: vec![],
            seasons: vec![],
            last_episode_to_air: None,
            next_episode_to_air: None,
            status: Some("Ended".to_string()),
            tagline: None,
            popularity: Some(100.0),
            vote_average: Some(8.9),
            vote_count: Some(12000),
            watch_providers: Some(WatchProviders::default()),
        }
    }

    fn show(id: i64, name: &str) -> Show {
        map_details_to_show(details(id, name))
    }

    async fn engine_with(catalog: Arc<MockCatalog>) -> (SyncEngine, Store) {
        let db_path = std::env::temp_dir().join(format!("showrunner-test-{}.db", uuid::Uuid::new_v4()));
        let store = Store::new(&format!("sqlite:{}", db_path.display()))
            .await
            .unwrap();
        let engine = SyncEngine::new(store.clone(), catalog);
        (engine, store)
    }

    async fn user(store: &Store, username: &str) -> i32 {
        store
            .create_user(username, None, None, None)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let (_, store) = engine_with(Arc::new(MockCatalog::default())).await;

        store.upsert_show(&show(10, "First Title")).await.unwrap();
        store.upsert_show(&show(10, "Second Title")).await.unwrap();

        let found = store.find_shows_by_ids(&[10]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Second Title");
    }

    #[tokio::test]
    async fn duplicate_add_keeps_a_single_entry() {
        let catalog = Arc::new(MockCatalog::default().with_show(details(10, "The Wire")));
        let (engine, store) = engine_with(catalog).await;
        let user_id = user(&store, "alice").await;

        let first = engine.add_show_to_user_list(user_id, 10).await.unwrap();
        let second = engine.add_show_to_user_list(user_id, 10).await.unwrap();

        assert!(first);
        assert!(!second);

        let entries = store.watchlist_entries(user_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].show_id, 10);
        assert!(!entries[0].watched);
        assert!(!entries[0].favorite);
    }

    #[tokio::test]
    async fn resolve_empty_watchlist_makes_no_catalog_calls() {
        let catalog = Arc::new(MockCatalog::default());
        let (engine, store) = engine_with(catalog.clone()).await;
        let user_id = user(&store, "alice").await;

        let resolved = engine.resolve_user_shows(user_id).await.unwrap();

        assert!(resolved.shows.is_empty());
        assert!(resolved.failed.is_empty());
        assert_eq!(catalog.detail_calls(), 0);
    }

    #[tokio::test]
    async fn resolve_fetches_only_missing_ids() {
        let catalog = Arc::new(
            MockCatalog::default()
                .with_show(details(10, "Breaking Bad"))
                .with_show(details(20, "The Wire")),
        );
        let (engine, store) = engine_with(catalog.clone()).await;
        let user_id = user(&store, "alice").await;

        store.upsert_show(&show(10, "Breaking Bad")).await.unwrap();
        store.add_watchlist_entry(user_id, 10).await.unwrap();
        store.add_watchlist_entry(user_id, 20).await.unwrap();

        let resolved = engine.resolve_user_shows(user_id).await.unwrap();

        assert_eq!(resolved.shows.len(), 2);
        assert!(resolved.failed.is_empty());
        assert_eq!(catalog.detail_calls(), 1);
        assert_eq!(catalog.detail_ids(), vec![20]);

        // The fetched show is now mirrored; a second resolve stays local.
        let again = engine.resolve_user_shows(user_id).await.unwrap();
        assert_eq!(again.shows.len(), 2);
        assert_eq!(catalog.detail_calls(), 1);
    }

    #[tokio::test]
    async fn resolve_attaches_matching_entries() {
        let catalog = Arc::new(MockCatalog::default());
        let (engine, store) = engine_with(catalog).await;
        let user_id = user(&store, "alice").await;

        store.upsert_show(&show(10, "Breaking Bad")).await.unwrap();
        store.add_watchlist_entry(user_id, 10).await.unwrap();
        store.set_watched(user_id, 10, true).await.unwrap();

        let resolved = engine.resolve_user_shows(user_id).await.unwrap();

        assert_eq!(resolved.shows.len(), 1);
        let user_show = &resolved.shows[0];
        assert_eq!(user_show.show.id, 10);
        assert_eq!(user_show.user_show.show_id, 10);
        assert!(user_show.user_show.watched);
    }

    #[tokio::test]
    async fn resolve_sorts_by_title_and_is_stable() {
        let catalog = Arc::new(MockCatalog::default());
        let (engine, store) = engine_with(catalog).await;
        let user_id = user(&store, "alice").await;

        store.upsert_show(&show(1, "Severance")).await.unwrap();
        store.upsert_show(&show(2, "Andor")).await.unwrap();
        store.upsert_show(&show(3, "Andor")).await.unwrap();
        for id in [1, 2, 3] {
            store.add_watchlist_entry(user_id, id).await.unwrap();
        }

        let resolved = engine.resolve_user_shows(user_id).await.unwrap();
        let ids: Vec<i64> = resolved.shows.iter().map(|s| s.show.id).collect();

        // Equal titles keep their batch-read order.
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn resolve_reports_failed_ids_without_aborting() {
        let catalog = Arc::new(MockCatalog::default().with_show(details(20, "The Wire")));
        let (engine, store) = engine_with(catalog).await;
        let user_id = user(&store, "alice").await;

        store.add_watchlist_entry(user_id, 20).await.unwrap();
        store.add_watchlist_entry(user_id, 99).await.unwrap();

        let resolved = engine.resolve_user_shows(user_id).await.unwrap();

        assert_eq!(resolved.shows.len(), 1);
        assert_eq!(resolved.shows[0].show.id, 20);
        assert_eq!(resolved.failed, vec![99]);
    }

    #[tokio::test]
    async fn delete_by_sole_owner_collects_mirror_record() {
        let catalog = Arc::new(MockCatalog::default());
        let (engine, store) = engine_with(catalog).await;
        let user_id = user(&store, "alice").await;

        store.upsert_show(&show(10, "Breaking Bad")).await.unwrap();
        store.add_watchlist_entry(user_id, 10).await.unwrap();

        engine.delete_user_show(user_id, 10).await.unwrap();

        assert!(store.watchlist_entries(user_id).await.unwrap().is_empty());
        assert!(store.find_shows_by_ids(&[10]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_with_other_owner_keeps_mirror_record() {
        let catalog = Arc::new(MockCatalog::default());
        let (engine, store) = engine_with(catalog).await;
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;

        store.upsert_show(&show(10, "Breaking Bad")).await.unwrap();
        store.add_watchlist_entry(alice, 10).await.unwrap();
        store.add_watchlist_entry(bob, 10).await.unwrap();

        engine.delete_user_show(alice, 10).await.unwrap();

        assert!(store.watchlist_entries(alice).await.unwrap().is_empty());
        assert_eq!(store.watchlist_entries(bob).await.unwrap().len(), 1);
        assert_eq!(store.find_shows_by_ids(&[10]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn toggles_require_an_existing_entry() {
        let catalog = Arc::new(MockCatalog::default());
        let (engine, store) = engine_with(catalog).await;
        let user_id = user(&store, "alice").await;

        let err = engine.set_has_watched(user_id, 10, true).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::EntryNotFound { show_id: 10, .. }
        ));

        store.add_watchlist_entry(user_id, 10).await.unwrap();
        engine.set_has_watched(user_id, 10, true).await.unwrap();
        engine.set_is_favorite(user_id, 10, true).await.unwrap();
        engine
            .set_rating(user_id, 10, Some("9/10"))
            .await
            .unwrap();

        let entries = store.watchlist_entries(user_id).await.unwrap();
        assert!(entries[0].watched);
        assert!(entries[0].favorite);
        assert_eq!(entries[0].rating.as_deref(), Some("9/10"));
    }

    #[tokio::test]
    async fn refresh_touches_only_mirrored_ids() {
        let catalog = Arc::new(
            MockCatalog::default()
                .with_show(details(5, "Five"))
                .with_show(details(6, "Six"))
                .with_show(details(7, "Seven"))
                .with_changed(&[6, 7]),
        );
        let (engine, store) = engine_with(catalog.clone()).await;

        store.upsert_show(&show(5, "Five")).await.unwrap();
        store.upsert_show(&show(6, "Six")).await.unwrap();

        let stats = engine.refresh_changed_shows().await.unwrap();

        assert_eq!(stats.changed, 2);
        assert_eq!(stats.refreshed, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(catalog.detail_ids(), vec![6]);
    }

    #[tokio::test]
    async fn refresh_with_empty_mirror_skips_the_feed() {
        let catalog = Arc::new(MockCatalog::default().with_changed(&[6, 7]));
        let (engine, _) = engine_with(catalog.clone()).await;

        let stats = engine.refresh_changed_shows().await.unwrap();

        assert_eq!(stats.changed, 0);
        assert_eq!(stats.refreshed, 0);
        assert_eq!(catalog.detail_calls(), 0);
    }

    #[tokio::test]
    async fn refresh_configuration_replaces_the_singleton() {
        let catalog = Arc::new(MockCatalog::default());
        let (engine, store) = engine_with(catalog).await;

        assert!(store.get_configuration().await.unwrap().is_none());

        engine.refresh_configuration().await.unwrap();
        engine.refresh_configuration().await.unwrap();

        let config = store.get_configuration().await.unwrap().unwrap();
        assert_eq!(config.images.poster_sizes, vec!["w92", "w500"]);
        assert_eq!(
            config.poster_base_path("w500").as_deref(),
            Some("https://image.tmdb.org/t/p/w500")
        );
    }
}

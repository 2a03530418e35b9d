use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::SyncEngine;

mod error;
mod shows;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

/// Everything the route handlers need. Framework types stop here; the sync
/// engine below this layer only sees plain data.
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub tmdb: Arc<TmdbClient>,
    pub sync: SyncEngine,
    pub start_time: std::time::Instant,
}

pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tmdb = Arc::new(TmdbClient::with_base_url(
        config.tmdb.base_url.clone(),
        config.api_key()?,
    ));

    let sync = SyncEngine::new(store.clone(), tmdb.clone());

    Ok(Arc::new(AppState {
        config,
        store,
        tmdb,
        sync,
        start_time: std::time::Instant::now(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/health", get(health))
        .route("/search", get(shows::search_shows))
        .route("/configuration", get(shows::get_configuration))
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/profile", put(users::update_profile))
        .route("/users/{id}/shows", get(shows::list_user_shows))
        .route(
            "/users/{id}/shows/{show_id}",
            post(shows::add_user_show).delete(shows::delete_user_show),
        )
        .route("/users/{id}/shows/{show_id}/watched", put(shows::set_watched))
        .route(
            "/users/{id}/shows/{show_id}/favorite",
            put(shows::set_favorite),
        )
        .route("/users/{id}/shows/{show_id}/rating", put(shows::set_rating))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    state.store.ping().await?;

    Ok(Json(ApiResponse::success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })))
}

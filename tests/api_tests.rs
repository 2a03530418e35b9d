//! End-to-end tests for the JSON API over a temp-file store. The catalog
//! client points at an unroutable address, so any accidental remote fetch
//! fails fast instead of leaving the test suite hanging on the network.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use showrunner::api::AppState;
use showrunner::clients::tmdb::TmdbClient;
use showrunner::config::Config;
use showrunner::db::Store;
use showrunner::models::show::Show;
use showrunner::services::SyncEngine;

async fn spawn_app() -> (Arc<AppState>, Router) {
    let db_path =
        std::env::temp_dir().join(format!("showrunner-api-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());

    let store = Store::new(&config.general.database_path)
        .await
        .expect("failed to open test store");

    let tmdb = Arc::new(TmdbClient::with_base_url("http://127.0.0.1:9", "test-key"));
    let sync = SyncEngine::new(store.clone(), tmdb.clone());

    let state = Arc::new(AppState {
        config,
        store,
        tmdb,
        sync,
        start_time: std::time::Instant::now(),
    });

    let router = showrunner::api::router(state.clone());
    (state, router)
}

fn mirrored_show(id: i64, name: &str) -> Show {
    Show {
        id,
        name: name.to_string(),
        overview: Some("overview".to_string()),
        backdrop_path: None,
        poster_path: None,
        first_air_date: Some("2008-01-20".to_string()),
        last_air_date: None,
        episode_count: Some(62),
        season_count: Some(5),
        genres: vec![],
        seasons: vec![],
        last_episode_aired: None,
        next_episode_to_air: None,
        watch_providers: std::collections::HashMap::new(),
        status: Some("Ended".to_string()),
        tagline: None,
        popularity: Some(100.0),
        vote_average: Some(8.9),
        vote_count: Some(12000),
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }
}

async fn json_request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    let request = match body {
        Some(json) => request.body(Body::from(json.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_ok() {
    let (_, app) = spawn_app().await;

    let (status, body) = json_request(&app, "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn user_signup_and_profile_update() {
    let (_, app) = spawn_app().await;

    // Too-short usernames are rejected.
    let (status, _) = json_request(
        &app,
        "POST",
        "/api/users",
        Some(serde_json::json!({ "username": "al" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/users",
        Some(serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "first_name": "Alice"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let user_id = body["data"]["id"].as_i64().unwrap();

    // Usernames are unique.
    let (status, _) = json_request(
        &app,
        "POST",
        "/api/users",
        Some(serde_json::json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Null clears a field, absent fields stay untouched.
    let (status, body) = json_request(
        &app,
        "PUT",
        &format!("/api/users/{user_id}/profile"),
        Some(serde_json::json!({ "last_name": "Lovelace", "email": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Alice");
    assert_eq!(body["data"]["last_name"], "Lovelace");
    assert_eq!(body["data"]["email"], serde_json::Value::Null);

    let (status, body) = json_request(&app, "GET", &format!("/api/users/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");

    let (status, _) = json_request(&app, "GET", "/api/users/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn watchlist_flow_add_toggle_delete() {
    let (state, app) = spawn_app().await;

    let user = state
        .store
        .create_user("alice", None, None, None)
        .await
        .unwrap();
    state
        .store
        .upsert_show(&mirrored_show(10, "Breaking Bad"))
        .await
        .unwrap();

    // Adding twice leaves a single entry; the second add is a no-op.
    let uri = format!("/api/users/{}/shows/10", user.id);
    let (status, body) = json_request(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["added"], true);

    let (status, body) = json_request(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["added"], false);

    let (status, body) = json_request(
        &app,
        "PUT",
        &format!("{uri}/watched"),
        Some(serde_json::json!({ "value": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) =
        json_request(&app, "GET", &format!("/api/users/{}/shows", user.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let shows = body["data"]["shows"].as_array().unwrap();
    assert_eq!(shows.len(), 1);
    assert_eq!(shows[0]["show"]["id"], 10);
    assert_eq!(shows[0]["show"]["name"], "Breaking Bad");
    assert_eq!(shows[0]["user_show"]["watched"], true);
    assert_eq!(shows[0]["user_show"]["favorite"], false);

    // Toggling a show that is not on the list is a 404.
    let (status, _) = json_request(
        &app,
        "PUT",
        &format!("/api/users/{}/shows/999/favorite", user.id),
        Some(serde_json::json!({ "value": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting the sole owner's entry garbage-collects the mirror record.
    let (status, _) = json_request(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) =
        json_request(&app, "GET", &format!("/api/users/{}/shows", user.id), None).await;
    assert!(body["data"]["shows"].as_array().unwrap().is_empty());
    assert!(
        state
            .store
            .find_shows_by_ids(&[10])
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn add_show_requires_existing_user() {
    let (_, app) = spawn_app().await;

    let (status, _) = json_request(&app, "POST", "/api/users/42/shows/10", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn configuration_is_404_until_cached() {
    let (state, app) = spawn_app().await;

    let (status, _) = json_request(&app, "GET", "/api/configuration", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let details = showrunner::models::configuration::ConfigurationDetails {
        images: showrunner::models::configuration::ImageSettings {
            base_url: "http://image.tmdb.org/t/p/".to_string(),
            secure_base_url: "https://image.tmdb.org/t/p/".to_string(),
            backdrop_sizes: vec!["w300".to_string()],
            logo_sizes: vec![],
            poster_sizes: vec!["w92".to_string()],
            profile_sizes: vec![],
            still_sizes: vec![],
        },
        change_keys: vec!["name".to_string()],
    };
    state
        .store
        .replace_configuration(&details, "2026-01-01T00:00:00Z")
        .await
        .unwrap();

    let (status, body) = json_request(&app, "GET", "/api/configuration", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["images"]["poster_sizes"][0], "w92");
    assert_eq!(body["data"]["fetched_at"], "2026-01-01T00:00:00Z");
}

#[tokio::test]
async fn empty_search_query_is_rejected() {
    let (_, app) = spawn_app().await;

    let (status, _) = json_request(&app, "GET", "/api/search?query=%20", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::{
    AddShowResponse, ApiError, ApiResponse, AppState, RatingRequest, SearchParams, ToggleRequest,
    UserShowsResponse,
};
use crate::clients::tmdb::{Page, SearchOptions, ShowSummary};
use crate::models::configuration::CatalogConfiguration;

pub async fn search_shows(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<Page<ShowSummary>>>, ApiError> {
    if params.query.trim().is_empty() {
        return Err(ApiError::validation("query cannot be empty"));
    }

    let options = SearchOptions {
        page: params.page,
        language: params.language.clone(),
        include_adult: params.include_adult,
        first_air_date_year: None,
    };

    let page = state.tmdb.search_shows(&params.query, &options).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn list_user_shows(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<UserShowsResponse>>, ApiError> {
    let resolved = state.sync.resolve_user_shows(user_id).await?;
    Ok(Json(ApiResponse::success(UserShowsResponse {
        shows: resolved.shows,
        failed: resolved.failed,
    })))
}

pub async fn add_user_show(
    State(state): State<Arc<AppState>>,
    Path((user_id, show_id)): Path<(i32, i64)>,
) -> Result<Json<ApiResponse<AddShowResponse>>, ApiError> {
    if state.store.get_user(user_id).await?.is_none() {
        return Err(ApiError::user_not_found(user_id));
    }

    let added = state.sync.add_show_to_user_list(user_id, show_id).await?;
    Ok(Json(ApiResponse::success(AddShowResponse { added })))
}

pub async fn delete_user_show(
    State(state): State<Arc<AppState>>,
    Path((user_id, show_id)): Path<(i32, i64)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.sync.delete_user_show(user_id, show_id).await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn set_watched(
    State(state): State<Arc<AppState>>,
    Path((user_id, show_id)): Path<(i32, i64)>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .sync
        .set_has_watched(user_id, show_id, request.value)
        .await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn set_favorite(
    State(state): State<Arc<AppState>>,
    Path((user_id, show_id)): Path<(i32, i64)>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .sync
        .set_is_favorite(user_id, show_id, request.value)
        .await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn set_rating(
    State(state): State<Arc<AppState>>,
    Path((user_id, show_id)): Path<(i32, i64)>,
    Json(request): Json<RatingRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .sync
        .set_rating(user_id, show_id, request.rating.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn get_configuration(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CatalogConfiguration>>, ApiError> {
    let configuration = state
        .store
        .get_configuration()
        .await?
        .ok_or_else(|| ApiError::NotFound("Catalog configuration not cached yet".to_string()))?;

    Ok(Json(ApiResponse::success(configuration)))
}

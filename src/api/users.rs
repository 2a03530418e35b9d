use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CreateUserRequest};
use crate::models::user::{ProfileUpdate, User};

/// Minimum username length, matching the account form validation.
const MIN_USERNAME_LENGTH: usize = 4;

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let username = request.username.trim();
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ApiError::validation(format!(
            "username must be at least {MIN_USERNAME_LENGTH} characters"
        )));
    }

    if state.store.get_user_by_username(username).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "username '{username}' is already taken"
        )));
    }

    let user = state
        .store
        .create_user(
            username,
            request.email.as_deref(),
            request.first_name.as_deref(),
            request.last_name.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::user_not_found(user_id))?;

    Ok(Json(ApiResponse::success(user)))
}

/// Updates profile fields with set/unset semantics: a null value clears the
/// field, a present value sets it, an absent field is untouched.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = state
        .store
        .update_user_profile(user_id, &update)
        .await?
        .ok_or_else(|| ApiError::user_not_found(user_id))?;

    Ok(Json(ApiResponse::success(user)))
}

use serde::{Deserialize, Serialize};

use crate::models::user::UserShow;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub page: Option<u32>,
    pub language: Option<String>,
    pub include_adult: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub value: bool,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddShowResponse {
    /// False when the show was already on the list (a no-op).
    pub added: bool,
}

/// A user's resolved watchlist: the joined records plus any ids whose
/// catalog fetch failed this time around.
#[derive(Debug, Serialize)]
pub struct UserShowsResponse {
    pub shows: Vec<UserShow>,
    pub failed: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::show::Show;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

/// A user's per-show annotation, independent of the show's own metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchlistEntry {
    pub show_id: i64,
    pub watched: bool,
    pub favorite: bool,
    pub rating: Option<String>,
    pub added_at: String,
}

/// A mirrored show joined with the requesting user's watchlist entry.
#[derive(Debug, Clone, Serialize)]
pub struct UserShow {
    pub show: Show,
    pub user_show: WatchlistEntry,
}

/// Profile fields to change. Each field distinguishes "leave alone" (absent)
/// from "clear" (explicit null) from "set" (a value), matching the update
/// semantics of the users collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "explicit_null")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub email: Option<Option<String>>,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_distinguishes_null_from_absent() {
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"first_name": "Ada", "email": null}"#).unwrap();

        assert_eq!(update.first_name, Some(Some("Ada".to_string())));
        assert_eq!(update.email, Some(None));
        assert_eq!(update.last_name, None);
        assert!(!update.is_empty());
    }

    #[test]
    fn profile_update_empty_body() {
        let update: ProfileUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
    }
}

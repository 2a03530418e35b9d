use serde::{Deserialize, Serialize};

/// Image settings block of the remote `/configuration` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSettings {
    pub base_url: String,
    pub secure_base_url: String,
    pub backdrop_sizes: Vec<String>,
    pub logo_sizes: Vec<String>,
    pub poster_sizes: Vec<String>,
    pub profile_sizes: Vec<String>,
    pub still_sizes: Vec<String>,
}

/// Wire shape of the remote configuration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationDetails {
    pub images: ImageSettings,
    pub change_keys: Vec<String>,
}

/// The locally cached configuration singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogConfiguration {
    pub images: ImageSettings,
    pub change_keys: Vec<String>,
    pub fetched_at: String,
}

impl CatalogConfiguration {
    /// Base path for poster images, e.g. `https://image.tmdb.org/t/p/w500`.
    #[must_use]
    pub fn poster_base_path(&self, preferred_size: &str) -> Option<String> {
        self.image_base_path(preferred_size, &self.images.poster_sizes)
    }

    /// Base path for backdrop images.
    #[must_use]
    pub fn backdrop_base_path(&self, preferred_size: &str) -> Option<String> {
        self.image_base_path(preferred_size, &self.images.backdrop_sizes)
    }

    /// Picks `preferred_size` when the catalog supports it, otherwise the
    /// first configured size. `None` only when the size list is empty.
    fn image_base_path(&self, preferred_size: &str, sizes: &[String]) -> Option<String> {
        let size = if sizes.iter().any(|s| s == preferred_size) {
            preferred_size
        } else {
            sizes.first()?.as_str()
        };
        Some(format!("{}{}", self.images.secure_base_url, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration() -> CatalogConfiguration {
        CatalogConfiguration {
            images: ImageSettings {
                base_url: "http://image.tmdb.org/t/p/".to_string(),
                secure_base_url: "https://image.tmdb.org/t/p/".to_string(),
                backdrop_sizes: vec!["w300".to_string(), "w780".to_string()],
                logo_sizes: vec![],
                poster_sizes: vec!["w92".to_string(), "w500".to_string()],
                profile_sizes: vec![],
                still_sizes: vec![],
            },
            change_keys: vec!["overview".to_string()],
            fetched_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn poster_base_path_uses_preferred_size() {
        let config = configuration();
        assert_eq!(
            config.poster_base_path("w500").as_deref(),
            Some("https://image.tmdb.org/t/p/w500")
        );
    }

    #[test]
    fn poster_base_path_falls_back_to_first_size() {
        let config = configuration();
        assert_eq!(
            config.poster_base_path("w1234").as_deref(),
            Some("https://image.tmdb.org/t/p/w92")
        );
    }

    #[test]
    fn base_path_empty_size_list() {
        let mut config = configuration();
        config.images.backdrop_sizes.clear();
        assert!(config.backdrop_base_path("w300").is_none());
    }
}

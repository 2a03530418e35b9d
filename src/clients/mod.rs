pub mod tmdb;

use chrono::NaiveDate;

use crate::models::configuration::ConfigurationDetails;
use tmdb::{ChangedIdSweep, RemoteError, ShowDetails};

/// The slice of the catalog API the sync engine consumes. Kept narrow so the
/// engine can be exercised against a stand-in that records its calls.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Show details with the watch-providers sub-resource embedded.
    async fn show_details_with_watch_providers(
        &self,
        id: i64,
        language: Option<&str>,
    ) -> Result<ShowDetails, RemoteError>;

    /// Every changed show id in the window (server default: last 24 hours),
    /// all pages collected.
    async fn all_changed_show_ids(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<ChangedIdSweep, RemoteError>;

    async fn configuration(&self) -> Result<ConfigurationDetails, RemoteError>;
}

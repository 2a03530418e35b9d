use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, Set, TransactionTrait};
use tracing::info;

use crate::entities::{configuration, prelude::*};
use crate::models::configuration::{CatalogConfiguration, ConfigurationDetails, ImageSettings};

/// The configuration singleton. Replaced wholesale on each refresh.
pub struct ConfigurationRepository {
    conn: DatabaseConnection,
}

impl ConfigurationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Match-any upsert: whatever row exists is dropped and the fresh record
    /// inserted, in one transaction so readers never observe an empty table.
    pub async fn replace(&self, details: &ConfigurationDetails, fetched_at: &str) -> Result<()> {
        let active_model = configuration::ActiveModel {
            image_base_url: Set(details.images.base_url.clone()),
            secure_image_base_url: Set(details.images.secure_base_url.clone()),
            backdrop_sizes: Set(serde_json::to_string(&details.images.backdrop_sizes)?),
            logo_sizes: Set(serde_json::to_string(&details.images.logo_sizes)?),
            poster_sizes: Set(serde_json::to_string(&details.images.poster_sizes)?),
            profile_sizes: Set(serde_json::to_string(&details.images.profile_sizes)?),
            still_sizes: Set(serde_json::to_string(&details.images.still_sizes)?),
            change_keys: Set(serde_json::to_string(&details.change_keys)?),
            fetched_at: Set(fetched_at.to_string()),
            ..Default::default()
        };

        let txn = self.conn.begin().await?;
        Configuration::delete_many().exec(&txn).await?;
        Configuration::insert(active_model).exec(&txn).await?;
        txn.commit().await?;

        info!("Replaced catalog configuration (fetched {})", fetched_at);
        Ok(())
    }

    pub async fn get(&self) -> Result<Option<CatalogConfiguration>> {
        let Some(model) = Configuration::find().one(&self.conn).await? else {
            return Ok(None);
        };

        Ok(Some(CatalogConfiguration {
            images: ImageSettings {
                base_url: model.image_base_url,
                secure_base_url: model.secure_image_base_url,
                backdrop_sizes: serde_json::from_str(&model.backdrop_sizes).unwrap_or_default(),
                logo_sizes: serde_json::from_str(&model.logo_sizes).unwrap_or_default(),
                poster_sizes: serde_json::from_str(&model.poster_sizes).unwrap_or_default(),
                profile_sizes: serde_json::from_str(&model.profile_sizes).unwrap_or_default(),
                still_sizes: serde_json::from_str(&model.still_sizes).unwrap_or_default(),
            },
            change_keys: serde_json::from_str(&model.change_keys).unwrap_or_default(),
            fetched_at: model.fetched_at,
        }))
    }
}

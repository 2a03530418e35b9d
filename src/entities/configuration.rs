use sea_orm::entity::prelude::*;

/// Singleton mirror of the remote API configuration. Replaced wholesale on
/// each refresh; at most one row exists at any time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "configuration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub image_base_url: String,
    pub secure_image_base_url: String,
    /// JSON string arrays, one per image class.
    pub backdrop_sizes: String,
    pub logo_sizes: String,
    pub poster_sizes: String,
    pub profile_sizes: String,
    pub still_sizes: String,
    /// JSON array of recognized change-tracking keys.
    pub change_keys: String,
    pub fetched_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

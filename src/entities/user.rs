use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    pub email: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::watchlist_entry::Entity")]
    WatchlistEntries,
}

impl Related<super::watchlist_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchlistEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub use super::configuration::Entity as Configuration;
pub use super::show::Entity as Shows;
pub use super::user::Entity as Users;
pub use super::watchlist_entry::Entity as WatchlistEntries;

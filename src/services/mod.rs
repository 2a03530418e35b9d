pub mod sync;

pub use sync::{RefreshStats, ResolvedWatchlist, SyncEngine, SyncError};

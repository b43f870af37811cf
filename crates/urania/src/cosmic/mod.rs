pub mod cache;
pub mod moon;
pub mod snapshot;

pub use cache::{CacheError, CacheState, CosmicDataCache};
pub use moon::{MoonPhase, SYNODIC_MONTH_DAYS};
pub use snapshot::{compute_snapshot, CosmicSnapshot};

pub mod tracker;
pub mod types;

pub use tracker::{ReturnError, ReturnScan, ReturnTracker};
pub use types::{PlanetaryReturn, ReturnPhase, ReturnType, ReturnWindows};

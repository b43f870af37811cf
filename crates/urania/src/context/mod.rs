pub mod builder;
pub mod cost;
pub mod requirements;

pub use builder::{CategoryStatus, ContextBuilder, ContextError, CosmicContext};
pub use cost::{estimate, CostEstimate, CostWeights};
pub use requirements::{analyze, ContextComponent, ContextPreset, ContextRequirements};

pub mod calculator;
pub mod types;

pub use calculator::AspectGeometry;
pub use types::{AspectHit, AspectKind, AspectMatch};

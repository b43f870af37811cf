pub mod detector;
pub mod types;

pub use detector::PatternDetector;
pub use types::{NatalPattern, PatternKind};

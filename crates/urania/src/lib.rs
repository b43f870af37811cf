//! Astrological context core: natal patterns, planetary returns, personal
//! transits and the cost-budgeted context built from them.

pub mod aspects;
pub mod chart;
pub mod clock;
pub mod config;
pub mod context;
pub mod cosmic;
pub mod ephemeris;
pub mod patterns;
pub mod returns;
pub mod transits;

pub use aspects::{AspectGeometry, AspectHit, AspectKind, AspectMatch};
pub use chart::{
    Body, ChartError, ChartStore, InMemoryChartStore, NatalChart, PlanetPlacement, Sign,
    StoreError, TransitSnapshot,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigurationError, CoreConfig};
pub use context::{
    analyze, estimate, CategoryStatus, ContextBuilder, ContextComponent, ContextError,
    ContextPreset, ContextRequirements, CosmicContext, CostEstimate,
};
pub use cosmic::{CacheError, CacheState, CosmicDataCache, CosmicSnapshot, MoonPhase};
pub use ephemeris::{AstronomyError, AstronomyProvider, MeanMotionEphemeris};
pub use patterns::{NatalPattern, PatternDetector, PatternKind};
pub use returns::{PlanetaryReturn, ReturnPhase, ReturnTracker, ReturnType};
pub use transits::{PersonalTransits, TransitPersonalizer};

#[cfg(feature = "swisseph")]
pub use ephemeris::SwissEphemerisAdapter;

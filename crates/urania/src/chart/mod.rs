pub mod store;
pub mod types;

pub use store::{
    chart_from_json, ChartStore, InMemoryChartStore, RawBirthData, RawChartRecord, RawChartRow,
    StoreError,
};
pub use types::{
    angular_separation, house_for_longitude, normalize_degrees, signed_difference, Body,
    ChartError, Element, NatalChart, PlanetPlacement, Sign, TransitSnapshot, MAX_BODIES,
};

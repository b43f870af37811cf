use crate::aspects::{AspectGeometry, AspectHit};
use crate::chart::{Body, TransitSnapshot};
use crate::cosmic::moon::MoonPhase;
use crate::ephemeris::{AstronomyError, AstronomyProvider};
use chrono::NaiveDate;
use serde::Serialize;

/// Date-keyed sky data shared by every user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmicSnapshot {
    pub date: NaiveDate,
    pub transits: TransitSnapshot,
    pub moon_phase: MoonPhase,
    /// Aspects among the transiting bodies themselves, tightest first
    pub general_transits: Vec<AspectHit>,
}

/// Blocking: runs every provider call for the date.
pub fn compute_snapshot(
    provider: &dyn AstronomyProvider,
    geometry: &AspectGeometry,
    date: NaiveDate,
) -> Result<CosmicSnapshot, AstronomyError> {
    let transits = provider.position(date)?;

    let longitude_of = |body: Body| {
        transits
            .placement(body)
            .map(|p| p.longitude)
            .ok_or_else(|| AstronomyError::CalculationFailed {
                body,
                instant: transits.instant,
                message: "provider snapshot is missing the body".to_string(),
            })
    };
    let moon_phase = MoonPhase::from_longitudes(longitude_of(Body::Sun)?, longitude_of(Body::Moon)?, date);

    // Nodes always oppose each other; leave them out of sky-to-sky aspects.
    let planets: Vec<_> = transits
        .placements
        .iter()
        .filter(|p| !p.body.is_node())
        .cloned()
        .collect();
    let general_transits = geometry.aspects_among(&planets);

    Ok(CosmicSnapshot {
        date,
        transits,
        moon_phase,
        general_transits,
    })
}

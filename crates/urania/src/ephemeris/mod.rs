//! Astronomy provider boundary.
//!
//! The core never does raw ephemeris math itself beyond the built-in
//! low-precision model; it asks an [`AstronomyProvider`] for longitudes.

#[cfg(feature = "swisseph")]
pub mod adapter;
pub mod mean_motion;

#[cfg(feature = "swisseph")]
pub use adapter::SwissEphemerisAdapter;
pub use mean_motion::MeanMotionEphemeris;

use crate::chart::{signed_difference, Body, PlanetPlacement, TransitSnapshot};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;

/// Errors raised by astronomy providers. All of them are treated as
/// transient by the cosmic cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AstronomyError {
    #[error("Failed to calculate position for {body} at {instant}: {message}")]
    CalculationFailed {
        body: Body,
        instant: DateTime<Utc>,
        message: String,
    },
    #[error("Ephemeris data unavailable: {message}")]
    Unavailable { message: String },
    #[error("Date {date} cannot be evaluated")]
    InvalidDate { date: NaiveDate },
}

/// Instant a calendar date is evaluated at: 12:00 UTC.
pub fn evaluation_instant(date: NaiveDate) -> Result<DateTime<Utc>, AstronomyError> {
    date.and_hms_opt(12, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or(AstronomyError::InvalidDate { date })
}

/// Source of geocentric ecliptic longitudes.
///
/// Implementations are called from tokio's blocking pool and may block.
pub trait AstronomyProvider: Send + Sync {
    /// Tropical geocentric longitude in [0, 360).
    fn longitude_at(&self, body: Body, instant: DateTime<Utc>) -> Result<f64, AstronomyError>;

    /// Longitude and daily motion. The default takes a central difference
    /// over one day.
    fn placement_at(
        &self,
        body: Body,
        instant: DateTime<Utc>,
    ) -> Result<PlanetPlacement, AstronomyError> {
        let half_day = Duration::hours(12);
        let lon = self.longitude_at(body, instant)?;
        let before = self.longitude_at(body, instant - half_day)?;
        let after = self.longitude_at(body, instant + half_day)?;
        Ok(PlanetPlacement::new(body, lon).with_speed(signed_difference(before, after)))
    }

    /// Positions of every tracked body for a calendar date.
    fn position(&self, date: NaiveDate) -> Result<TransitSnapshot, AstronomyError> {
        let instant = evaluation_instant(date)?;
        let placements = Body::ALL
            .iter()
            .map(|&body| self.placement_at(body, instant))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TransitSnapshot {
            date,
            instant,
            placements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl AstronomyProvider for Fixed {
        fn longitude_at(&self, body: Body, instant: DateTime<Utc>) -> Result<f64, AstronomyError> {
            if body == Body::Pluto {
                return Err(AstronomyError::CalculationFailed {
                    body,
                    instant,
                    message: "no data".to_string(),
                });
            }
            Ok(body.index() as f64 * 10.0)
        }
    }

    #[test]
    fn test_position_propagates_failures() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(
            Fixed.position(date),
            Err(AstronomyError::CalculationFailed {
                body: Body::Pluto,
                ..
            })
        ));
    }

    #[test]
    fn test_evaluation_instant_is_noon() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            evaluation_instant(date).unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
    }
}

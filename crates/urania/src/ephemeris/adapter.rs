use crate::chart::{normalize_degrees, Body, PlanetPlacement};
use crate::ephemeris::{AstronomyError, AstronomyProvider};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::env;
use std::path::PathBuf;
use swisseph::swe::{calc_ut, julday};

// Swiss Ephemeris body codes. The south node is derived from the true node.
const BODY_CODES: &[(Body, u32)] = &[
    (Body::Sun, 0),
    (Body::Moon, 1),
    (Body::Mercury, 2),
    (Body::Venus, 3),
    (Body::Mars, 4),
    (Body::Jupiter, 5),
    (Body::Saturn, 6),
    (Body::Uranus, 7),
    (Body::Neptune, 8),
    (Body::Pluto, 9),
    (Body::NorthNode, 11),
];

const FLG_SWIEPH: u32 = 2;
const FLG_SPEED: u32 = 256;

/// Astronomy provider backed by the Swiss Ephemeris.
pub struct SwissEphemerisAdapter {
    ephemeris_path: PathBuf,
}

impl SwissEphemerisAdapter {
    /// Uses `SWISS_EPHEMERIS_PATH` when no path is given.
    pub fn new(ephemeris_path: Option<PathBuf>) -> Result<Self, AstronomyError> {
        let path = ephemeris_path.unwrap_or_else(|| {
            env::var("SWISS_EPHEMERIS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/usr/local/share/swisseph"))
        });

        if !path.exists() {
            return Err(AstronomyError::Unavailable {
                message: format!(
                    "ephemeris path {} does not exist; install the Swiss Ephemeris data files",
                    path.display()
                ),
            });
        }
        log::info!("Using Swiss Ephemeris data at {}", path.display());

        Ok(Self {
            ephemeris_path: path,
        })
    }

    pub fn ephemeris_path(&self) -> &PathBuf {
        &self.ephemeris_path
    }

    fn calc(&self, body: Body, instant: DateTime<Utc>) -> Result<(f64, f64), AstronomyError> {
        let (code_body, flip) = match body {
            Body::SouthNode => (Body::NorthNode, true),
            other => (other, false),
        };
        let code = BODY_CODES
            .iter()
            .find(|(b, _)| *b == code_body)
            .map(|(_, code)| *code)
            .ok_or_else(|| AstronomyError::CalculationFailed {
                body,
                instant,
                message: "no Swiss Ephemeris code".to_string(),
            })?;

        let result = calc_ut(datetime_to_julian_day(instant), code, FLG_SWIEPH | FLG_SPEED)
            .map_err(|e| AstronomyError::CalculationFailed {
                body,
                instant,
                message: format!("Swiss Ephemeris error: {}", e),
            })?;

        let lon = if flip {
            result.out[0] + 180.0
        } else {
            result.out[0]
        };
        Ok((normalize_degrees(lon), result.out[3]))
    }
}

impl AstronomyProvider for SwissEphemerisAdapter {
    fn longitude_at(&self, body: Body, instant: DateTime<Utc>) -> Result<f64, AstronomyError> {
        self.calc(body, instant).map(|(lon, _)| lon)
    }

    fn placement_at(
        &self,
        body: Body,
        instant: DateTime<Utc>,
    ) -> Result<PlanetPlacement, AstronomyError> {
        let (lon, speed) = self.calc(body, instant)?;
        Ok(PlanetPlacement::new(body, lon).with_speed(speed))
    }
}

fn datetime_to_julian_day(dt: DateTime<Utc>) -> f64 {
    let hour_decimal =
        dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3600.0;
    // GREG_CAL = 1
    julday(dt.year(), dt.month() as i32, dt.day() as i32, hour_decimal, 1)
}

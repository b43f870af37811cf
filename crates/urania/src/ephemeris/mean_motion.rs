use crate::chart::{normalize_degrees, Body};
use crate::ephemeris::{AstronomyError, AstronomyProvider};
use chrono::{DateTime, TimeZone, Utc};

/// Heliocentric mean elements: semi-major axis (AU), mean longitude at
/// J2000 (deg), mean daily motion (deg/day).
const PLANET_ELEMENTS: &[(Body, f64, f64, f64)] = &[
    (Body::Mercury, 0.387098, 252.25084, 4.09233445),
    (Body::Venus, 0.723332, 181.97973, 1.60213034),
    (Body::Mars, 1.523679, 355.45332, 0.52403840),
    (Body::Jupiter, 5.20260, 34.40438, 0.08308529),
    (Body::Saturn, 9.55491, 49.94432, 0.03344414),
    (Body::Uranus, 19.21845, 313.23218, 0.01172834),
    (Body::Neptune, 30.11039, 304.88003, 0.00598103),
    (Body::Pluto, 39.48, 238.93, 0.00397),
];

/// Built-in low-precision geocentric model.
///
/// Sun and Moon use low-order series, planets circular heliocentric orbits
/// seen from a circular Earth orbit, nodes the mean lunar node. Accurate to a
/// degree or two for the Sun and Moon and a few degrees for the planets, and
/// fully deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanMotionEphemeris;

impl MeanMotionEphemeris {
    pub fn new() -> Self {
        Self
    }

    /// Days since J2000.0 (2000-01-01 12:00 UTC).
    fn days_since_j2000(instant: DateTime<Utc>) -> f64 {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).single();
        match epoch {
            Some(epoch) => (instant - epoch).num_milliseconds() as f64 / 86_400_000.0,
            None => 0.0,
        }
    }

    fn sun_longitude(d: f64) -> f64 {
        let mean_lon = 280.460 + 0.9856474 * d;
        let anomaly = (357.528 + 0.9856003 * d).to_radians();
        normalize_degrees(mean_lon + 1.915 * anomaly.sin() + 0.020 * (2.0 * anomaly).sin())
    }

    fn moon_longitude(d: f64) -> f64 {
        let anomaly = (134.963 + 13.064993 * d).to_radians();
        normalize_degrees(218.316 + 13.176396 * d + 6.289 * anomaly.sin())
    }

    fn mean_node(d: f64) -> f64 {
        normalize_degrees(125.04452 - 0.0529538083 * d)
    }

    fn planet_longitude(d: f64, a: f64, l0: f64, n: f64) -> f64 {
        let helio = (l0 + n * d).to_radians();
        let earth = (Self::sun_longitude(d) + 180.0).to_radians();
        let x = a * helio.cos() - earth.cos();
        let y = a * helio.sin() - earth.sin();
        normalize_degrees(y.atan2(x).to_degrees())
    }

    fn longitude(body: Body, d: f64) -> Option<f64> {
        match body {
            Body::Sun => Some(Self::sun_longitude(d)),
            Body::Moon => Some(Self::moon_longitude(d)),
            Body::NorthNode => Some(Self::mean_node(d)),
            Body::SouthNode => Some(normalize_degrees(Self::mean_node(d) + 180.0)),
            _ => PLANET_ELEMENTS
                .iter()
                .find(|(b, ..)| *b == body)
                .map(|&(_, a, l0, n)| Self::planet_longitude(d, a, l0, n)),
        }
    }
}

impl AstronomyProvider for MeanMotionEphemeris {
    fn longitude_at(&self, body: Body, instant: DateTime<Utc>) -> Result<f64, AstronomyError> {
        let d = Self::days_since_j2000(instant);
        Self::longitude(body, d).ok_or_else(|| AstronomyError::CalculationFailed {
            body,
            instant,
            message: "no orbital elements for body".to_string(),
        })
    }
}

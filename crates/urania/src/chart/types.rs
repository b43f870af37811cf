//! Chart model: bodies, signs, placements, natal charts and transit snapshots.
//!
//! Everything here is plain data. Validation happens once, when a chart is
//! built, so downstream consumers can trust longitudes and houses.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Normalize degrees to [0, 360).
pub fn normalize_degrees(value: f64) -> f64 {
    let mut normalized = value % 360.0;
    if normalized < 0.0 {
        normalized += 360.0;
    }
    // -1e-15 % 360 + 360 rounds to 360.0
    if normalized >= 360.0 {
        normalized -= 360.0;
    }
    normalized
}

/// Signed difference `to - from` wrapped into (-180, 180].
pub fn signed_difference(from: f64, to: f64) -> f64 {
    let diff = normalize_degrees(to - from);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Minimal angular separation between two longitudes, in [0, 180].
pub fn angular_separation(lon1: f64, lon2: f64) -> f64 {
    let diff = (normalize_degrees(lon1) - normalize_degrees(lon2)).abs();
    diff.min(360.0 - diff)
}

/// Bodies tracked by the core, in canonical chart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    NorthNode,
    SouthNode,
}

/// Upper bound on placements in a chart (one per body).
pub const MAX_BODIES: usize = 12;

impl Body {
    pub const ALL: [Body; MAX_BODIES] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
        Body::Pluto,
        Body::NorthNode,
        Body::SouthNode,
    ];

    /// Position in canonical order, 0..12.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn id(self) -> &'static str {
        match self {
            Body::Sun => "sun",
            Body::Moon => "moon",
            Body::Mercury => "mercury",
            Body::Venus => "venus",
            Body::Mars => "mars",
            Body::Jupiter => "jupiter",
            Body::Saturn => "saturn",
            Body::Uranus => "uranus",
            Body::Neptune => "neptune",
            Body::Pluto => "pluto",
            Body::NorthNode => "north_node",
            Body::SouthNode => "south_node",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
            Body::Uranus => "Uranus",
            Body::Neptune => "Neptune",
            Body::Pluto => "Pluto",
            Body::NorthNode => "North Node",
            Body::SouthNode => "South Node",
        }
    }

    /// Parse a body id or display name, ignoring case, spaces and underscores.
    pub fn from_id(id: &str) -> Option<Body> {
        let key: String = id
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "sun" => Some(Body::Sun),
            "moon" => Some(Body::Moon),
            "mercury" => Some(Body::Mercury),
            "venus" => Some(Body::Venus),
            "mars" => Some(Body::Mars),
            "jupiter" => Some(Body::Jupiter),
            "saturn" => Some(Body::Saturn),
            "uranus" => Some(Body::Uranus),
            "neptune" => Some(Body::Neptune),
            "pluto" => Some(Body::Pluto),
            "northnode" | "truenode" | "meannode" | "rahu" => Some(Body::NorthNode),
            "southnode" | "ketu" => Some(Body::SouthNode),
            _ => None,
        }
    }

    /// Sun through Mars.
    pub fn is_personal(self) -> bool {
        matches!(
            self,
            Body::Sun | Body::Moon | Body::Mercury | Body::Venus | Body::Mars
        )
    }

    pub fn is_node(self) -> bool {
        matches!(self, Body::NorthNode | Body::SouthNode)
    }

    /// Average geocentric daily motion in degrees. Nodes move backwards.
    pub fn mean_daily_motion(self) -> f64 {
        match self {
            Body::Sun => 0.9856,
            Body::Moon => 13.1764,
            Body::Mercury => 1.383,
            Body::Venus => 1.2,
            Body::Mars => 0.524,
            Body::Jupiter => 0.0831,
            Body::Saturn => 0.0335,
            Body::Uranus => 0.0117,
            Body::Neptune => 0.006,
            Body::Pluto => 0.004,
            Body::NorthNode | Body::SouthNode => -0.053,
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Earth,
    Air,
    Water,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl Sign {
    pub const ALL: [Sign; 12] = [
        Sign::Aries,
        Sign::Taurus,
        Sign::Gemini,
        Sign::Cancer,
        Sign::Leo,
        Sign::Virgo,
        Sign::Libra,
        Sign::Scorpio,
        Sign::Sagittarius,
        Sign::Capricorn,
        Sign::Aquarius,
        Sign::Pisces,
    ];

    pub fn from_longitude(longitude: f64) -> Sign {
        let idx = (normalize_degrees(longitude) / 30.0).floor() as usize;
        Sign::ALL[idx % 12]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Longitude where the sign begins.
    pub fn start_longitude(self) -> f64 {
        self.index() as f64 * 30.0
    }

    pub fn element(self) -> Element {
        match self.index() % 4 {
            0 => Element::Fire,
            1 => Element::Earth,
            2 => Element::Air,
            _ => Element::Water,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Sign::Aries => "Aries",
            Sign::Taurus => "Taurus",
            Sign::Gemini => "Gemini",
            Sign::Cancer => "Cancer",
            Sign::Leo => "Leo",
            Sign::Virgo => "Virgo",
            Sign::Libra => "Libra",
            Sign::Scorpio => "Scorpio",
            Sign::Sagittarius => "Sagittarius",
            Sign::Capricorn => "Capricorn",
            Sign::Aquarius => "Aquarius",
            Sign::Pisces => "Pisces",
        }
    }

    pub fn from_name(name: &str) -> Option<Sign> {
        let lower = name.trim().to_lowercase();
        Sign::ALL.iter().copied().find(|s| s.name().to_lowercase() == lower)
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while validating chart data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("{body} appears more than once in the chart")]
    DuplicateBody { body: Body },
    #[error("Longitude for {body} is not a finite number: {value}")]
    InvalidLongitude { body: Body, value: f64 },
    #[error("House {house} for {body} is outside 1..=12")]
    InvalidHouse { body: Body, house: i64 },
    #[error("Invalid house cusp table: {message}")]
    InvalidCusps { message: String },
    #[error("No longitude could be derived for {body}: {message}")]
    MissingLongitude { body: Body, message: String },
    #[error("Invalid birth data: {message}")]
    InvalidBirthData { message: String },
}

/// A body at a longitude, with its derived sign.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetPlacement {
    pub body: Body,
    /// Ecliptic longitude in [0, 360)
    pub longitude: f64,
    pub sign: Sign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub house: Option<u8>,
    pub retrograde: bool,
    /// Daily motion in longitude (degrees per day); 0 when unknown
    pub speed: f64,
}

impl PlanetPlacement {
    pub fn new(body: Body, longitude: f64) -> Self {
        let longitude = normalize_degrees(longitude);
        Self {
            body,
            longitude,
            sign: Sign::from_longitude(longitude),
            house: None,
            retrograde: false,
            speed: 0.0,
        }
    }

    pub fn with_house(mut self, house: u8) -> Self {
        self.house = Some(house);
        self
    }

    pub fn with_retrograde(mut self, retrograde: bool) -> Self {
        self.retrograde = retrograde;
        self
    }

    /// Sets the daily motion; a negative speed also marks the body retrograde.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self.retrograde = speed < 0.0;
        self
    }

    /// Degrees into the sign, 0 <= x < 30.
    pub fn degree_in_sign(&self) -> f64 {
        self.longitude - self.sign.start_longitude()
    }

    fn validate(&self) -> Result<(), ChartError> {
        if !self.longitude.is_finite() {
            return Err(ChartError::InvalidLongitude {
                body: self.body,
                value: self.longitude,
            });
        }
        if let Some(house) = self.house {
            if !(1..=12).contains(&house) {
                return Err(ChartError::InvalidHouse {
                    body: self.body,
                    house: house as i64,
                });
            }
        }
        Ok(())
    }
}

/// House number (1-12) for a longitude given twelve cusps.
pub fn house_for_longitude(longitude: f64, cusps: &[f64; 12]) -> u8 {
    for i in 0..12 {
        let start = cusps[i];
        let end = cusps[(i + 1) % 12];
        let span = normalize_degrees(end - start);
        if normalize_degrees(longitude - start) < span {
            return (i + 1) as u8;
        }
    }
    // Degenerate tables (all cusps equal) fall into the first house
    1
}

/// A natal chart. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NatalChart {
    placements: Vec<PlanetPlacement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birth_instant: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    house_cusps: Option<[f64; 12]>,
}

impl NatalChart {
    /// Validate placements and build a chart. Placements are stored in
    /// canonical body order; missing houses are derived from the cusp table.
    pub fn new(
        placements: Vec<PlanetPlacement>,
        birth_instant: Option<DateTime<FixedOffset>>,
        house_cusps: Option<[f64; 12]>,
    ) -> Result<Self, ChartError> {
        let cusps = match house_cusps {
            Some(c) => {
                if let Some(bad) = c.iter().find(|v| !v.is_finite()) {
                    return Err(ChartError::InvalidCusps {
                        message: format!("non-finite cusp {}", bad),
                    });
                }
                Some(c.map(normalize_degrees))
            }
            None => None,
        };

        let mut seen = [false; MAX_BODIES];
        let mut sorted = Vec::with_capacity(placements.len());
        for mut placement in placements {
            placement.validate()?;
            if seen[placement.body.index()] {
                return Err(ChartError::DuplicateBody {
                    body: placement.body,
                });
            }
            seen[placement.body.index()] = true;
            if placement.house.is_none() {
                if let Some(c) = &cusps {
                    placement.house = Some(house_for_longitude(placement.longitude, c));
                }
            }
            sorted.push(placement);
        }
        sorted.sort_by_key(|p| p.body);

        Ok(Self {
            placements: sorted,
            birth_date: birth_instant.map(|b| b.date_naive()),
            birth_instant,
            house_cusps: cusps,
        })
    }

    /// Record a birth date for charts that have no birth time.
    pub fn with_birth_date(mut self, date: NaiveDate) -> Self {
        if self.birth_instant.is_none() {
            self.birth_date = Some(date);
        }
        self
    }

    pub fn placements(&self) -> &[PlanetPlacement] {
        &self.placements
    }

    pub fn placement(&self, body: Body) -> Option<&PlanetPlacement> {
        self.placements.iter().find(|p| p.body == body)
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
    }

    pub fn birth_instant(&self) -> Option<DateTime<FixedOffset>> {
        self.birth_instant
    }

    pub fn birth_instant_utc(&self) -> Option<DateTime<Utc>> {
        self.birth_instant.map(|b| b.with_timezone(&Utc))
    }

    pub fn house_cusps(&self) -> Option<&[f64; 12]> {
        self.house_cusps.as_ref()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Planetary positions for one calendar date, shared by every user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitSnapshot {
    pub date: NaiveDate,
    /// Instant the positions were evaluated at
    pub instant: DateTime<Utc>,
    pub placements: Vec<PlanetPlacement>,
}

impl TransitSnapshot {
    pub fn placement(&self, body: Body) -> Option<&PlanetPlacement> {
        self.placements.iter().find(|p| p.body == body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(370.0), 10.0);
        assert_eq!(normalize_degrees(-10.0), 350.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert!(normalize_degrees(-1e-15) < 360.0);
    }

    #[test]
    fn test_angular_separation() {
        assert!((angular_separation(0.0, 10.0) - 10.0).abs() < 1e-9);
        assert!((angular_separation(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((angular_separation(0.0, 180.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_signed_difference_wraps() {
        assert!((signed_difference(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((signed_difference(10.0, 350.0) + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_sign_and_element() {
        assert_eq!(Sign::from_longitude(45.0), Sign::Taurus);
        assert_eq!(Sign::from_longitude(359.9), Sign::Pisces);
        assert_eq!(Sign::Leo.element(), Element::Fire);
        assert_eq!(Sign::Capricorn.element(), Element::Earth);
        assert_eq!(Sign::Libra.element(), Element::Air);
        assert_eq!(Sign::Pisces.element(), Element::Water);
    }

    #[test]
    fn test_body_from_id() {
        assert_eq!(Body::from_id("North Node"), Some(Body::NorthNode));
        assert_eq!(Body::from_id("SATURN"), Some(Body::Saturn));
        assert_eq!(Body::from_id("chiron"), None);
    }

    #[test]
    fn test_house_from_cusps() {
        let cusps = [
            350.0, 20.0, 50.0, 80.0, 110.0, 140.0, 170.0, 200.0, 230.0, 260.0, 290.0, 320.0,
        ];
        assert_eq!(house_for_longitude(355.0, &cusps), 1);
        assert_eq!(house_for_longitude(5.0, &cusps), 1);
        assert_eq!(house_for_longitude(25.0, &cusps), 2);
        assert_eq!(house_for_longitude(340.0, &cusps), 12);
    }

    #[test]
    fn test_chart_rejects_duplicates() {
        let result = NatalChart::new(
            vec![
                PlanetPlacement::new(Body::Sun, 10.0),
                PlanetPlacement::new(Body::Sun, 20.0),
            ],
            None,
            None,
        );
        assert_eq!(
            result.unwrap_err(),
            ChartError::DuplicateBody { body: Body::Sun }
        );
    }

    #[test]
    fn test_chart_orders_and_derives_houses() {
        let cusps = [0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0, 210.0, 240.0, 270.0, 300.0, 330.0];
        let chart = NatalChart::new(
            vec![
                PlanetPlacement::new(Body::Saturn, 95.0),
                PlanetPlacement::new(Body::Sun, 400.0),
            ],
            None,
            Some(cusps),
        )
        .unwrap();
        assert_eq!(chart.placements()[0].body, Body::Sun);
        assert_eq!(chart.placements()[0].longitude, 40.0);
        assert_eq!(chart.placements()[0].house, Some(2));
        assert_eq!(chart.placement(Body::Saturn).unwrap().house, Some(4));
    }
}

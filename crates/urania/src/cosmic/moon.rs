use crate::chart::normalize_degrees;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Mean synodic month in days.
pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;

const FULL_MOON_NAMES: [&str; 12] = [
    "Wolf Moon",
    "Snow Moon",
    "Worm Moon",
    "Pink Moon",
    "Flower Moon",
    "Strawberry Moon",
    "Buck Moon",
    "Sturgeon Moon",
    "Harvest Moon",
    "Hunter Moon",
    "Beaver Moon",
    "Cold Moon",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonPhase {
    /// Moon longitude minus Sun longitude, [0, 360)
    pub phase_angle: f64,
    /// Lit fraction of the disc, 0..=1
    pub illumination: f64,
    /// Days since the last new moon
    pub age_days: f64,
    pub name: String,
    /// Within 2 degrees of new, quarter or full
    pub is_significant: bool,
}

impl MoonPhase {
    pub fn from_longitudes(sun: f64, moon: f64, date: NaiveDate) -> Self {
        let phase_angle = normalize_degrees(moon - sun);
        let illumination = (1.0 - phase_angle.to_radians().cos()) / 2.0;
        let age_days = phase_angle / 360.0 * SYNODIC_MONTH_DAYS;

        let is_significant = [0.0, 90.0, 180.0, 270.0, 360.0]
            .iter()
            .any(|p| (phase_angle - p).abs() <= 2.0);

        Self {
            phase_angle,
            illumination,
            age_days,
            name: phase_name(phase_angle, illumination, date).to_string(),
            is_significant,
        }
    }

    pub fn is_waxing(&self) -> bool {
        self.phase_angle < 180.0
    }
}

fn phase_name(angle: f64, illumination: f64, date: NaiveDate) -> &'static str {
    if illumination <= 0.03 {
        "New Moon"
    } else if illumination >= 0.97 {
        FULL_MOON_NAMES[date.month0() as usize]
    } else if (85.0..=95.0).contains(&angle) {
        "First Quarter"
    } else if (265.0..=275.0).contains(&angle) {
        "Third Quarter"
    } else if angle < 90.0 {
        "Waxing Crescent"
    } else if angle < 180.0 {
        "Waxing Gibbous"
    } else if angle < 270.0 {
        "Waning Gibbous"
    } else {
        "Waning Crescent"
    }
}

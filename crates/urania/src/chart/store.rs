//! Chart store boundary.
//!
//! Stored charts arrive as loosely typed JSON rows. They are validated into a
//! [`NatalChart`] here, once, so nothing downstream has to re-check them.

use crate::chart::types::{Body, ChartError, NatalChart, PlanetPlacement, Sign};
use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Chart store backend failed: {message}")]
    Backend { message: String },
    #[error("Stored chart for user {user_id} is malformed: {message}")]
    Malformed { user_id: String, message: String },
    #[error("Stored chart for user {user_id} failed validation: {source}")]
    Invalid {
        user_id: String,
        #[source]
        source: ChartError,
    },
}

/// Read-only access to stored natal charts.
pub trait ChartStore: Send + Sync {
    /// `Ok(None)` when the user has no chart.
    fn load_chart(&self, user_id: &str) -> Result<Option<NatalChart>, StoreError>;
}

/// One placement row as persisted by the profile service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChartRow {
    pub body: String,
    #[serde(default)]
    pub sign: Option<String>,
    #[serde(default)]
    pub degree: Option<f64>,
    #[serde(default)]
    pub minute: Option<f64>,
    #[serde(default)]
    pub ecliptic_longitude: Option<f64>,
    #[serde(default)]
    pub retrograde: Option<bool>,
    #[serde(default)]
    pub house: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBirthData {
    /// `YYYY-MM-DD`
    pub birth_date: String,
    /// `HH:MM` or `HH:MM:SS`; absent for date-only charts
    #[serde(default)]
    pub birth_time: Option<String>,
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChartRecord {
    pub placements: Vec<RawChartRow>,
    #[serde(default)]
    pub birth: Option<RawBirthData>,
    #[serde(default)]
    pub house_cusps: Option<Vec<f64>>,
}

impl RawChartRow {
    /// Returns `Ok(None)` for points the core does not track (ascendant,
    /// chiron, lilith and so on).
    fn into_placement(self) -> Result<Option<PlanetPlacement>, ChartError> {
        let Some(body) = Body::from_id(&self.body) else {
            log::debug!("Skipping untracked chart point '{}'", self.body);
            return Ok(None);
        };

        let longitude = match (self.ecliptic_longitude, self.sign.as_deref(), self.degree) {
            (Some(lon), _, _) => lon,
            (None, Some(sign), Some(degree)) => {
                let sign = Sign::from_name(sign).ok_or_else(|| ChartError::MissingLongitude {
                    body,
                    message: format!("unknown sign '{}'", sign),
                })?;
                sign.start_longitude() + degree + self.minute.unwrap_or(0.0) / 60.0
            }
            _ => {
                return Err(ChartError::MissingLongitude {
                    body,
                    message: "row has neither eclipticLongitude nor sign+degree".to_string(),
                })
            }
        };
        if !longitude.is_finite() {
            return Err(ChartError::InvalidLongitude {
                body,
                value: longitude,
            });
        }

        let mut placement =
            PlanetPlacement::new(body, longitude).with_retrograde(self.retrograde.unwrap_or(false));
        if let Some(house) = self.house {
            if !(1..=12).contains(&house) {
                return Err(ChartError::InvalidHouse { body, house });
            }
            placement = placement.with_house(house as u8);
        }
        Ok(Some(placement))
    }
}

fn parse_birth(
    birth: &RawBirthData,
) -> Result<(NaiveDate, Option<chrono::DateTime<FixedOffset>>), ChartError> {
    let date = NaiveDate::parse_from_str(birth.birth_date.trim(), "%Y-%m-%d").map_err(|e| {
        ChartError::InvalidBirthData {
            message: format!("bad birth date '{}': {}", birth.birth_date, e),
        }
    })?;

    let Some(time_text) = birth.birth_time.as_deref().filter(|t| !t.trim().is_empty()) else {
        return Ok((date, None));
    };
    let time = NaiveTime::parse_from_str(time_text.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time_text.trim(), "%H:%M"))
        .map_err(|e| ChartError::InvalidBirthData {
            message: format!("bad birth time '{}': {}", time_text, e),
        })?;

    let offset_secs = birth.utc_offset_minutes.unwrap_or(0) * 60;
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| ChartError::InvalidBirthData {
        message: format!("utc offset {} minutes out of range", offset_secs / 60),
    })?;
    let instant = offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| ChartError::InvalidBirthData {
            message: "birth instant is ambiguous".to_string(),
        })?;
    Ok((date, Some(instant)))
}

impl TryFrom<RawChartRecord> for NatalChart {
    type Error = ChartError;

    fn try_from(record: RawChartRecord) -> Result<Self, Self::Error> {
        let mut placements = Vec::with_capacity(record.placements.len());
        for row in record.placements {
            if let Some(p) = row.into_placement()? {
                placements.push(p);
            }
        }

        let cusps = match record.house_cusps {
            Some(values) => {
                let table: [f64; 12] =
                    values
                        .try_into()
                        .map_err(|v: Vec<f64>| ChartError::InvalidCusps {
                            message: format!("expected 12 cusps, got {}", v.len()),
                        })?;
                Some(table)
            }
            None => None,
        };

        let (birth_date, birth_instant) = match &record.birth {
            Some(b) => {
                let (date, instant) = parse_birth(b)?;
                (Some(date), instant)
            }
            None => (None, None),
        };

        let chart = NatalChart::new(placements, birth_instant, cusps)?;
        Ok(match birth_date {
            Some(date) => chart.with_birth_date(date),
            None => chart,
        })
    }
}

/// Parse and validate a stored JSON chart record.
pub fn chart_from_json(user_id: &str, json: &str) -> Result<NatalChart, StoreError> {
    let record: RawChartRecord =
        serde_json::from_str(json).map_err(|e| StoreError::Malformed {
            user_id: user_id.to_string(),
            message: e.to_string(),
        })?;
    NatalChart::try_from(record).map_err(|source| StoreError::Invalid {
        user_id: user_id.to_string(),
        source,
    })
}

/// Chart store held in process memory.
#[derive(Default)]
pub struct InMemoryChartStore {
    charts: RwLock<HashMap<String, NatalChart>>,
}

impl InMemoryChartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: impl Into<String>, chart: NatalChart) {
        if let Ok(mut charts) = self.charts.write() {
            charts.insert(user_id.into(), chart);
        }
    }

    /// Validate a raw JSON record and store it.
    pub fn insert_json(&self, user_id: &str, json: &str) -> Result<(), StoreError> {
        let chart = chart_from_json(user_id, json)?;
        self.insert(user_id, chart);
        Ok(())
    }
}

impl ChartStore for InMemoryChartStore {
    fn load_chart(&self, user_id: &str) -> Result<Option<NatalChart>, StoreError> {
        let charts = self.charts.read().map_err(|_| StoreError::Backend {
            message: "chart store lock poisoned".to_string(),
        })?;
        Ok(charts.get(user_id).cloned())
    }
}

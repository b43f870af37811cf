use crate::chart::Body;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Solar,
    Jupiter,
    Saturn,
}

impl ReturnType {
    pub const ALL: [ReturnType; 3] = [ReturnType::Solar, ReturnType::Jupiter, ReturnType::Saturn];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn body(self) -> Body {
        match self {
            ReturnType::Solar => Body::Sun,
            ReturnType::Jupiter => Body::Jupiter,
            ReturnType::Saturn => Body::Saturn,
        }
    }

    pub fn from_body(body: Body) -> Option<ReturnType> {
        ReturnType::ALL.iter().copied().find(|r| r.body() == body)
    }

    /// Sidereal period in days.
    pub fn period_days(self) -> f64 {
        match self {
            ReturnType::Solar => 365.25,
            ReturnType::Jupiter => 4332.59,
            ReturnType::Saturn => 10759.22,
        }
    }

    /// Scan step small enough that a retrograde loop cannot hide a crossing.
    pub fn scan_step_days(self) -> f64 {
        match self {
            ReturnType::Solar => 1.0,
            ReturnType::Jupiter => 4.0,
            ReturnType::Saturn => 8.0,
        }
    }
}

/// Where a return stands relative to the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnPhase {
    Approaching,
    Exact,
    #[serde(alias = "separating")]
    Waning,
}

impl ReturnPhase {
    pub fn from_proximity(proximity_days: i64) -> ReturnPhase {
        if proximity_days.abs() <= 1 {
            ReturnPhase::Exact
        } else if proximity_days > 0 {
            ReturnPhase::Approaching
        } else {
            ReturnPhase::Waning
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetaryReturn {
    pub planet: Body,
    pub return_type: ReturnType,
    pub return_date: DateTime<Utc>,
    /// Whole days from the reference instant, rounded; negative means
    /// already occurred. `return_date` keeps the precise instant.
    pub proximity_days: i64,
    pub phase: ReturnPhase,
    pub is_active: bool,
}

/// Activity windows in days, indexed like [`ReturnType::ALL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnWindows {
    days: [i64; 3],
}

impl ReturnWindows {
    pub fn new(days: [i64; 3]) -> Self {
        Self { days }
    }

    pub fn window(&self, return_type: ReturnType) -> i64 {
        self.days[return_type.index()]
    }
}

impl Default for ReturnWindows {
    fn default() -> Self {
        Self::new([3, 14, 30])
    }
}

use crate::chart::{Body, Element, Sign};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKind {
    Stellium,
    GrandTrine,
    TSquare,
    GrandCross,
    Yod,
    Kite,
}

impl PatternKind {
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Stellium => "stellium",
            PatternKind::GrandTrine => "grand trine",
            PatternKind::TSquare => "T-square",
            PatternKind::GrandCross => "grand cross",
            PatternKind::Yod => "yod",
            PatternKind::Kite => "kite",
        }
    }
}

/// A structural pattern found in a natal chart. Derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatalPattern {
    pub pattern_type: PatternKind,
    /// Involved bodies in canonical order
    pub involved_bodies: Vec<Body>,
    /// T-square apex, yod apex or kite tail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_body: Option<Body>,
    /// Widest constituent orb; `None` for stelliums
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<Sign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
    /// Distinct houses of the involved bodies, ascending
    pub houses: Vec<u8>,
}

impl NatalPattern {
    pub fn is_stellium(&self) -> bool {
        self.pattern_type == PatternKind::Stellium
    }

    pub fn personal_count(&self) -> usize {
        self.involved_bodies
            .iter()
            .filter(|b| b.is_personal())
            .count()
    }

    /// Descending significance: stelliums first (larger, then more personal
    /// planets, sign before house), then configurations by orb, kind and
    /// bodies.
    pub fn significance_cmp(&self, other: &Self) -> Ordering {
        match (self.is_stellium(), other.is_stellium()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => other
                .involved_bodies
                .len()
                .cmp(&self.involved_bodies.len())
                .then(other.personal_count().cmp(&self.personal_count()))
                .then(self.sign.is_none().cmp(&other.sign.is_none()))
                .then(self.involved_bodies.cmp(&other.involved_bodies))
                .then(self.houses.cmp(&other.houses)),
            (false, false) => self
                .orb
                .unwrap_or(0.0)
                .total_cmp(&other.orb.unwrap_or(0.0))
                .then(self.pattern_type.cmp(&other.pattern_type))
                .then(self.involved_bodies.cmp(&other.involved_bodies))
                .then(self.focal_body.cmp(&other.focal_body)),
        }
    }
}

use crate::chart::Body;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aspect kinds the core recognises, major aspects first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectKind {
    Conjunction,
    Opposition,
    Trine,
    Square,
    Sextile,
    /// Minor aspect, 150 degrees
    Quincunx,
}

impl AspectKind {
    pub const ALL: [AspectKind; 6] = [
        AspectKind::Conjunction,
        AspectKind::Opposition,
        AspectKind::Trine,
        AspectKind::Square,
        AspectKind::Sextile,
        AspectKind::Quincunx,
    ];

    pub fn exact_angle(self) -> f64 {
        match self {
            AspectKind::Conjunction => 0.0,
            AspectKind::Opposition => 180.0,
            AspectKind::Trine => 120.0,
            AspectKind::Square => 90.0,
            AspectKind::Sextile => 60.0,
            AspectKind::Quincunx => 150.0,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            AspectKind::Conjunction => "conjunction",
            AspectKind::Opposition => "opposition",
            AspectKind::Trine => "trine",
            AspectKind::Square => "square",
            AspectKind::Sextile => "sextile",
            AspectKind::Quincunx => "quincunx",
        }
    }

    /// Accepts the usual alias "inconjunct" for the quincunx.
    pub fn from_name(name: &str) -> Option<AspectKind> {
        match name.trim().to_lowercase().as_str() {
            "inconjunct" => Some(AspectKind::Quincunx),
            other => AspectKind::ALL.iter().copied().find(|k| k.name() == other),
        }
    }

    pub fn is_major(self) -> bool {
        !matches!(self, AspectKind::Quincunx)
    }
}

impl fmt::Display for AspectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying one angular separation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectMatch {
    pub kind: AspectKind,
    pub exact_angle: f64,
    /// Deviation from the exact angle, in degrees
    pub orb: f64,
}

/// An aspect between two bodies. For transit hits `body_a` is the
/// transiting body and `body_b` the natal one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectHit {
    pub body_a: Body,
    pub body_b: Body,
    pub aspect_type: AspectKind,
    pub exact_angle: f64,
    pub orb: f64,
    pub is_applying: bool,
}

impl AspectHit {
    pub fn from_match(body_a: Body, body_b: Body, m: AspectMatch, is_applying: bool) -> Self {
        Self {
            body_a,
            body_b,
            aspect_type: m.kind,
            exact_angle: m.exact_angle,
            orb: m.orb,
            is_applying,
        }
    }

    /// Within 0.1 degrees of exact.
    pub fn is_exact(&self) -> bool {
        self.orb < 0.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_exactness_threshold() {
        let tight = AspectMatch {
            kind: AspectKind::Trine,
            exact_angle: 120.0,
            orb: 0.05,
        };
        let hit = AspectHit::from_match(Body::Sun, Body::Jupiter, tight, true);
        assert!(hit.is_exact());
        assert_eq!(hit.aspect_type, AspectKind::Trine);

        let loose = AspectMatch { orb: 0.1, ..tight };
        assert!(!AspectHit::from_match(Body::Sun, Body::Jupiter, loose, false).is_exact());
    }
}

use crate::aspects::types::{AspectHit, AspectKind, AspectMatch};
use crate::chart::{angular_separation, signed_difference, PlanetPlacement};
use crate::config::ConfigurationError;

/// Orb table plus the classification built on it.
///
/// An orb of 0 disables that aspect. Enabled ranges may not overlap, so at
/// most one aspect can ever match a separation; ties at a shared boundary go
/// to the tighter orb.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectGeometry {
    orbs: [f64; 6],
    max_orb: f64,
}

const DEFAULT_ORBS: [f64; 6] = [8.0, 8.0, 6.0, 6.0, 4.0, 3.0];

impl AspectGeometry {
    /// Build from orbs indexed like [`AspectKind::ALL`].
    pub fn new(orbs: [f64; 6]) -> Result<Self, ConfigurationError> {
        for kind in AspectKind::ALL {
            let orb = orbs[kind.index()];
            if !orb.is_finite() || orb < 0.0 {
                return Err(ConfigurationError::InvalidOrb {
                    aspect: kind.name().to_string(),
                    value: orb,
                });
            }
        }

        for (i, a) in AspectKind::ALL.iter().enumerate() {
            for b in &AspectKind::ALL[i + 1..] {
                let (orb_a, orb_b) = (orbs[a.index()], orbs[b.index()]);
                if orb_a == 0.0 || orb_b == 0.0 {
                    continue;
                }
                let gap = (a.exact_angle() - b.exact_angle()).abs();
                if gap < orb_a + orb_b {
                    return Err(ConfigurationError::OverlappingOrbs {
                        first: a.name().to_string(),
                        second: b.name().to_string(),
                        gap,
                        combined: orb_a + orb_b,
                    });
                }
            }
        }

        let max_orb = orbs.iter().copied().fold(0.0, f64::max);
        Ok(Self { orbs, max_orb })
    }

    pub fn orb(&self, kind: AspectKind) -> f64 {
        self.orbs[kind.index()]
    }

    pub fn is_enabled(&self, kind: AspectKind) -> bool {
        self.orbs[kind.index()] > 0.0
    }

    /// Widest enabled orb.
    pub fn max_orb(&self) -> f64 {
        self.max_orb
    }

    /// Classify the separation between two longitudes. Symmetric in its
    /// arguments.
    pub fn classify(&self, lon_a: f64, lon_b: f64) -> Option<AspectMatch> {
        self.classify_separation(angular_separation(lon_a, lon_b))
    }

    /// Classify an angular separation already reduced to [0, 180].
    pub fn classify_separation(&self, separation: f64) -> Option<AspectMatch> {
        let mut best: Option<AspectMatch> = None;
        for kind in AspectKind::ALL {
            let orb_limit = self.orbs[kind.index()];
            if orb_limit == 0.0 {
                continue;
            }
            let deviation = (separation - kind.exact_angle()).abs();
            if deviation > orb_limit {
                continue;
            }
            if best.map_or(true, |b| deviation < b.orb) {
                best = Some(AspectMatch {
                    kind,
                    exact_angle: kind.exact_angle(),
                    orb: deviation,
                });
            }
        }
        best
    }

    /// Whether the orb is shrinking right now, from the sign of the relative
    /// daily motion against the signed deviation from exact. An exact aspect
    /// or zero relative motion is not applying.
    pub fn is_applying(
        &self,
        lon_a: f64,
        motion_a: f64,
        lon_b: f64,
        motion_b: f64,
        aspect: &AspectMatch,
    ) -> bool {
        let signed = signed_difference(lon_b, lon_a);
        let deviation = signed.abs() - aspect.exact_angle;
        // Rate of change of the unsigned separation
        let separation_rate = signed.signum() * (motion_a - motion_b);
        deviation * separation_rate < 0.0
    }

    /// Aspects among one set of placements (each unordered pair once),
    /// sorted by orb then body order.
    pub fn aspects_among(&self, placements: &[PlanetPlacement]) -> Vec<AspectHit> {
        let mut hits = Vec::new();
        for i in 0..placements.len() {
            for j in (i + 1)..placements.len() {
                let (a, b) = (&placements[i], &placements[j]);
                if let Some(m) = self.classify(a.longitude, b.longitude) {
                    let applying = self.is_applying(a.longitude, a.speed, b.longitude, b.speed, &m);
                    hits.push(AspectHit::from_match(a.body, b.body, m, applying));
                }
            }
        }
        hits.sort_by(|x, y| {
            x.orb
                .total_cmp(&y.orb)
                .then(x.body_a.cmp(&y.body_a))
                .then(x.body_b.cmp(&y.body_b))
        });
        hits
    }
}

impl Default for AspectGeometry {
    fn default() -> Self {
        let max_orb = DEFAULT_ORBS.iter().copied().fold(0.0, f64::max);
        Self {
            orbs: DEFAULT_ORBS,
            max_orb,
        }
    }
}

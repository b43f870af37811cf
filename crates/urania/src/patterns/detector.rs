use crate::aspects::{AspectGeometry, AspectKind, AspectMatch};
use crate::chart::{Body, Element, NatalChart, Sign, MAX_BODIES};
use crate::patterns::types::{NatalPattern, PatternKind};
use std::collections::HashSet;

/// Placements copied into fixed arrays plus the pairwise aspect matrix.
struct Arena {
    len: usize,
    bodies: [Body; MAX_BODIES],
    signs: [Sign; MAX_BODIES],
    houses: [Option<u8>; MAX_BODIES],
    aspects: [[Option<AspectMatch>; MAX_BODIES]; MAX_BODIES],
}

impl Arena {
    /// Nodes are axis points, not planets, and are left out.
    fn build(chart: &NatalChart, geometry: &AspectGeometry) -> Self {
        let mut arena = Arena {
            len: 0,
            bodies: [Body::Sun; MAX_BODIES],
            signs: [Sign::Aries; MAX_BODIES],
            houses: [None; MAX_BODIES],
            aspects: [[None; MAX_BODIES]; MAX_BODIES],
        };
        let mut longitudes = [0.0_f64; MAX_BODIES];

        for placement in chart.placements().iter().filter(|p| !p.body.is_node()) {
            let i = arena.len;
            arena.bodies[i] = placement.body;
            arena.signs[i] = placement.sign;
            arena.houses[i] = placement.house;
            longitudes[i] = placement.longitude;
            arena.len += 1;
        }

        for i in 0..arena.len {
            for j in (i + 1)..arena.len {
                let m = geometry.classify(longitudes[i], longitudes[j]);
                arena.aspects[i][j] = m;
                arena.aspects[j][i] = m;
            }
        }
        arena
    }

    /// Orb of the aspect between `i` and `j` if it is of `kind`.
    fn orb(&self, i: usize, j: usize, kind: AspectKind) -> Option<f64> {
        self.aspects[i][j].filter(|m| m.kind == kind).map(|m| m.orb)
    }

    fn mask(&self, indices: &[usize]) -> u16 {
        indices
            .iter()
            .fold(0u16, |acc, &i| acc | (1 << self.bodies[i].index()))
    }

    fn pattern(
        &self,
        kind: PatternKind,
        indices: &[usize],
        focal: Option<usize>,
        orb: Option<f64>,
    ) -> NatalPattern {
        let mut bodies: Vec<Body> = indices.iter().map(|&i| self.bodies[i]).collect();
        bodies.sort();
        let mut houses: Vec<u8> = indices.iter().filter_map(|&i| self.houses[i]).collect();
        houses.sort_unstable();
        houses.dedup();

        NatalPattern {
            pattern_type: kind,
            involved_bodies: bodies,
            focal_body: focal.map(|i| self.bodies[i]),
            orb,
            sign: None,
            element: self.shared_element(indices),
            houses,
        }
    }

    fn shared_element(&self, indices: &[usize]) -> Option<Element> {
        let first = self.signs[*indices.first()?].element();
        indices
            .iter()
            .all(|&i| self.signs[i].element() == first)
            .then_some(first)
    }
}

fn max3(a: f64, b: f64, c: f64) -> f64 {
    a.max(b).max(c)
}

/// Detects stelliums and aspect configurations in a natal chart.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    geometry: AspectGeometry,
}

impl PatternDetector {
    pub fn new(geometry: AspectGeometry) -> Self {
        Self { geometry }
    }

    /// All patterns, most significant first. Deterministic for a given chart.
    pub fn detect(&self, chart: &NatalChart) -> Vec<NatalPattern> {
        let arena = Arena::build(chart, &self.geometry);
        let mut seen: HashSet<(PatternKind, u16)> = HashSet::new();
        let mut patterns = Vec::new();

        let mut push = |pattern: NatalPattern, mask: u16, patterns: &mut Vec<NatalPattern>| {
            if seen.insert((pattern.pattern_type, mask)) {
                patterns.push(pattern);
            }
        };

        for (pattern, mask) in stelliums(&arena) {
            push(pattern, mask, &mut patterns);
        }
        for (pattern, mask) in configurations(&arena) {
            push(pattern, mask, &mut patterns);
        }

        patterns.sort_by(|a, b| a.significance_cmp(b));
        log::debug!("Detected {} natal patterns", patterns.len());
        patterns
    }
}

/// Sign stelliums, then house stelliums whose body set differs from every
/// sign stellium.
fn stelliums(arena: &Arena) -> Vec<(NatalPattern, u16)> {
    let mut found = Vec::new();
    let mut sign_masks = Vec::new();

    for sign in Sign::ALL {
        let mut members = [0usize; MAX_BODIES];
        let mut count = 0;
        for i in 0..arena.len {
            if arena.signs[i] == sign {
                members[count] = i;
                count += 1;
            }
        }
        if count >= 3 {
            let indices = &members[..count];
            let mask = arena.mask(indices);
            let mut pattern = arena.pattern(PatternKind::Stellium, indices, None, None);
            pattern.sign = Some(sign);
            pattern.element = Some(sign.element());
            sign_masks.push(mask);
            found.push((pattern, mask));
        }
    }

    for house in 1..=12u8 {
        let mut members = [0usize; MAX_BODIES];
        let mut count = 0;
        for i in 0..arena.len {
            if arena.houses[i] == Some(house) {
                members[count] = i;
                count += 1;
            }
        }
        if count >= 3 {
            let indices = &members[..count];
            let mask = arena.mask(indices);
            if sign_masks.contains(&mask) {
                continue;
            }
            let mut pattern = arena.pattern(PatternKind::Stellium, indices, None, None);
            pattern.element = None;
            found.push((pattern, mask));
        }
    }
    found
}

fn configurations(arena: &Arena) -> Vec<(NatalPattern, u16)> {
    let n = arena.len;
    let mut found = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if let (Some(a), Some(b), Some(c)) = (
                    arena.orb(i, j, AspectKind::Trine),
                    arena.orb(j, k, AspectKind::Trine),
                    arena.orb(i, k, AspectKind::Trine),
                ) {
                    let idx = [i, j, k];
                    let orb = max3(a, b, c);
                    found.push((
                        arena.pattern(PatternKind::GrandTrine, &idx, None, Some(orb)),
                        arena.mask(&idx),
                    ));
                    kites(arena, idx, orb, &mut found);
                }
            }
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if let Some(opp) = arena.orb(i, j, AspectKind::Opposition) {
                for k in (0..n).filter(|&k| k != i && k != j) {
                    if let (Some(a), Some(b)) = (
                        arena.orb(i, k, AspectKind::Square),
                        arena.orb(j, k, AspectKind::Square),
                    ) {
                        let idx = [i, j, k];
                        found.push((
                            arena.pattern(PatternKind::TSquare, &idx, Some(k), Some(max3(opp, a, b))),
                            arena.mask(&idx),
                        ));
                    }
                }
            }

            if let Some(sextile) = arena.orb(i, j, AspectKind::Sextile) {
                for k in (0..n).filter(|&k| k != i && k != j) {
                    if let (Some(a), Some(b)) = (
                        arena.orb(i, k, AspectKind::Quincunx),
                        arena.orb(j, k, AspectKind::Quincunx),
                    ) {
                        let idx = [i, j, k];
                        found.push((
                            arena.pattern(PatternKind::Yod, &idx, Some(k), Some(max3(sextile, a, b))),
                            arena.mask(&idx),
                        ));
                    }
                }
            }
        }
    }

    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                for d in (c + 1)..n {
                    // Three ways to split four bodies into two pairs
                    for (p, q, r, s) in [(a, b, c, d), (a, c, b, d), (a, d, b, c)] {
                        let orbs = [
                            arena.orb(p, q, AspectKind::Opposition),
                            arena.orb(r, s, AspectKind::Opposition),
                            arena.orb(p, r, AspectKind::Square),
                            arena.orb(p, s, AspectKind::Square),
                            arena.orb(q, r, AspectKind::Square),
                            arena.orb(q, s, AspectKind::Square),
                        ];
                        if orbs.iter().all(Option::is_some) {
                            let orb = orbs.iter().flatten().copied().fold(0.0, f64::max);
                            let idx = [a, b, c, d];
                            found.push((
                                arena.pattern(PatternKind::GrandCross, &idx, None, Some(orb)),
                                arena.mask(&idx),
                            ));
                        }
                    }
                }
            }
        }
    }

    found
}

/// A fourth body opposing one trine vertex and sextile the other two.
fn kites(arena: &Arena, trine: [usize; 3], trine_orb: f64, found: &mut Vec<(NatalPattern, u16)>) {
    for tail in (0..arena.len).filter(|t| !trine.contains(t)) {
        for v in 0..3 {
            let (apex, left, right) = (trine[v], trine[(v + 1) % 3], trine[(v + 2) % 3]);
            if let (Some(opp), Some(s1), Some(s2)) = (
                arena.orb(tail, apex, AspectKind::Opposition),
                arena.orb(tail, left, AspectKind::Sextile),
                arena.orb(tail, right, AspectKind::Sextile),
            ) {
                let idx = [trine[0], trine[1], trine[2], tail];
                let orb = trine_orb.max(max3(opp, s1, s2));
                found.push((
                    arena.pattern(PatternKind::Kite, &idx, Some(tail), Some(orb)),
                    arena.mask(&idx),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::PlanetPlacement;

    fn chart(rows: &[(Body, f64)]) -> NatalChart {
        NatalChart::new(
            rows.iter()
                .map(|&(b, lon)| PlanetPlacement::new(b, lon))
                .collect(),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_t_square_has_apex_focal() {
        let chart = chart(&[(Body::Sun, 0.0), (Body::Moon, 180.0), (Body::Mars, 92.0)]);
        let patterns = PatternDetector::default().detect(&chart);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_type, PatternKind::TSquare);
        assert_eq!(patterns[0].focal_body, Some(Body::Mars));
        assert!((patterns[0].orb.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_grand_cross_also_yields_t_squares() {
        let chart = chart(&[
            (Body::Sun, 0.0),
            (Body::Moon, 90.0),
            (Body::Mars, 180.0),
            (Body::Saturn, 270.0),
        ]);
        let patterns = PatternDetector::default().detect(&chart);
        let crosses = patterns
            .iter()
            .filter(|p| p.pattern_type == PatternKind::GrandCross)
            .count();
        let t_squares = patterns
            .iter()
            .filter(|p| p.pattern_type == PatternKind::TSquare)
            .count();
        assert_eq!(crosses, 1);
        assert_eq!(t_squares, 4);
    }

    #[test]
    fn test_yod_apex() {
        let chart = chart(&[(Body::Venus, 0.0), (Body::Jupiter, 60.0), (Body::Pluto, 210.0)]);
        let patterns = PatternDetector::default().detect(&chart);
        let yod = patterns
            .iter()
            .find(|p| p.pattern_type == PatternKind::Yod)
            .unwrap();
        assert_eq!(yod.focal_body, Some(Body::Pluto));
    }

    #[test]
    fn test_kite_tail() {
        let chart = chart(&[
            (Body::Sun, 0.0),
            (Body::Moon, 120.0),
            (Body::Mars, 240.0),
            (Body::Saturn, 180.0),
        ]);
        let patterns = PatternDetector::default().detect(&chart);
        let kite = patterns
            .iter()
            .find(|p| p.pattern_type == PatternKind::Kite)
            .unwrap();
        assert_eq!(kite.focal_body, Some(Body::Saturn));
        assert_eq!(kite.involved_bodies.len(), 4);
    }

    #[test]
    fn test_nodes_are_not_planets() {
        let chart = chart(&[
            (Body::Sun, 44.0),
            (Body::Moon, 46.0),
            (Body::NorthNode, 45.0),
        ]);
        assert!(PatternDetector::default().detect(&chart).is_empty());
    }

    #[test]
    fn test_house_stellium_matching_sign_is_suppressed() {
        let placements = vec![
            PlanetPlacement::new(Body::Sun, 40.0).with_house(2),
            PlanetPlacement::new(Body::Mercury, 45.0).with_house(2),
            PlanetPlacement::new(Body::Venus, 50.0).with_house(2),
            PlanetPlacement::new(Body::Mars, 62.0).with_house(2),
        ];
        let chart = NatalChart::new(placements, None, None).unwrap();
        let stelliums: Vec<_> = PatternDetector::default()
            .detect(&chart)
            .into_iter()
            .filter(|p| p.is_stellium())
            .collect();
        // Taurus holds three, house 2 holds four: both survive, house first
        assert_eq!(stelliums.len(), 2);
        assert_eq!(stelliums[0].involved_bodies.len(), 4);
        assert_eq!(stelliums[0].sign, None);
        assert_eq!(stelliums[1].sign, Some(Sign::Taurus));

        let same = vec![
            PlanetPlacement::new(Body::Sun, 40.0).with_house(2),
            PlanetPlacement::new(Body::Mercury, 45.0).with_house(2),
            PlanetPlacement::new(Body::Venus, 50.0).with_house(2),
        ];
        let chart = NatalChart::new(same, None, None).unwrap();
        let patterns = PatternDetector::default().detect(&chart);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].sign, Some(Sign::Taurus));
        assert_eq!(patterns[0].houses, vec![2]);
    }
}

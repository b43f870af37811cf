//! Transiting-to-natal aspects.

use crate::aspects::{AspectGeometry, AspectHit};
use crate::chart::{NatalChart, PlanetPlacement, TransitSnapshot};

/// Transit hits for one chart, sorted by orb, with the top-N cut kept
/// separate from the full list.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalTransits {
    hits: Vec<AspectHit>,
    top_n: usize,
}

impl PersonalTransits {
    /// The tightest `top_n` hits.
    pub fn top(&self) -> &[AspectHit] {
        &self.hits[..self.hits.len().min(self.top_n)]
    }

    pub fn all(&self) -> &[AspectHit] {
        &self.hits
    }

    pub fn into_all(self) -> Vec<AspectHit> {
        self.hits
    }

    pub fn into_top(mut self) -> Vec<AspectHit> {
        self.hits.truncate(self.top_n);
        self.hits
    }
}

/// Daily motion for the applying test. Providers that report no speed fall
/// back to the body's mean motion, signed by the retrograde flag.
fn daily_motion(placement: &PlanetPlacement) -> f64 {
    if placement.speed != 0.0 {
        return placement.speed;
    }
    let mean = placement.body.mean_daily_motion().abs();
    if placement.retrograde {
        -mean
    } else {
        mean
    }
}

#[derive(Debug, Clone)]
pub struct TransitPersonalizer {
    geometry: AspectGeometry,
    top_n: usize,
}

impl TransitPersonalizer {
    pub fn new(geometry: AspectGeometry, top_n: usize) -> Self {
        Self { geometry, top_n }
    }

    /// Every transiting body against every natal body, same body included.
    /// Hits are directional: `body_a` is always the transiting body.
    pub fn personalize(&self, chart: &NatalChart, transits: &TransitSnapshot) -> PersonalTransits {
        let mut hits = Vec::new();
        for transit in &transits.placements {
            let motion = daily_motion(transit);
            for natal in chart.placements() {
                if let Some(m) = self.geometry.classify(transit.longitude, natal.longitude) {
                    let applying =
                        self.geometry
                            .is_applying(transit.longitude, motion, natal.longitude, 0.0, &m);
                    hits.push(AspectHit::from_match(transit.body, natal.body, m, applying));
                }
            }
        }

        hits.sort_by(|x, y| {
            x.orb
                .total_cmp(&y.orb)
                .then(x.body_a.cmp(&y.body_a))
                .then(x.body_b.cmp(&y.body_b))
        });
        PersonalTransits {
            hits,
            top_n: self.top_n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspects::AspectKind;
    use crate::chart::Body;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn snapshot(rows: &[(Body, f64, f64)]) -> TransitSnapshot {
        TransitSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            instant: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            placements: rows
                .iter()
                .map(|&(b, lon, speed)| PlanetPlacement::new(b, lon).with_speed(speed))
                .collect(),
        }
    }

    #[test]
    fn test_hits_are_directional_and_sorted() {
        let chart = NatalChart::new(
            vec![
                PlanetPlacement::new(Body::Sun, 10.0),
                PlanetPlacement::new(Body::Moon, 95.0),
            ],
            None,
            None,
        )
        .unwrap();
        let sky = snapshot(&[(Body::Saturn, 13.0, 0.03), (Body::Mars, 96.0, 0.6)]);

        let result = TransitPersonalizer::new(AspectGeometry::default(), 3).personalize(&chart, &sky);
        let all = result.all();
        assert_eq!(all[0].body_a, Body::Mars);
        assert_eq!(all[0].body_b, Body::Moon);
        assert_eq!(all[0].aspect_type, AspectKind::Conjunction);
        assert!(!all[0].is_applying);
        assert_eq!(all.len(), 3);
        assert_eq!((all[1].body_a, all[1].body_b), (Body::Saturn, Body::Sun));
        assert!(!all[1].is_applying);
        assert_eq!(all[2].aspect_type, AspectKind::Square);
        assert!(all[2].is_applying);
        assert!(all.windows(2).all(|w| w[0].orb <= w[1].orb));
    }

    #[test]
    fn test_same_body_transit_counts() {
        let chart = NatalChart::new(vec![PlanetPlacement::new(Body::Sun, 10.0)], None, None).unwrap();
        let sky = snapshot(&[(Body::Sun, 8.0, 0.98)]);
        let result = TransitPersonalizer::new(AspectGeometry::default(), 3).personalize(&chart, &sky);
        assert_eq!(result.all().len(), 1);
        assert!(result.all()[0].is_applying);
    }

    #[test]
    fn test_top_n_cut() {
        let chart = NatalChart::new(vec![PlanetPlacement::new(Body::Sun, 0.0)], None, None).unwrap();
        let sky = snapshot(&[
            (Body::Moon, 1.0, 13.0),
            (Body::Mercury, 2.0, 1.0),
            (Body::Venus, 3.0, 1.0),
            (Body::Mars, 4.0, 0.5),
        ]);
        let result = TransitPersonalizer::new(AspectGeometry::default(), 3).personalize(&chart, &sky);
        assert_eq!(result.all().len(), 4);
        assert_eq!(result.top().len(), 3);
        assert_eq!(result.top()[0].body_a, Body::Moon);
    }

    #[test]
    fn test_zero_speed_uses_mean_motion() {
        let retro = PlanetPlacement::new(Body::Jupiter, 5.0).with_retrograde(true);
        assert!(daily_motion(&retro) < 0.0);
        let direct = PlanetPlacement::new(Body::Venus, 5.0);
        assert!(daily_motion(&direct) > 0.0);
        let measured = PlanetPlacement::new(Body::Venus, 5.0).with_speed(-0.4);
        assert_eq!(daily_motion(&measured), -0.4);
    }
}

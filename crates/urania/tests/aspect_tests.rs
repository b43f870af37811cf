use proptest::prelude::*;
use urania::chart::{angular_separation, normalize_degrees};
use urania::{AspectGeometry, AspectKind};

#[test]
fn test_classify_conjunction() {
    let geometry = AspectGeometry::default();
    let aspect = geometry.classify(100.0, 102.0).unwrap();
    assert_eq!(aspect.kind, AspectKind::Conjunction);
    assert_eq!(aspect.exact_angle, 0.0);
    assert!((aspect.orb - 2.0).abs() < 1e-9);
}

#[test]
fn test_classify_opposition_across_aries_point() {
    let geometry = AspectGeometry::default();
    // 100 and 278 are 178 degrees apart
    let aspect = geometry.classify(100.0, 278.0).unwrap();
    assert_eq!(aspect.kind, AspectKind::Opposition);
    assert!((aspect.orb - 2.0).abs() < 1e-9);
}

#[test]
fn test_classify_outside_every_orb() {
    let geometry = AspectGeometry::default();
    for gap in [20.0, 45.0, 75.0, 105.0, 135.0, 165.0] {
        assert!(geometry.classify(10.0, 10.0 + gap).is_none(), "gap {}", gap);
    }
}

#[test]
fn test_orb_table_per_kind() {
    let geometry = AspectGeometry::default();
    assert_eq!(geometry.orb(AspectKind::Conjunction), 8.0);
    assert_eq!(geometry.orb(AspectKind::Trine), 6.0);
    assert_eq!(geometry.orb(AspectKind::Sextile), 4.0);
    assert_eq!(geometry.orb(AspectKind::Quincunx), 3.0);
}

proptest! {
    #[test]
    fn prop_classify_is_symmetric(a in 0.0..360.0f64, b in 0.0..360.0f64) {
        let geometry = AspectGeometry::default();
        prop_assert_eq!(geometry.classify(a, b), geometry.classify(b, a));
    }

    #[test]
    fn prop_classify_is_deterministic(a in -720.0..720.0f64, b in -720.0..720.0f64) {
        let geometry = AspectGeometry::default();
        prop_assert_eq!(geometry.classify(a, b), geometry.classify(a, b));
    }

    #[test]
    fn prop_match_is_within_orb(a in 0.0..360.0f64, b in 0.0..360.0f64) {
        let geometry = AspectGeometry::default();
        if let Some(m) = geometry.classify(a, b) {
            let separation = angular_separation(a, b);
            prop_assert!((separation - m.exact_angle).abs() <= geometry.orb(m.kind) + 1e-9);
            prop_assert!((m.orb - (separation - m.exact_angle).abs()).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_separation_range(a in -1e4..1e4f64, b in -1e4..1e4f64) {
        let separation = angular_separation(a, b);
        prop_assert!((0.0..=180.0).contains(&separation));
        let n = normalize_degrees(a);
        prop_assert!((0.0..360.0).contains(&n));
    }
}

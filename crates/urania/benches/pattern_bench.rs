use criterion::{black_box, criterion_group, criterion_main, Criterion};
use urania::{Body, NatalChart, PatternDetector, PlanetPlacement};

fn bench_detect(c: &mut Criterion) {
    let detector = PatternDetector::default();
    let longitudes = [
        (Body::Sun, 0.0),
        (Body::Moon, 120.0),
        (Body::Mercury, 4.0),
        (Body::Venus, 240.0),
        (Body::Mars, 90.0),
        (Body::Jupiter, 180.0),
        (Body::Saturn, 270.0),
        (Body::Uranus, 150.0),
        (Body::Neptune, 210.0),
        (Body::Pluto, 60.0),
    ];
    let chart = NatalChart::new(
        longitudes
            .iter()
            .map(|&(body, lon)| PlanetPlacement::new(body, lon))
            .collect(),
        None,
        None,
    )
    .unwrap();

    c.bench_function("detect_patterns", |b| {
        b.iter(|| detector.detect(black_box(&chart)))
    });
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);

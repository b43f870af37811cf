use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use urania::chart::TransitSnapshot;
use urania::{
    AstronomyError, AstronomyProvider, Body, CacheError, CacheState, CoreConfig, CosmicDataCache,
    FixedClock, MeanMotionEphemeris,
};

/// Counts full-sky computations and can fail the first few of them.
struct CountingProvider {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
}

impl CountingProvider {
    fn new(failures: usize, delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(failures),
            delay,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AstronomyProvider for CountingProvider {
    fn longitude_at(&self, body: Body, instant: DateTime<Utc>) -> Result<f64, AstronomyError> {
        MeanMotionEphemeris.longitude_at(body, instant)
    }

    fn position(&self, date: NaiveDate) -> Result<TransitSnapshot, AstronomyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AstronomyError::Unavailable {
                message: "ephemeris files not mounted".to_string(),
            });
        }
        MeanMotionEphemeris.position(date)
    }
}

fn config() -> CoreConfig {
    CoreConfig {
        retry_backoff: Duration::from_millis(5),
        ..CoreConfig::default()
    }
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 15, 8, 0, 0).unwrap(),
    ))
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_computation() {
    let provider = Arc::new(CountingProvider::new(0, Duration::from_millis(50)));
    let cache = Arc::new(CosmicDataCache::new(provider.clone(), clock(), &config()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move { cache.get_or_compute(date(15)).await }));
    }
    let mut snapshots = Vec::new();
    for handle in handles {
        snapshots.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(provider.calls(), 1);
    assert!(snapshots.iter().all(|s| Arc::ptr_eq(s, &snapshots[0])));
    assert_eq!(cache.state(date(15)), CacheState::Cached);
}

#[tokio::test]
async fn test_cached_date_is_not_recomputed() {
    let provider = Arc::new(CountingProvider::new(0, Duration::ZERO));
    let cache = CosmicDataCache::new(provider.clone(), clock(), &config());

    assert_eq!(cache.state(date(1)), CacheState::Uncomputed);
    let first = cache.get_or_compute(date(1)).await.unwrap();
    let second = cache.get_or_compute(date(1)).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.calls(), 1);
    assert_eq!(first.date, date(1));
    assert_eq!(first.transits.placements.len(), Body::ALL.len());
}

#[tokio::test]
async fn test_transient_failure_is_retried_once() {
    let provider = Arc::new(CountingProvider::new(1, Duration::ZERO));
    let cache = CosmicDataCache::new(provider.clone(), clock(), &config());

    assert!(cache.get_or_compute(date(2)).await.is_ok());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_failure_releases_claim() {
    let provider = Arc::new(CountingProvider::new(2, Duration::ZERO));
    let cache = CosmicDataCache::new(provider.clone(), clock(), &config());

    let err = cache.get_or_compute(date(3)).await.unwrap_err();
    assert!(matches!(err, CacheError::Compute { date: d, .. } if d == date(3)));
    assert_eq!(cache.state(date(3)), CacheState::Uncomputed);

    // The next caller starts a fresh computation
    assert!(cache.get_or_compute(date(3)).await.is_ok());
    assert_eq!(provider.calls(), 3);
    assert_eq!(cache.state(date(3)), CacheState::Cached);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiters_receive_leader_failure() {
    let provider = Arc::new(CountingProvider::new(2, Duration::from_millis(30)));
    let cache = Arc::new(CosmicDataCache::new(provider.clone(), clock(), &config()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move { cache.get_or_compute(date(4)).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_invalidate_forces_recompute() {
    let provider = Arc::new(CountingProvider::new(0, Duration::ZERO));
    let cache = CosmicDataCache::new(provider.clone(), clock(), &config());

    let first = cache.get_or_compute(date(5)).await.unwrap();
    assert!(cache.invalidate(date(5)));
    assert!(!cache.invalidate(date(5)));
    let second = cache.get_or_compute(date(5)).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_prune_drops_old_dates() {
    let provider = Arc::new(CountingProvider::new(0, Duration::ZERO));
    let clock = clock();
    let long_retention = CoreConfig {
        retention_days: 365,
        ..config()
    };
    let cache = CosmicDataCache::new(provider, clock.clone(), &long_retention);

    for d in [1, 7, 8, 14, 15] {
        cache.get_or_compute(date(d)).await.unwrap();
    }
    assert_eq!(cache.len(), 5);

    // Today is June 15; a 7 day retention keeps June 8 onwards
    assert_eq!(cache.prune(7), 2);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.state(date(7)), CacheState::Uncomputed);
    assert_eq!(cache.state(date(8)), CacheState::Cached);

    clock.set(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
    assert_eq!(cache.prune(7), 3);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_new_snapshots_evict_dates_past_retention() {
    let provider = Arc::new(CountingProvider::new(0, Duration::ZERO));
    let clock = clock();
    let cache = CosmicDataCache::new(provider.clone(), clock.clone(), &config());
    assert_eq!(cache.retention_days(), 7);

    // A historical date is kept right after it is computed
    cache.get_or_compute(date(1)).await.unwrap();
    assert_eq!(cache.state(date(1)), CacheState::Cached);

    cache.get_or_compute(date(10)).await.unwrap();
    cache.get_or_compute(date(15)).await.unwrap();
    assert_eq!(cache.state(date(1)), CacheState::Uncomputed);
    assert_eq!(cache.len(), 2);

    // Time moves on; the next fresh snapshot sweeps out June 10
    clock.set(Utc.with_ymd_and_hms(2024, 6, 20, 8, 0, 0).unwrap());
    cache.get_or_compute(date(20)).await.unwrap();
    assert_eq!(cache.state(date(10)), CacheState::Uncomputed);
    assert_eq!(cache.state(date(15)), CacheState::Cached);
    assert_eq!(cache.len(), 2);

    // Hits do not sweep
    cache.get_or_compute(date(15)).await.unwrap();
    assert_eq!(provider.calls(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_leader_releases_claim() {
    let provider = Arc::new(CountingProvider::new(0, Duration::from_millis(150)));
    let cache = CosmicDataCache::new(provider.clone(), clock(), &config());

    let cancelled = tokio::time::timeout(Duration::from_millis(20), cache.get_or_compute(date(6))).await;
    assert!(cancelled.is_err());
    assert_eq!(cache.state(date(6)), CacheState::Uncomputed);

    assert!(cache.get_or_compute(date(6)).await.is_ok());
    assert_eq!(provider.calls(), 2);
    assert_eq!(cache.state(date(6)), CacheState::Cached);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_waiter_takes_over_from_cancelled_leader() {
    let provider = Arc::new(CountingProvider::new(0, Duration::from_millis(150)));
    let cache = Arc::new(CosmicDataCache::new(provider.clone(), clock(), &config()));

    let leader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get_or_compute(date(9)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(cache.state(date(9)), CacheState::Computing);

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get_or_compute(date(9)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    let snapshot = waiter.await.unwrap().unwrap();
    assert_eq!(snapshot.date, date(9));
    assert_eq!(provider.calls(), 2);
    assert_eq!(cache.state(date(9)), CacheState::Cached);
}

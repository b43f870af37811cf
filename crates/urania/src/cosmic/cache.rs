//! Single-flight memoization of the daily cosmic snapshot.
//!
//! Each date moves Uncomputed -> Computing -> Cached. The first caller for a
//! missing date becomes the leader and computes on the blocking pool; every
//! other caller for that date waits on the leader's watch channel. A failed
//! or cancelled leader releases the date so the next caller starts over.

use crate::aspects::AspectGeometry;
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::cosmic::snapshot::{compute_snapshot, CosmicSnapshot};
use crate::ephemeris::{AstronomyError, AstronomyProvider};
use chrono::{Duration as ChronoDuration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cosmic data for {date} could not be computed: {source}")]
    Compute {
        date: NaiveDate,
        #[source]
        source: AstronomyError,
    },
    #[error("Cosmic computation for {date} was aborted: {message}")]
    Aborted { date: NaiveDate, message: String },
}

/// Observable state of one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Uncomputed,
    Computing,
    Cached,
}

#[derive(Debug, Clone)]
enum Flight {
    Pending,
    Done(Arc<CosmicSnapshot>),
    Failed(CacheError),
}

enum Slot {
    Computing {
        claim: u64,
        result: watch::Receiver<Flight>,
    },
    Cached(Arc<CosmicSnapshot>),
}

type Slots = Mutex<HashMap<NaiveDate, Slot>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<NaiveDate, Slot>> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases a leader's claim if it is dropped before publishing.
struct ClaimGuard<'a> {
    slots: &'a Slots,
    date: NaiveDate,
    claim: u64,
    armed: bool,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slots = lock(self.slots);
        if matches!(slots.get(&self.date), Some(Slot::Computing { claim, .. }) if *claim == self.claim)
        {
            slots.remove(&self.date);
            log::warn!("Cosmic computation for {} cancelled; claim released", self.date);
        }
    }
}

enum Role {
    Lead(u64, watch::Sender<Flight>),
    Wait(watch::Receiver<Flight>),
}

pub struct CosmicDataCache {
    provider: Arc<dyn AstronomyProvider>,
    clock: Arc<dyn Clock>,
    geometry: AspectGeometry,
    retry_backoff: Duration,
    retention_days: u32,
    slots: Slots,
    next_claim: AtomicU64,
}

impl CosmicDataCache {
    pub fn new(
        provider: Arc<dyn AstronomyProvider>,
        clock: Arc<dyn Clock>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            geometry: config.geometry.clone(),
            retry_backoff: config.retry_backoff,
            retention_days: config.retention_days,
            slots: Mutex::new(HashMap::new()),
            next_claim: AtomicU64::new(1),
        }
    }

    /// Snapshot for `date`, computing it at most once across concurrent
    /// callers.
    pub async fn get_or_compute(&self, date: NaiveDate) -> Result<Arc<CosmicSnapshot>, CacheError> {
        loop {
            let role = {
                let mut slots = lock(&self.slots);
                match slots.get(&date) {
                    Some(Slot::Cached(snapshot)) => {
                        log::debug!("Cosmic cache hit for {}", date);
                        return Ok(Arc::clone(snapshot));
                    }
                    Some(Slot::Computing { result, .. }) => Role::Wait(result.clone()),
                    None => {
                        let claim = self.next_claim.fetch_add(1, Ordering::Relaxed);
                        let (tx, rx) = watch::channel(Flight::Pending);
                        slots.insert(date, Slot::Computing { claim, result: rx });
                        Role::Lead(claim, tx)
                    }
                }
            };

            match role {
                Role::Lead(claim, tx) => return self.lead(date, claim, tx).await,
                Role::Wait(mut rx) => {
                    log::debug!("Waiting on in-flight cosmic computation for {}", date);
                    let outcome = rx
                        .wait_for(|flight| !matches!(flight, Flight::Pending))
                        .await
                        .map(|flight| flight.clone());
                    match outcome {
                        Ok(Flight::Done(snapshot)) => return Ok(snapshot),
                        Ok(Flight::Failed(e)) => return Err(e),
                        // Leader vanished without publishing; take another turn.
                        Ok(Flight::Pending) | Err(_) => continue,
                    }
                }
            }
        }
    }

    async fn lead(
        &self,
        date: NaiveDate,
        claim: u64,
        tx: watch::Sender<Flight>,
    ) -> Result<Arc<CosmicSnapshot>, CacheError> {
        let mut guard = ClaimGuard {
            slots: &self.slots,
            date,
            claim,
            armed: true,
        };
        log::info!("Computing cosmic snapshot for {}", date);

        let result = self.compute_with_retry(date).await.map(Arc::new);

        {
            let mut slots = lock(&self.slots);
            let still_ours = matches!(
                slots.get(&date),
                Some(Slot::Computing { claim: c, .. }) if *c == claim
            );
            match &result {
                Ok(snapshot) => {
                    if still_ours {
                        slots.insert(date, Slot::Cached(Arc::clone(snapshot)));
                    }
                    tx.send_replace(Flight::Done(Arc::clone(snapshot)));
                }
                Err(e) => {
                    if still_ours {
                        slots.remove(&date);
                    }
                    log::warn!("Cosmic snapshot for {} failed: {}", date, e);
                    tx.send_replace(Flight::Failed(e.clone()));
                }
            }
        }
        guard.armed = false;
        if result.is_ok() {
            self.evict_expired(date);
        }
        result
    }

    /// One retry after the configured backoff.
    async fn compute_with_retry(&self, date: NaiveDate) -> Result<CosmicSnapshot, CacheError> {
        match self.compute_once(date).await {
            Ok(snapshot) => Ok(snapshot),
            Err(first) => {
                log::warn!(
                    "Cosmic computation for {} failed ({}); retrying in {:?}",
                    date,
                    first,
                    self.retry_backoff
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.compute_once(date).await
            }
        }
    }

    async fn compute_once(&self, date: NaiveDate) -> Result<CosmicSnapshot, CacheError> {
        let provider = Arc::clone(&self.provider);
        let geometry = self.geometry.clone();
        let joined = tokio::task::spawn_blocking(move || {
            compute_snapshot(provider.as_ref(), &geometry, date)
        })
        .await;

        match joined {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(source)) => Err(CacheError::Compute { date, source }),
            Err(join_error) => Err(CacheError::Aborted {
                date,
                message: join_error.to_string(),
            }),
        }
    }

    /// Drop the entry for `date`. Callers already waiting on an in-flight
    /// computation still receive its result; later callers recompute.
    pub fn invalidate(&self, date: NaiveDate) -> bool {
        let removed = lock(&self.slots).remove(&date).is_some();
        if removed {
            log::info!("Invalidated cosmic snapshot for {}", date);
        }
        removed
    }

    /// Remove cached snapshots older than `retention_days` before today.
    /// Returns how many were dropped.
    pub fn prune(&self, retention_days: u32) -> usize {
        self.prune_except(retention_days, None)
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Runs after every fresh snapshot with the configured retention. The
    /// date just computed stays even when it is older than the horizon.
    fn evict_expired(&self, keep: NaiveDate) {
        self.prune_except(self.retention_days, Some(keep));
    }

    fn prune_except(&self, retention_days: u32, keep: Option<NaiveDate>) -> usize {
        let today = self.clock.now().date_naive();
        let horizon = today - ChronoDuration::days(i64::from(retention_days));
        let mut slots = lock(&self.slots);
        let before = slots.len();
        slots.retain(|date, slot| {
            matches!(slot, Slot::Computing { .. }) || *date >= horizon || Some(*date) == keep
        });
        let pruned = before - slots.len();
        if pruned > 0 {
            log::debug!("Pruned {} cosmic snapshots older than {}", pruned, horizon);
        }
        pruned
    }

    pub fn state(&self, date: NaiveDate) -> CacheState {
        match lock(&self.slots).get(&date) {
            None => CacheState::Uncomputed,
            Some(Slot::Computing { .. }) => CacheState::Computing,
            Some(Slot::Cached(_)) => CacheState::Cached,
        }
    }

    /// Number of dates held, cached or in flight.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

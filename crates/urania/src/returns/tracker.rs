use crate::chart::{signed_difference, NatalChart};
use crate::ephemeris::{AstronomyError, AstronomyProvider};
use crate::returns::types::{PlanetaryReturn, ReturnPhase, ReturnType, ReturnWindows};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Horizon searched on each side of the reference instant, in periods.
const HORIZON_PERIODS: f64 = 1.1;
/// Crossings closer to birth than this many periods are the natal position
/// itself, not a return.
const BIRTH_EXCLUSION_PERIODS: f64 = 0.5;
const BISECTION_ITERATIONS: usize = 40;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReturnError {
    #[error("Chart has no birth instant; returns cannot be located")]
    MissingBirthInstant,
    #[error(transparent)]
    Astronomy(#[from] AstronomyError),
}

/// Outcome of scanning one tracked planet.
pub type ReturnScan = (ReturnType, Result<Option<PlanetaryReturn>, AstronomyError>);

/// Locates Sun, Jupiter and Saturn returns around a reference instant.
#[derive(Debug, Clone, Default)]
pub struct ReturnTracker {
    windows: ReturnWindows,
}

fn offset_days(instant: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    instant + Duration::milliseconds((days * MILLIS_PER_DAY) as i64)
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

impl ReturnTracker {
    pub fn new(windows: ReturnWindows) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &ReturnWindows {
        &self.windows
    }

    /// One entry per tracked planet present in the chart. Planets whose scan
    /// fails are dropped; use [`ReturnTracker::scan_returns`] to see why.
    pub fn compute_returns(
        &self,
        provider: &dyn AstronomyProvider,
        chart: &NatalChart,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<PlanetaryReturn>, ReturnError> {
        let scanned = self.scan_returns(provider, chart, as_of)?;
        Ok(scanned
            .into_iter()
            .filter_map(|(_, result)| result.ok().flatten())
            .collect())
    }

    /// Per-planet scan results. `Ok(None)` means no crossing inside the
    /// horizon on either side, which only happens for very young charts.
    pub fn scan_returns(
        &self,
        provider: &dyn AstronomyProvider,
        chart: &NatalChart,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ReturnScan>, ReturnError> {
        let birth = chart
            .birth_instant_utc()
            .ok_or(ReturnError::MissingBirthInstant)?;

        let mut results = Vec::with_capacity(ReturnType::ALL.len());
        for return_type in ReturnType::ALL {
            let Some(natal) = chart.placement(return_type.body()) else {
                continue;
            };
            let result = self.locate(provider, return_type, natal.longitude, birth, as_of);
            if let Err(e) = &result {
                log::warn!("{:?} return scan failed: {}", return_type, e);
            }
            results.push((return_type, result));
        }
        Ok(results)
    }

    fn locate(
        &self,
        provider: &dyn AstronomyProvider,
        return_type: ReturnType,
        natal_longitude: f64,
        birth: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Result<Option<PlanetaryReturn>, AstronomyError> {
        let next = self.scan(provider, return_type, natal_longitude, birth, as_of, 1.0)?;
        let previous = self.scan(provider, return_type, natal_longitude, birth, as_of, -1.0)?;

        let nearest = match (previous, next) {
            (Some(p), Some(n)) => {
                if days_between(as_of, n).abs() < days_between(as_of, p).abs() {
                    Some(n)
                } else {
                    Some(p)
                }
            }
            (p, n) => p.or(n),
        };

        Ok(nearest.map(|return_date| self.describe(return_type, return_date, as_of)))
    }

    /// Build the entry for an exact return seen from `as_of`. Proximity is
    /// rounded to whole days before phase and activity are derived from it.
    pub fn describe(
        &self,
        return_type: ReturnType,
        return_date: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> PlanetaryReturn {
        let proximity_days = days_between(as_of, return_date).round() as i64;
        PlanetaryReturn {
            planet: return_type.body(),
            return_type,
            return_date,
            proximity_days,
            phase: ReturnPhase::from_proximity(proximity_days),
            is_active: proximity_days.abs() <= self.windows.window(return_type),
        }
    }

    /// Walk away from `as_of` in `direction` (+1 forward, -1 backward) and
    /// return the first valid crossing of the natal longitude.
    fn scan(
        &self,
        provider: &dyn AstronomyProvider,
        return_type: ReturnType,
        natal_longitude: f64,
        birth: DateTime<Utc>,
        as_of: DateTime<Utc>,
        direction: f64,
    ) -> Result<Option<DateTime<Utc>>, AstronomyError> {
        let body = return_type.body();
        let period = return_type.period_days();
        let step = return_type.scan_step_days() * direction;
        let horizon = period * HORIZON_PERIODS;
        let earliest = offset_days(birth, period * BIRTH_EXCLUSION_PERIODS);

        let diff = |t: DateTime<Utc>| -> Result<f64, AstronomyError> {
            Ok(signed_difference(natal_longitude, provider.longitude_at(body, t)?))
        };

        let mut t0 = as_of;
        let mut f0 = diff(t0)?;
        let mut travelled = 0.0;
        while travelled < horizon {
            if direction < 0.0 && t0 < earliest {
                break;
            }
            let t1 = offset_days(t0, step);
            let f1 = diff(t1)?;

            // A jump of ~360 is the difference wrapping at the opposition
            // point, not a crossing.
            if f0 * f1 <= 0.0 && (f1 - f0).abs() < 180.0 {
                let crossing = self.bisect(&diff, t0, f0, t1)?;
                if crossing >= earliest {
                    return Ok(Some(crossing));
                }
            }
            t0 = t1;
            f0 = f1;
            travelled += step.abs();
        }
        Ok(None)
    }

    fn bisect(
        &self,
        diff: &dyn Fn(DateTime<Utc>) -> Result<f64, AstronomyError>,
        mut lo: DateTime<Utc>,
        mut f_lo: f64,
        mut hi: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AstronomyError> {
        if f_lo == 0.0 {
            return Ok(lo);
        }
        for _ in 0..BISECTION_ITERATIONS {
            let span = days_between(lo, hi);
            if span.abs() < 1.0 / 1440.0 {
                break;
            }
            let mid = offset_days(lo, span / 2.0);
            let f_mid = diff(mid)?;
            if f_mid == 0.0 {
                return Ok(mid);
            }
            if f_lo * f_mid < 0.0 {
                hi = mid;
            } else {
                lo = mid;
                f_lo = f_mid;
            }
        }
        Ok(offset_days(lo, days_between(lo, hi) / 2.0))
    }
}

use crate::aspects::AspectHit;
use crate::chart::{ChartStore, NatalChart, StoreError};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::context::cost::{estimate, CostEstimate};
use crate::context::requirements::{analyze, ContextComponent, ContextRequirements};
use crate::cosmic::{CacheError, CosmicDataCache, CosmicSnapshot};
use crate::ephemeris::{evaluation_instant, AstronomyError, AstronomyProvider};
use crate::patterns::{NatalPattern, PatternDetector};
use crate::returns::{PlanetaryReturn, ReturnError, ReturnTracker};
use crate::transits::TransitPersonalizer;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Per-category failures reported inside a [`CosmicContext`].
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "camelCase")]
pub enum ContextError {
    #[error("No natal chart stored for user {user_id}")]
    MissingChart { user_id: String },
    #[error("Chart has no birth instant")]
    MissingBirthInstant,
    #[error("Astronomy provider failed: {message}")]
    Astronomy { message: String },
    #[error("Cosmic data unavailable: {message}")]
    CacheFailed { message: String },
    #[error("Chart store failed: {message}")]
    Store { message: String },
}

impl From<AstronomyError> for ContextError {
    fn from(e: AstronomyError) -> Self {
        ContextError::Astronomy {
            message: e.to_string(),
        }
    }
}

impl From<CacheError> for ContextError {
    fn from(e: CacheError) -> Self {
        ContextError::CacheFailed {
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for ContextError {
    fn from(e: StoreError) -> Self {
        ContextError::Store {
            message: e.to_string(),
        }
    }
}

impl From<ReturnError> for ContextError {
    fn from(e: ReturnError) -> Self {
        match e {
            ReturnError::MissingBirthInstant => ContextError::MissingBirthInstant,
            ReturnError::Astronomy(inner) => inner.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CategoryStatus {
    Succeeded,
    /// Some entries were computed, others failed
    Partial { failures: Vec<ContextError> },
    Failed { error: ContextError },
    Skipped,
}

impl CategoryStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CategoryStatus::Succeeded)
    }
}

/// Everything a downstream narrative generator needs for one request.
/// Fields of categories that were not requested stay empty.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmicContext {
    pub requirements: ContextRequirements,
    pub cost_estimate: CostEstimate,
    pub cosmic: Option<Arc<CosmicSnapshot>>,
    pub patterns: Vec<NatalPattern>,
    pub returns: Vec<PlanetaryReturn>,
    pub transit_hits: Vec<AspectHit>,
    /// Basic cosmic, natal patterns, planetary returns and personal transits
    pub statuses: BTreeMap<ContextComponent, CategoryStatus>,
}

impl CosmicContext {
    pub fn status(&self, component: ContextComponent) -> Option<&CategoryStatus> {
        self.statuses.get(&component)
    }
}

/// Categories this builder computes. The rest are flags for downstream
/// collaborators.
const COMPUTED: [ContextComponent; 4] = [
    ContextComponent::BasicCosmic,
    ContextComponent::NatalPatterns,
    ContextComponent::PlanetaryReturns,
    ContextComponent::PersonalTransits,
];

pub struct ContextBuilder {
    config: CoreConfig,
    store: Arc<dyn ChartStore>,
    provider: Arc<dyn AstronomyProvider>,
    cache: Arc<CosmicDataCache>,
    detector: PatternDetector,
    tracker: ReturnTracker,
    personalizer: TransitPersonalizer,
}

impl ContextBuilder {
    pub fn new(
        config: CoreConfig,
        store: Arc<dyn ChartStore>,
        provider: Arc<dyn AstronomyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(CosmicDataCache::new(Arc::clone(&provider), clock, &config));
        Self::with_cache(config, store, provider, cache)
    }

    /// Share one cache between several builders.
    pub fn with_cache(
        config: CoreConfig,
        store: Arc<dyn ChartStore>,
        provider: Arc<dyn AstronomyProvider>,
        cache: Arc<CosmicDataCache>,
    ) -> Self {
        Self {
            detector: PatternDetector::new(config.geometry.clone()),
            tracker: ReturnTracker::new(config.return_windows),
            personalizer: TransitPersonalizer::new(config.geometry.clone(), config.transit_top_n),
            config,
            store,
            provider,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<CosmicDataCache> {
        &self.cache
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub async fn build_context(&self, user_id: &str, query: &str, as_of: NaiveDate) -> CosmicContext {
        let requirements = analyze(query);
        log::debug!("Query for {} resolved to {:?}", user_id, requirements);
        self.build_with_requirements(user_id, requirements, as_of)
            .await
    }

    pub async fn build_with_requirements(
        &self,
        user_id: &str,
        requirements: ContextRequirements,
        as_of: NaiveDate,
    ) -> CosmicContext {
        let mut context = CosmicContext {
            requirements,
            cost_estimate: estimate(&requirements, &self.config.cost_weights),
            cosmic: None,
            patterns: Vec::new(),
            returns: Vec::new(),
            transit_hits: Vec::new(),
            statuses: COMPUTED
                .iter()
                .map(|&c| (c, CategoryStatus::Skipped))
                .collect(),
        };

        let snapshot = if requirements.basic_cosmic || requirements.personal_transits {
            Some(self.cache.get_or_compute(as_of).await)
        } else {
            None
        };
        if requirements.basic_cosmic {
            match &snapshot {
                Some(Ok(s)) => {
                    context.cosmic = Some(Arc::clone(s));
                    self.record(&mut context, ContextComponent::BasicCosmic, CategoryStatus::Succeeded);
                }
                Some(Err(e)) => self.fail(&mut context, ContextComponent::BasicCosmic, e.clone().into()),
                None => {}
            }
        }

        let needs_chart =
            requirements.natal_patterns || requirements.planetary_returns || requirements.personal_transits;
        if !needs_chart {
            return context;
        }

        let chart = match self.store.load_chart(user_id) {
            Ok(Some(chart)) => chart,
            Ok(None) => {
                self.fail_chart_categories(&mut context, ContextError::MissingChart {
                    user_id: user_id.to_string(),
                });
                return context;
            }
            Err(e) => {
                self.fail_chart_categories(&mut context, e.into());
                return context;
            }
        };

        if requirements.natal_patterns {
            context.patterns = self.detector.detect(&chart);
            self.record(&mut context, ContextComponent::NatalPatterns, CategoryStatus::Succeeded);
        }

        if requirements.planetary_returns {
            match self.planetary_returns(&chart, as_of).await {
                Ok((returns, status)) => {
                    context.returns = returns;
                    self.record(&mut context, ContextComponent::PlanetaryReturns, status);
                }
                Err(e) => self.fail(&mut context, ContextComponent::PlanetaryReturns, e),
            }
        }

        if requirements.personal_transits {
            match &snapshot {
                Some(Ok(s)) => {
                    context.transit_hits = self.personalizer.personalize(&chart, &s.transits).into_top();
                    self.record(&mut context, ContextComponent::PersonalTransits, CategoryStatus::Succeeded);
                }
                Some(Err(e)) => {
                    self.fail(&mut context, ContextComponent::PersonalTransits, e.clone().into())
                }
                None => {}
            }
        }

        context
    }

    /// Return scans call the provider thousands of times, so they run on the
    /// blocking pool.
    async fn planetary_returns(
        &self,
        chart: &NatalChart,
        as_of: NaiveDate,
    ) -> Result<(Vec<PlanetaryReturn>, CategoryStatus), ContextError> {
        let instant = evaluation_instant(as_of)?;
        let provider = Arc::clone(&self.provider);
        let tracker = self.tracker.clone();
        let chart = chart.clone();

        let scans = tokio::task::spawn_blocking(move || {
            tracker.scan_returns(provider.as_ref(), &chart, instant)
        })
        .await
        .map_err(|e| ContextError::Astronomy {
            message: format!("return scan aborted: {}", e),
        })??;

        let mut returns = Vec::new();
        let mut failures = Vec::new();
        for (_, result) in scans {
            match result {
                Ok(Some(r)) => returns.push(r),
                Ok(None) => {}
                Err(e) => failures.push(ContextError::from(e)),
            }
        }

        let status = if failures.is_empty() {
            CategoryStatus::Succeeded
        } else if returns.is_empty() {
            return Err(failures.swap_remove(0));
        } else {
            CategoryStatus::Partial { failures }
        };
        Ok((returns, status))
    }

    fn record(&self, context: &mut CosmicContext, component: ContextComponent, status: CategoryStatus) {
        context.statuses.insert(component, status);
    }

    fn fail(&self, context: &mut CosmicContext, component: ContextComponent, error: ContextError) {
        log::warn!("{} failed: {}", component, error);
        self.record(context, component, CategoryStatus::Failed { error });
    }

    fn fail_chart_categories(&self, context: &mut CosmicContext, error: ContextError) {
        let requested = [
            (ContextComponent::NatalPatterns, context.requirements.natal_patterns),
            (ContextComponent::PlanetaryReturns, context.requirements.planetary_returns),
            (ContextComponent::PersonalTransits, context.requirements.personal_transits),
        ];
        for (component, wanted) in requested {
            if wanted {
                self.fail(context, component, error.clone());
            }
        }
    }
}

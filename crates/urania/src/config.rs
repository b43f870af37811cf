//! Typed core configuration, validated once at startup.

use crate::aspects::{AspectGeometry, AspectKind};
use crate::context::cost::CostWeights;
use crate::context::requirements::ContextComponent;
use crate::returns::{ReturnType, ReturnWindows};
use std::time::Duration;
use thiserror::Error;
use urania_config::CosmicSettings;

/// Configuration problems. All of them are fatal at boot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Unknown aspect '{name}' in orb table")]
    UnknownAspect { name: String },
    #[error("Orb for {aspect} must be a finite, non-negative number of degrees, got {value}")]
    InvalidOrb { aspect: String, value: f64 },
    #[error("Orbs for {first} and {second} overlap: angles {gap} degrees apart, orbs sum to {combined}")]
    OverlappingOrbs {
        first: String,
        second: String,
        gap: f64,
        combined: f64,
    },
    #[error("'{first}' and '{second}' both set the {entry} entry")]
    DuplicateEntry {
        entry: String,
        first: String,
        second: String,
    },
    #[error("Unknown return planet '{name}'. Valid planets: sun, jupiter, saturn")]
    UnknownReturnPlanet { name: String },
    #[error("Return window for {planet} must not be negative, got {days}")]
    InvalidReturnWindow { planet: String, days: i64 },
    #[error("Unknown context component '{name}' in cost weights")]
    UnknownComponent { name: String },
    #[error("Cost weights overflow when summed")]
    WeightOverflow,
    #[error("Transit top_n must be at least 1")]
    ZeroTopN,
}

/// Validated calibration tables shared by every computation.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub geometry: AspectGeometry,
    pub return_windows: ReturnWindows,
    pub cost_weights: CostWeights,
    pub transit_top_n: usize,
    pub retry_backoff: Duration,
    pub retention_days: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            geometry: AspectGeometry::default(),
            return_windows: ReturnWindows::default(),
            cost_weights: CostWeights::default(),
            transit_top_n: 3,
            retry_backoff: Duration::from_millis(250),
            retention_days: 7,
        }
    }
}

impl CoreConfig {
    /// Validate loosely typed settings. Unknown names are rejected rather
    /// than ignored.
    pub fn from_settings(settings: &CosmicSettings) -> Result<Self, ConfigurationError> {
        let mut orbs = [0.0_f64; 6];
        let mut orb_names: [Option<&str>; 6] = [None; 6];
        for (name, &orb) in &settings.orbs {
            let kind = AspectKind::from_name(name)
                .ok_or_else(|| ConfigurationError::UnknownAspect { name: name.clone() })?;
            claim(&mut orb_names[kind.index()], kind.name(), name)?;
            orbs[kind.index()] = orb;
        }
        let geometry = AspectGeometry::new(orbs)?;

        let mut windows = [0_i64; 3];
        let mut window_names: [Option<&str>; 3] = [None; 3];
        for (name, &days) in &settings.return_windows {
            let return_type = return_type_from_name(name)
                .ok_or_else(|| ConfigurationError::UnknownReturnPlanet { name: name.clone() })?;
            claim(
                &mut window_names[return_type.index()],
                return_type.body().id(),
                name,
            )?;
            if days < 0 {
                return Err(ConfigurationError::InvalidReturnWindow {
                    planet: name.clone(),
                    days,
                });
            }
            windows[return_type.index()] = days;
        }

        let mut weights = [0_u32; 8];
        for (name, &weight) in &settings.cost_weights {
            let component = ContextComponent::from_key(name)
                .ok_or_else(|| ConfigurationError::UnknownComponent { name: name.clone() })?;
            weights[component.index()] = weight;
        }
        let cost_weights = CostWeights::new(weights)?;

        if settings.transit_top_n == 0 {
            return Err(ConfigurationError::ZeroTopN);
        }

        log::info!(
            "Core configuration loaded: max orb {}, top_n {}, retention {} days",
            geometry.max_orb(),
            settings.transit_top_n,
            settings.retention_days
        );

        Ok(Self {
            geometry,
            return_windows: ReturnWindows::new(windows),
            cost_weights,
            transit_top_n: settings.transit_top_n,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
            retention_days: settings.retention_days,
        })
    }
}

/// Two spellings of one entry (e.g. `quincunx` and `inconjunct`) are
/// ambiguous and rejected.
fn claim<'a>(
    slot: &mut Option<&'a str>,
    entry: &str,
    name: &'a str,
) -> Result<(), ConfigurationError> {
    match slot {
        Some(first) => Err(ConfigurationError::DuplicateEntry {
            entry: entry.to_string(),
            first: first.to_string(),
            second: name.to_string(),
        }),
        None => {
            *slot = Some(name);
            Ok(())
        }
    }
}

fn return_type_from_name(name: &str) -> Option<ReturnType> {
    match name.trim().to_lowercase().as_str() {
        "sun" | "solar" => Some(ReturnType::Solar),
        "jupiter" => Some(ReturnType::Jupiter),
        "saturn" => Some(ReturnType::Saturn),
        _ => None,
    }
}

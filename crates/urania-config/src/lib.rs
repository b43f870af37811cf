use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "URANIA_CONFIG";

/// Calibration tables for the cosmic context core.
///
/// Names are kept as plain strings here; the core validates them into typed
/// tables at startup and rejects anything it does not recognise.
#[derive(Debug, Clone, PartialEq)]
pub struct CosmicSettings {
    /// Aspect name -> orb in degrees. An orb of 0 disables the aspect.
    pub orbs: BTreeMap<String, f64>,
    /// Planet name -> activity window in days around an exact return.
    pub return_windows: BTreeMap<String, i64>,
    /// Context component -> token weight.
    pub cost_weights: BTreeMap<String, u32>,
    pub transit_top_n: usize,
    pub retry_backoff_ms: u64,
    pub retention_days: u32,
}

impl Default for CosmicSettings {
    fn default() -> Self {
        Self {
            orbs: default_orbs(),
            return_windows: default_return_windows(),
            cost_weights: default_cost_weights(),
            transit_top_n: default_top_n(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_orbs() -> BTreeMap<String, f64> {
    [
        ("conjunction", 8.0),
        ("opposition", 8.0),
        ("trine", 6.0),
        ("square", 6.0),
        ("sextile", 4.0),
        ("quincunx", 3.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_return_windows() -> BTreeMap<String, i64> {
    [("sun", 3), ("jupiter", 14), ("saturn", 30)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn default_cost_weights() -> BTreeMap<String, u32> {
    [
        ("basic_cosmic", 150),
        ("personal_transits", 300),
        ("natal_patterns", 200),
        ("planetary_returns", 100),
        ("progressed_chart", 250),
        ("eclipses", 200),
        ("tarot_patterns", 150),
        ("journal_history", 400),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_top_n() -> usize {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize)]
struct TransitsToml {
    #[serde(default = "default_top_n")]
    top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct CacheToml {
    #[serde(default = "default_retry_backoff_ms")]
    retry_backoff_ms: u64,
    #[serde(default = "default_retention_days")]
    retention_days: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RootConfigToml {
    #[serde(default)]
    orbs: BTreeMap<String, f64>,
    #[serde(default)]
    return_windows: BTreeMap<String, i64>,
    #[serde(default)]
    cost_weights: BTreeMap<String, u32>,
    #[serde(default)]
    transits: Option<TransitsToml>,
    #[serde(default)]
    cache: Option<CacheToml>,
}

/// Try the explicit env path first, then the usual relative locations of
/// `configs/cosmic.toml`.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(p));
    }
    ["configs/cosmic.toml", "../../configs/cosmic.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Parse settings from TOML text. Keys given in a table override the
/// defaults for that key only; missing tables keep every default.
pub fn parse_cosmic_settings(text: &str) -> anyhow::Result<CosmicSettings> {
    let root: RootConfigToml = toml::from_str(text)
        .map_err(|e| anyhow::anyhow!("Failed to parse cosmic settings: {e}"))?;
    let RootConfigToml {
        orbs,
        return_windows,
        cost_weights,
        transits,
        cache,
    } = root;

    let mut settings = CosmicSettings::default();
    merge_table(&mut settings.orbs, orbs, "orbs", canonical_aspect)?;
    merge_table(
        &mut settings.return_windows,
        return_windows,
        "return_windows",
        canonical_planet,
    )?;
    merge_table(
        &mut settings.cost_weights,
        cost_weights,
        "cost_weights",
        |k| k.to_string(),
    )?;
    if let Some(t) = transits {
        settings.transit_top_n = t.top_n;
    }
    if let Some(c) = cache {
        settings.retry_backoff_ms = c.retry_backoff_ms;
        settings.retention_days = c.retention_days;
    }
    Ok(settings)
}

fn canonical_aspect(key: &str) -> String {
    match key {
        "inconjunct" => "quincunx".to_string(),
        other => other.to_string(),
    }
}

fn canonical_planet(key: &str) -> String {
    match key {
        "solar" => "sun".to_string(),
        other => other.to_string(),
    }
}

/// Override defaults key by key. Keys are lowercased and aliases folded onto
/// the default spelling, so `inconjunct` replaces the default `quincunx`.
fn merge_table<V>(
    target: &mut BTreeMap<String, V>,
    overrides: BTreeMap<String, V>,
    table: &str,
    canonical: impl Fn(&str) -> String,
) -> anyhow::Result<()> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in overrides {
        let canon = canonical(key.trim().to_lowercase().as_str());
        if let Some(first) = seen.insert(canon.clone(), key.clone()) {
            anyhow::bail!("[{table}] sets '{canon}' twice, as '{first}' and '{key}'");
        }
        target.insert(canon, value);
    }
    Ok(())
}

pub fn load_cosmic_settings_from(path: &Path) -> anyhow::Result<CosmicSettings> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {e}", path.display()))?;
    parse_cosmic_settings(&text)
}

/// Load settings from the resolved config path, falling back to the built-in
/// defaults when no file is present. An explicit `URANIA_CONFIG` that cannot
/// be read is an error.
pub fn load_cosmic_settings() -> anyhow::Result<CosmicSettings> {
    match resolve_config_path() {
        Some(path) => load_cosmic_settings_from(&path),
        None => Ok(CosmicSettings::default()),
    }
}

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use urania::{
    analyze, Clock, ContextBuilder, ContextPreset, CoreConfig, InMemoryChartStore,
    MeanMotionEphemeris, SystemClock,
};

/// Sample chart used when no `--chart` file is given.
const SAMPLE_CHART: &str = r#"{
    "placements": [
        { "body": "Sun", "sign": "Leo", "degree": 15, "minute": 30, "house": 10 },
        { "body": "Moon", "sign": "Taurus", "degree": 12, "house": 7 },
        { "body": "Mercury", "sign": "Virgo", "degree": 2, "house": 11 },
        { "body": "Venus", "sign": "Cancer", "degree": 28, "house": 9 },
        { "body": "Mars", "sign": "Taurus", "degree": 17, "house": 7 },
        { "body": "Jupiter", "sign": "Cancer", "degree": 20, "house": 9 },
        { "body": "Saturn", "sign": "Capricorn", "degree": 20, "retrograde": true, "house": 3 },
        { "body": "Uranus", "sign": "Capricorn", "degree": 5, "retrograde": true, "house": 3 },
        { "body": "Neptune", "sign": "Capricorn", "degree": 12, "retrograde": true, "house": 3 },
        { "body": "Pluto", "sign": "Scorpio", "degree": 15, "house": 1 },
        { "body": "North Node", "sign": "Aquarius", "degree": 10, "retrograde": true, "house": 4 }
    ],
    "birth": { "birthDate": "1990-08-08", "birthTime": "14:30", "utcOffsetMinutes": 120 }
}"#;

const PROBE_USER: &str = "probe";

#[derive(Parser, Debug)]
#[command(author, version, about = "Build a cosmic context for a query and print it as JSON")]
struct Args {
    /// Free-text question, e.g. "what's my saturn return?"
    #[arg(default_value = "")]
    query: String,

    /// Evaluation date (YYYY-MM-DD). Defaults to today in UTC.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Stored chart record (JSON). Defaults to a built-in sample chart.
    #[arg(long)]
    chart: Option<PathBuf>,

    /// Use a named preset instead of analysing the query.
    #[arg(long)]
    preset: Option<String>,

    /// Print only the requirements and cost estimate.
    #[arg(long, default_value_t = false)]
    estimate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = urania_config::load_cosmic_settings()?;
    let config = CoreConfig::from_settings(&settings).context("Invalid cosmic settings")?;

    let requirements = match &args.preset {
        Some(name) => ContextPreset::from_name(name)
            .with_context(|| format!("Unknown preset '{}'", name))?
            .requirements(),
        None => analyze(&args.query),
    };

    if args.estimate_only {
        let cost = urania::estimate(&requirements, &config.cost_weights);
        let out = serde_json::json!({ "requirements": requirements, "costEstimate": cost });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let chart_json = match &args.chart {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chart {}", path.display()))?,
        None => SAMPLE_CHART.to_string(),
    };
    let store = InMemoryChartStore::new();
    store
        .insert_json(PROBE_USER, &chart_json)
        .context("Chart record rejected")?;

    let clock = Arc::new(SystemClock);
    let date = args.date.unwrap_or_else(|| clock.now().date_naive());
    log::info!("Building context for {} with {:?}", date, requirements);

    let builder = ContextBuilder::new(
        config,
        Arc::new(store),
        Arc::new(MeanMotionEphemeris::new()),
        clock,
    );
    let context = builder
        .build_with_requirements(PROBE_USER, requirements, date)
        .await;

    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

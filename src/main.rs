use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use goalwatch::alerts::{AlertSink, JsonlAlertLog, render_alert};
use goalwatch::historical_dataset;
use goalwatch::ingest::{RawMatchRow, ingest_rows};
use goalwatch::{EngineConfig, LiveMatchContext, LiveSnapshot, MatchLog, Predictor, SnapshotStore};

#[derive(Debug, Deserialize)]
struct LiveCase {
    #[serde(default)]
    history: Vec<RawMatchRow>,
    matches: Vec<LiveCaseMatch>,
}

#[derive(Debug, Deserialize)]
struct LiveCaseMatch {
    home_team: String,
    away_team: String,
    #[serde(default)]
    league: String,
    /// Polls in arrival order; the last one is the state evaluated.
    #[serde(default)]
    snapshots: Vec<LiveSnapshot>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    goalwatch::init_tracing();

    let case_path = positional_arg().unwrap_or_else(|| PathBuf::from("tests/fixtures/live_case.json"));
    let cfg = match flag_value("--config") {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => EngineConfig::from_env().context("load config from env")?,
    };
    let predictor = Predictor::new(cfg).context("invalid engine config")?;

    let raw = fs::read_to_string(&case_path)
        .with_context(|| format!("read case {}", case_path.display()))?;
    let case: LiveCase = serde_json::from_str(&raw)
        .with_context(|| format!("parse case {}", case_path.display()))?;

    let mut log = MatchLog::new();
    if let Some(db_path) = flag_value("--db") {
        let conn = historical_dataset::open_db(&db_path)?;
        log = historical_dataset::load_match_log(&conn, None)?;
        info!(records = log.len(), db = %db_path.display(), "loaded stored history");
    }
    let report = ingest_rows(&case.history);
    log.extend(report.records);

    let store = SnapshotStore::new(predictor.build_snapshot(log));

    let contexts = case
        .matches
        .iter()
        .map(|m| {
            let mut ctx = LiveMatchContext::new(&m.home_team, &m.away_team, &m.league);
            for snap in &m.snapshots {
                ctx.apply_snapshot(snap);
            }
            ctx
        })
        .collect::<Vec<_>>();

    let results = predictor.evaluate_many(&store.current(), &contexts);

    let sink = flag_value("--alerts-dir").map(JsonlAlertLog::new);
    for result in &results {
        let text = render_alert(result);
        println!("{text}\n");
        if let Some(sink) = &sink {
            sink.deliver(&text, result)?;
        }
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&results).context("serialize results")?
    );
    Ok(())
}

fn positional_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = !arg.contains('=');
            continue;
        }
        return Some(PathBuf::from(arg));
    }
    None
}

fn flag_value(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

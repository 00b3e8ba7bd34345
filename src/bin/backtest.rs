use std::path::PathBuf;

use anyhow::{Context, Result};

use goalwatch::Predictor;
use goalwatch::backtest::{BacktestOptions, run_backtest};
use goalwatch::config::EngineConfig;
use goalwatch::historical_dataset;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    goalwatch::init_tracing();

    let db_path = arg_value("--db")
        .map(PathBuf::from)
        .or_else(historical_dataset::default_db_path)
        .context("unable to resolve sqlite path")?;
    let cfg = match arg_value("--config") {
        Some(path) => EngineConfig::load(PathBuf::from(&path).as_path())
            .with_context(|| format!("load config {path}"))?,
        None => EngineConfig::from_env().context("load config from env")?,
    };
    let predictor = Predictor::new(cfg).context("invalid engine config")?;

    let mut opts = BacktestOptions {
        league: arg_value("--league"),
        ..BacktestOptions::default()
    };
    if let Some(n) = arg_value("--min-history").and_then(|v| v.parse::<usize>().ok()) {
        opts.min_history = n;
    }

    let conn = historical_dataset::open_db(&db_path)?;
    let log = historical_dataset::load_match_log(&conn, opts.league.as_deref())?;
    let report = run_backtest(&log, &predictor, &opts);

    println!("DB: {}", db_path.display());
    println!(
        "Matches: evaluated={} skipped={}",
        report.matches_evaluated, report.matches_skipped
    );
    let m = report.metrics;
    println!(
        "Samples={} brier={:.4} logloss={:.4} acc={:.3} base_rate={:.3}",
        m.samples, m.brier, m.log_loss, m.accuracy, m.base_rate
    );
    println!("Bands:");
    for b in &report.bands {
        println!("  {:<9} n={:<6} hit={:.3}", b.band.as_str(), b.count, b.hit_rate);
    }
    println!("Calibration:");
    for bin in report.bins.iter().filter(|b| b.count > 0) {
        println!(
            "  [{:.1}, {:.1}) n={:<6} pred={:.3} actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }
    Ok(())
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix)
            && !value.trim().is_empty()
        {
            return Some(value.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use goalwatch::historical_dataset;
use goalwatch::ingest::{ingest_rows, parse_rows_json};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    goalwatch::init_tracing();

    let inputs = parse_input_args();
    if inputs.is_empty() {
        return Err(anyhow!("usage: hist_ingest [--db PATH] ROWS.json [ROWS.json ...]"));
    }

    let db_path = parse_db_path_arg()
        .or_else(historical_dataset::default_db_path)
        .context("unable to resolve sqlite path")?;
    let mut conn = historical_dataset::open_db(&db_path)?;

    println!("DB: {}", db_path.display());
    for input in &inputs {
        let started_at = Utc::now().to_rfc3339();
        let raw = fs::read_to_string(input)
            .with_context(|| format!("read rows {}", input.display()))?;
        let rows = parse_rows_json(&raw).with_context(|| format!("parse rows {}", input.display()))?;
        let report = ingest_rows(&rows);
        let upserted = historical_dataset::upsert_records(&mut conn, &report.records)?;
        let run = historical_dataset::record_ingest_run(
            &conn,
            &input.display().to_string(),
            rows.len(),
            &report,
            upserted,
            &started_at,
        )?;

        println!(
            "{}: rows={} accepted={} malformed_minutes={} quarantined={} (run {})",
            run.source, run.rows_total, run.accepted, run.malformed_minutes, run.quarantined, run.run_id
        );
        for q in report.quarantined.iter().take(6) {
            println!("   - row {}: {}", q.row_index, q.reason);
        }
    }

    println!(
        "Stored records: {}",
        historical_dataset::count_records(&conn)?
    );
    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
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

fn parse_input_args() -> Vec<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--db" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(PathBuf::from(arg));
    }
    out
}

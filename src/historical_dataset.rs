use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::ingest::{IngestReport, parse_minutes};
use crate::match_log::{MatchLog, MatchRecord, VenueSide};

const APP_DIR: &str = "goalwatch";
const DB_FILE: &str = "match_history.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRunSummary {
    pub run_id: i64,
    pub source: String,
    pub rows_total: usize,
    pub accepted: usize,
    pub malformed_minutes: usize,
    pub quarantined: usize,
    pub upserted: usize,
}

/// `$XDG_CACHE_HOME/goalwatch`, else `~/.cache/goalwatch`.
pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

/// `GOALWATCH_DB` when set, else the cache directory.
pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("GOALWATCH_DB")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path.trim()));
    }
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS match_records (
            record_key TEXT PRIMARY KEY,
            match_id TEXT NULL,
            team TEXT NOT NULL,
            opponent TEXT NOT NULL,
            league TEXT NOT NULL,
            venue TEXT NOT NULL,
            match_date TEXT NOT NULL,
            goals_scored_minutes TEXT NOT NULL,
            goals_conceded_minutes TEXT NOT NULL,
            minutes_known INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_match_records_team ON match_records(team);
        CREATE INDEX IF NOT EXISTS idx_match_records_league ON match_records(league);
        CREATE INDEX IF NOT EXISTS idx_match_records_date ON match_records(match_date);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            source TEXT NOT NULL,
            rows_total INTEGER NOT NULL,
            accepted INTEGER NOT NULL,
            malformed_minutes INTEGER NOT NULL,
            quarantined INTEGER NOT NULL,
            upserted INTEGER NOT NULL,
            quarantine_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Upsert in one transaction. A record whose key already exists keeps its row
/// (and so its load position) and takes the new values.
pub fn upsert_records(conn: &mut Connection, records: &[MatchRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin upsert transaction")?;
    let now = Utc::now().to_rfc3339();
    for record in records {
        tx.execute(
            r#"
            INSERT INTO match_records (
                record_key, match_id, team, opponent, league, venue, match_date,
                goals_scored_minutes, goals_conceded_minutes, minutes_known, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(record_key) DO UPDATE SET
                match_id = excluded.match_id,
                team = excluded.team,
                opponent = excluded.opponent,
                league = excluded.league,
                venue = excluded.venue,
                match_date = excluded.match_date,
                goals_scored_minutes = excluded.goals_scored_minutes,
                goals_conceded_minutes = excluded.goals_conceded_minutes,
                minutes_known = excluded.minutes_known,
                updated_at = excluded.updated_at
            "#,
            params![
                record.key().to_string(),
                record.match_id,
                record.team,
                record.opponent,
                record.league,
                record.venue.as_str(),
                record.match_date.format("%Y-%m-%d").to_string(),
                join_minutes(&record.goals_scored_minutes),
                join_minutes(&record.goals_conceded_minutes),
                i64::from(record.minutes_known),
                now,
            ],
        )
        .context("upsert match record")?;
    }
    tx.commit().context("commit upsert transaction")?;
    Ok(records.len())
}

/// Validate-then-store bookkeeping for one ingest pass.
pub fn record_ingest_run(
    conn: &Connection,
    source: &str,
    rows_total: usize,
    report: &IngestReport,
    upserted: usize,
    started_at: &str,
) -> Result<IngestRunSummary> {
    let quarantine_json =
        serde_json::to_string(&report.quarantined).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, source, rows_total, accepted, malformed_minutes, quarantined, upserted, quarantine_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            started_at,
            Utc::now().to_rfc3339(),
            source,
            rows_total as i64,
            report.accepted() as i64,
            report.malformed_minutes as i64,
            report.quarantined.len() as i64,
            upserted as i64,
            quarantine_json,
        ],
    )
    .context("insert ingest run")?;
    Ok(IngestRunSummary {
        run_id: conn.last_insert_rowid(),
        source: source.to_string(),
        rows_total,
        accepted: report.accepted(),
        malformed_minutes: report.malformed_minutes,
        quarantined: report.quarantined.len(),
        upserted,
    })
}

/// Every stored record in insertion order, optionally limited to one league.
pub fn load_match_log(conn: &Connection, league: Option<&str>) -> Result<MatchLog> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                match_id, team, opponent, league, venue, match_date,
                goals_scored_minutes, goals_conceded_minutes, minutes_known
            FROM match_records
            WHERE ?1 IS NULL OR league = ?1
            ORDER BY rowid ASC
            "#,
        )
        .context("prepare load match records query")?;

    let rows = stmt
        .query_map(params![league], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, i64>(8)? != 0,
            ))
        })
        .context("query match records")?;

    let mut log = MatchLog::new();
    for row in rows {
        let (match_id, team, opponent, league, venue, date, scored, conceded, minutes_known) =
            row.context("decode match record row")?;
        let venue = VenueSide::parse(&venue)
            .with_context(|| format!("stored venue {venue:?} for {team}"))?;
        let match_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("stored date {date:?} for {team}"))?;
        log.insert(MatchRecord {
            match_id,
            team,
            opponent,
            league,
            venue,
            goals_scored_minutes: parse_minutes(&scored),
            goals_conceded_minutes: parse_minutes(&conceded),
            match_date,
            minutes_known,
        });
    }
    Ok(log)
}

pub fn count_records(conn: &Connection) -> Result<usize> {
    let n = conn
        .query_row("SELECT COUNT(*) FROM match_records", [], |row| {
            row.get::<_, i64>(0)
        })
        .context("count match records")?;
    Ok(usize::try_from(n).unwrap_or(0))
}

fn join_minutes(minutes: &[u16]) -> String {
    minutes
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

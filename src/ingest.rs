use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{MinuteParseError, QuarantineReason};
use crate::intervals::MAX_MINUTE;
use crate::match_log::{MatchRecord, VenueSide};

/// A match row as delivered by an external source. Nothing is trusted yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMatchRow {
    #[serde(default)]
    pub match_id: Option<Value>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default, alias = "side")]
    pub venue: Option<String>,
    #[serde(default, alias = "scored")]
    pub goals_scored_minutes: Option<MinutesField>,
    #[serde(default, alias = "conceded")]
    pub goals_conceded_minutes: Option<MinutesField>,
    #[serde(default, alias = "date")]
    pub match_date: Option<String>,
}

/// Minutes arrive either as "12, 45+2, 88" or as a JSON list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinutesField {
    Text(String),
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quarantined {
    pub row_index: usize,
    pub reason: QuarantineReason,
}

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub records: Vec<MatchRecord>,
    /// Accepted rows whose minute data could not be used.
    pub malformed_minutes: usize,
    pub quarantined: Vec<Quarantined>,
}

impl IngestReport {
    pub fn accepted(&self) -> usize {
        self.records.len()
    }
}

pub fn ingest_rows(rows: &[RawMatchRow]) -> IngestReport {
    let mut report = IngestReport::default();
    for (row_index, row) in rows.iter().enumerate() {
        match validate_row(row) {
            Ok(record) => {
                if !record.minutes_known {
                    report.malformed_minutes += 1;
                }
                report.records.push(record);
            }
            Err(reason) => {
                warn!(row_index, %reason, "quarantined match row");
                report.quarantined.push(Quarantined { row_index, reason });
            }
        }
    }
    info!(
        accepted = report.accepted(),
        malformed_minutes = report.malformed_minutes,
        quarantined = report.quarantined.len(),
        "ingested match rows"
    );
    report
}

pub fn parse_rows_json(raw: &str) -> anyhow::Result<Vec<RawMatchRow>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

pub fn validate_row(row: &RawMatchRow) -> Result<MatchRecord, QuarantineReason> {
    let team = non_empty(row.team.as_deref()).ok_or(QuarantineReason::MissingTeam)?;
    let opponent = non_empty(row.opponent.as_deref()).ok_or(QuarantineReason::MissingOpponent)?;
    let venue_raw = row.venue.as_deref().unwrap_or_default();
    let venue =
        VenueSide::parse(venue_raw).ok_or_else(|| QuarantineReason::BadVenue(venue_raw.to_string()))?;
    let date_raw = non_empty(row.match_date.as_deref()).ok_or(QuarantineReason::MissingDate)?;
    let match_date =
        parse_match_date(&date_raw).ok_or_else(|| QuarantineReason::BadDate(date_raw.clone()))?;

    let scored = row.goals_scored_minutes.as_ref().map(minutes_from_field);
    let conceded = row.goals_conceded_minutes.as_ref().map(minutes_from_field);
    let (goals_scored_minutes, goals_conceded_minutes, minutes_known) = match (scored, conceded) {
        (None, None) => (Vec::new(), Vec::new(), false),
        (scored, conceded) => {
            let scored = scored.unwrap_or_else(|| Ok(Vec::new()));
            let conceded = conceded.unwrap_or_else(|| Ok(Vec::new()));
            match (scored, conceded) {
                (Ok(s), Ok(c)) => (s, c, true),
                _ => (Vec::new(), Vec::new(), false),
            }
        }
    };

    Ok(MatchRecord {
        match_id: row.match_id.as_ref().and_then(match_id_string),
        team,
        opponent,
        league: row.league.as_deref().unwrap_or_default().trim().to_string(),
        venue,
        goals_scored_minutes,
        goals_conceded_minutes,
        match_date,
        minutes_known,
    })
}

/// Lenient form: anything unusable becomes an empty list.
pub fn parse_minutes(raw: &str) -> Vec<u16> {
    try_parse_minutes(raw).unwrap_or_default()
}

pub fn try_parse_minutes(raw: &str) -> Result<Vec<u16>, MinuteParseError> {
    let mut out = Vec::new();
    for token in raw.split([',', ';']) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        out.push(parse_minute_token(token)?);
    }
    out.sort_unstable();
    Ok(out)
}

fn minutes_from_field(field: &MinutesField) -> Result<Vec<u16>, MinuteParseError> {
    match field {
        MinutesField::Text(raw) => try_parse_minutes(raw),
        MinutesField::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let minute = match item {
                    Value::Number(n) => {
                        let n = n
                            .as_u64()
                            .ok_or_else(|| MinuteParseError::NotANumber(n.to_string()))?;
                        check_range(u32::try_from(n).unwrap_or(u32::MAX))?
                    }
                    Value::String(s) => parse_minute_token(s.trim())?,
                    other => return Err(MinuteParseError::NotANumber(other.to_string())),
                };
                out.push(minute);
            }
            out.sort_unstable();
            Ok(out)
        }
    }
}

/// Accepts `12`, `12'`, `45+2` and `90'+4`.
fn parse_minute_token(token: &str) -> Result<u16, MinuteParseError> {
    parse_minute_parts(token).map(|(base, added)| base + added)
}

/// Splits a minute token into its nominal minute and added time: `45+2` is
/// `(45, 2)`, `61'` is `(61, 0)`. The sum must lie in 1..=130.
pub fn parse_minute_parts(token: &str) -> Result<(u16, u16), MinuteParseError> {
    let cleaned = token.replace(['\'', '’', ' '], "");
    let mut base = None;
    let mut added = 0u32;
    for part in cleaned.split('+') {
        let n = part
            .parse::<u32>()
            .map_err(|_| MinuteParseError::NotANumber(token.to_string()))?;
        match base {
            None => base = Some(n),
            Some(_) => added = added.saturating_add(n),
        }
    }
    let base = base.unwrap_or_default();
    check_range(base.saturating_add(added))?;
    // both parts are bounded by the checked total
    Ok((base as u16, added as u16))
}

fn check_range(minute: u32) -> Result<u16, MinuteParseError> {
    if minute == 0 || minute > u32::from(MAX_MINUTE) {
        return Err(MinuteParseError::OutOfRange(minute));
    }
    Ok(minute as u16)
}

pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let head = s.split(['T', ' ']).next().unwrap_or(s);
    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(head, fmt) {
            return Some(date);
        }
    }
    None
}

fn match_id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    let s = raw?.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

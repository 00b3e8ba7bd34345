//! Walk-forward evaluation over a stored match log.
//!
//! Every HOME-perspective record with known minutes is replayed: a snapshot is
//! built from matches strictly before its date, and the engine is asked about
//! each interval at the interval's first minute, with the score reconstructed
//! from goals before that minute. The outcome is whether any goal fell in the
//! interval.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibration::{self, BandHitRate, CalibrationBin, Metrics, Sample};
use crate::engine::{PredictionStatus, Predictor};
use crate::live_context::{LiveMatchContext, MatchStatus};
use crate::match_log::{MatchLog, MatchRecord, VenueSide};
use crate::recurrence::HistorySnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestOptions {
    /// Skip a match unless both teams have at least this many prior matches at
    /// their venue.
    pub min_history: usize,
    pub league: Option<String>,
    pub calibration_bins: usize,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            min_history: 5,
            league: None,
            calibration_bins: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub matches_evaluated: usize,
    pub matches_skipped: usize,
    pub metrics: Metrics,
    pub bins: Vec<CalibrationBin>,
    pub bands: Vec<BandHitRate>,
    #[serde(skip)]
    pub samples: Vec<Sample>,
}

pub fn run_backtest(log: &MatchLog, predictor: &Predictor, opts: &BacktestOptions) -> BacktestReport {
    let mut by_date: BTreeMap<NaiveDate, Vec<&MatchRecord>> = BTreeMap::new();
    for record in log.iter() {
        if record.venue != VenueSide::Home || !record.minutes_known {
            continue;
        }
        if let Some(league) = &opts.league
            && !record.league.eq_ignore_ascii_case(league)
        {
            continue;
        }
        by_date.entry(record.match_date).or_default().push(record);
    }

    let per_date = by_date
        .par_iter()
        .map(|(date, matches)| {
            let prior = log.filtered(|r| r.match_date < *date);
            let snapshot = predictor.build_snapshot(prior);
            let mut samples = Vec::new();
            let mut evaluated = 0usize;
            let mut skipped = 0usize;
            for record in matches {
                let home_n = snapshot.matches(&record.team, VenueSide::Home).len();
                let away_n = snapshot.matches(&record.opponent, VenueSide::Away).len();
                if home_n < opts.min_history || away_n < opts.min_history {
                    skipped += 1;
                    continue;
                }
                evaluated += 1;
                samples.extend(replay_match(predictor, &snapshot, record));
            }
            (evaluated, skipped, samples)
        })
        .collect::<Vec<_>>();

    let mut matches_evaluated = 0;
    let mut matches_skipped = 0;
    let mut samples = Vec::new();
    for (evaluated, skipped, s) in per_date {
        matches_evaluated += evaluated;
        matches_skipped += skipped;
        samples.extend(s);
    }

    let metrics = calibration::evaluate(&samples);
    info!(
        matches_evaluated,
        matches_skipped,
        samples = metrics.samples,
        brier = metrics.brier,
        "backtest finished"
    );

    BacktestReport {
        matches_evaluated,
        matches_skipped,
        metrics,
        bins: calibration::calibration_bins(&samples, opts.calibration_bins),
        bands: calibration::band_hit_rates(&samples),
        samples,
    }
}

fn replay_match(
    predictor: &Predictor,
    snapshot: &HistorySnapshot,
    record: &MatchRecord,
) -> Vec<Sample> {
    let taxonomy = snapshot.taxonomy();
    let max_minute = record.max_minute();
    let mut out = Vec::with_capacity(taxonomy.len());
    for id in taxonomy.ids() {
        let Some(def) = taxonomy.get(id) else {
            continue;
        };
        let start = def.start;
        let mut ctx = LiveMatchContext::new(&record.team, &record.opponent, &record.league);
        ctx.status = MatchStatus::Live;
        ctx.current_minute = start;
        ctx.home_score = goals_before(&record.goals_scored_minutes, start);
        ctx.away_score = goals_before(&record.goals_conceded_minutes, start);

        let result = predictor.evaluate(snapshot, &ctx);
        if result.status != PredictionStatus::Ready {
            continue;
        }
        let goal = record
            .goals_scored_minutes
            .iter()
            .chain(&record.goals_conceded_minutes)
            .any(|m| taxonomy.contains_in_match(id, *m, max_minute));
        out.push(Sample {
            prob: calibration::any_goal_probability(
                result.home_goal_probability,
                result.away_goal_probability,
            ),
            band: result.interpretation,
            goal,
        });
    }
    out
}

fn goals_before(minutes: &[u16], minute: u16) -> u32 {
    minutes.iter().filter(|m| **m < minute).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn rec(team: &str, opp: &str, venue: VenueSide, day: u64, scored: &[u16], conceded: &[u16]) -> MatchRecord {
        MatchRecord {
            match_id: None,
            team: team.to_string(),
            opponent: opp.to_string(),
            league: "L".to_string(),
            venue,
            goals_scored_minutes: scored.to_vec(),
            goals_conceded_minutes: conceded.to_vec(),
            match_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(day),
            minutes_known: true,
        }
    }

    #[test]
    fn walk_forward_uses_only_earlier_matches() {
        let mut records = Vec::new();
        for day in 0..6 {
            records.push(rec("A", "B", VenueSide::Home, day, &[20], &[]));
            records.push(rec("B", "A", VenueSide::Away, day, &[], &[20]));
        }
        let log = MatchLog::from_records(records);
        let predictor = Predictor::new(EngineConfig::default()).unwrap();
        let opts = BacktestOptions {
            min_history: 2,
            ..BacktestOptions::default()
        };
        let report = run_backtest(&log, &predictor, &opts);
        // days 0 and 1 lack history
        assert_eq!(report.matches_skipped, 2);
        assert_eq!(report.matches_evaluated, 4);
        assert_eq!(report.metrics.samples, 4 * 6);
        // one goal (16-30) per match
        assert!((report.metrics.base_rate - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn score_before_interval_is_reconstructed() {
        assert_eq!(goals_before(&[3, 16, 40], 16), 1);
        assert_eq!(goals_before(&[], 31), 0);
    }
}

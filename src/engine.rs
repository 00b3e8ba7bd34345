use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::danger::{DangerDetails, Interpretation, danger_score};
use crate::error::ConfigError;
use crate::intervals::Taxonomy;
use crate::live_context::{LiveMatchContext, MatchStatus};
use crate::match_log::MatchLog;
use crate::recommend::{Recommendation, recommend};
use crate::recurrence::HistorySnapshot;

pub const INSUFFICIENT_HISTORY: &str = "insufficient history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Ready,
    /// Neither side has any history at its venue; the score is 0.
    InsufficientHistory,
    /// The minute maps to no interval; no score is given.
    OutOfRange,
    NotLive(MatchStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub minute: u16,
    pub status: PredictionStatus,
    pub current_interval: Option<String>,
    pub danger_score: f64,
    pub interpretation: Interpretation,
    pub home_goal_probability: f64,
    pub away_goal_probability: f64,
    pub recommendation: Option<Recommendation>,
    pub details: Option<DangerDetails>,
    pub annotations: Vec<String>,
}

impl PredictionResult {
    fn blank(ctx: &LiveMatchContext, status: PredictionStatus) -> Self {
        Self {
            home_team: ctx.home_team.clone(),
            away_team: ctx.away_team.clone(),
            league: ctx.league.clone(),
            minute: ctx.current_minute,
            status,
            current_interval: None,
            danger_score: 0.0,
            interpretation: Interpretation::Low,
            home_goal_probability: 0.0,
            away_goal_probability: 0.0,
            recommendation: None,
            details: None,
            annotations: Vec::new(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.status == PredictionStatus::Ready && self.interpretation >= Interpretation::High
    }
}

/// Validated configuration plus its taxonomy. Evaluation is pure: the same
/// snapshot and context always produce the same result.
#[derive(Debug, Clone)]
pub struct Predictor {
    cfg: EngineConfig,
    taxonomy: Taxonomy,
}

impl Predictor {
    pub fn new(cfg: EngineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let taxonomy = cfg.taxonomy()?;
        Ok(Self { cfg, taxonomy })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn build_snapshot(&self, log: MatchLog) -> HistorySnapshot {
        HistorySnapshot::build(log, &self.taxonomy, &self.cfg)
    }

    pub fn evaluate(&self, history: &HistorySnapshot, ctx: &LiveMatchContext) -> PredictionResult {
        if !ctx.status.is_live() {
            let mut out = PredictionResult::blank(ctx, PredictionStatus::NotLive(ctx.status));
            out.annotations
                .push(format!("match not live ({})", ctx.status.as_str()));
            return out;
        }

        // interval ids are only meaningful against the taxonomy the snapshot was built with
        let taxonomy = history.taxonomy();
        let (score, details) = danger_score(history, taxonomy, ctx, &self.cfg);

        if details.out_of_range {
            let mut out = PredictionResult::blank(ctx, PredictionStatus::OutOfRange);
            out.annotations.push(format!(
                "minute {} is outside the match window",
                ctx.current_minute
            ));
            out.details = Some(details);
            return out;
        }

        let mut annotations = Vec::new();
        let status = if !details.home.has_history && !details.away.has_history {
            annotations.push(INSUFFICIENT_HISTORY.to_string());
            PredictionStatus::InsufficientHistory
        } else {
            for side in [&details.home, &details.away] {
                if !side.has_history {
                    annotations.push(format!("{INSUFFICIENT_HISTORY} for {}", side.team));
                }
            }
            PredictionStatus::Ready
        };
        for side in [&details.home, &details.away] {
            if side.has_history && side.momentum.is_none() {
                annotations.push(format!("no momentum signal for {}", side.team));
            }
        }

        let interpretation = Interpretation::from_score(score, &self.cfg.bands);
        let recommendation = recommend(score, &details, interpretation, taxonomy, &self.cfg);

        PredictionResult {
            home_team: ctx.home_team.clone(),
            away_team: ctx.away_team.clone(),
            league: ctx.league.clone(),
            minute: ctx.current_minute,
            status,
            current_interval: details.interval.clone(),
            danger_score: score,
            interpretation,
            home_goal_probability: details.home.goal_probability,
            away_goal_probability: details.away.goal_probability,
            recommendation: Some(recommendation),
            details: Some(details),
            annotations,
        }
    }

    /// Independent matches in parallel; output order follows `contexts`.
    pub fn evaluate_many(
        &self,
        history: &HistorySnapshot,
        contexts: &[LiveMatchContext],
    ) -> Vec<PredictionResult> {
        contexts
            .par_iter()
            .map(|ctx| self.evaluate(history, ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(minute: u16) -> LiveMatchContext {
        let mut ctx = LiveMatchContext::new("A", "B", "L");
        ctx.status = MatchStatus::Live;
        ctx.current_minute = minute;
        ctx
    }

    #[test]
    fn predictor_rejects_broken_config() {
        let mut cfg = EngineConfig::default();
        cfg.intervals.clear();
        assert!(Predictor::new(cfg).is_err());
    }

    #[test]
    fn not_live_is_refused() {
        let p = Predictor::new(EngineConfig::default()).unwrap();
        let snap = p.build_snapshot(MatchLog::new());
        for status in [MatchStatus::Pre, MatchStatus::HalfTime, MatchStatus::FullTime] {
            let mut ctx = live(30);
            ctx.status = status;
            let r = p.evaluate(&snap, &ctx);
            assert_eq!(r.status, PredictionStatus::NotLive(status));
            assert!(r.recommendation.is_none());
        }
    }

    #[test]
    fn empty_history_is_low_with_annotation() {
        let p = Predictor::new(EngineConfig::default()).unwrap();
        let snap = p.build_snapshot(MatchLog::new());
        let r = p.evaluate(&snap, &live(30));
        assert_eq!(r.status, PredictionStatus::InsufficientHistory);
        assert_eq!(r.danger_score, 0.0);
        assert_eq!(r.interpretation, Interpretation::Low);
        assert!(r.annotations.iter().any(|a| a == INSUFFICIENT_HISTORY));
    }

    #[test]
    fn minute_outside_window_is_flagged() {
        let p = Predictor::new(EngineConfig::default()).unwrap();
        let snap = p.build_snapshot(MatchLog::new());
        let r = p.evaluate(&snap, &live(0));
        assert_eq!(r.status, PredictionStatus::OutOfRange);
        assert!(r.details.as_ref().is_some_and(|d| d.out_of_range));
        let r = p.evaluate(&snap, &live(131));
        assert_eq!(r.status, PredictionStatus::OutOfRange);
    }
}

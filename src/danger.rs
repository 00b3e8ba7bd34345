//! Danger score composer.
//!
//! Each side's attack rate (its scored-recurrence in the current interval at
//! its venue) is scaled by its live event modifier, its recent-form ratio and
//! its saturation factor, in that order. The side's pressure is the mean of
//! that adjusted attack and the opponent's defensive weakness (the opponent's
//! conceded-recurrence), times a momentum multiplier when enough intensity
//! samples exist. The score is `score_scale * (home_pressure + away_pressure)`.
//! A side's goal probability reads its adjusted attack alone, so a side with no
//! history always reports 0.
//!
//! Every factor is a non-negative multiplier on a rate, so the score is
//! non-decreasing in every rate and is exactly 0 when neither side has history.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{BandThresholds, EngineConfig};
use crate::intervals::{Half, IntervalId, Taxonomy};
use crate::live_context::LiveMatchContext;
use crate::live_events::{EventModifier, Side, SideEvents, event_modifier};
use crate::match_log::VenueSide;
use crate::momentum::{IntensitySample, has_momentum_signal, momentum};
use crate::recurrence::{GoalKind, HistorySnapshot};
use crate::saturation::{self, SaturationValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpretation {
    Low,
    #[serde(alias = "MEDIUM")]
    Moderate,
    High,
    Critical,
}

impl Interpretation {
    /// Bands are half-open on the right: `[moderate, high)` is MODERATE and so on.
    pub fn from_score(score: f64, bands: &BandThresholds) -> Self {
        if score >= bands.critical {
            Interpretation::Critical
        } else if score >= bands.high {
            Interpretation::High
        } else if score >= bands.moderate {
            Interpretation::Moderate
        } else {
            Interpretation::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interpretation::Low => "LOW",
            Interpretation::Moderate => "MODERATE",
            Interpretation::High => "HIGH",
            Interpretation::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw per-side inputs, gathered from history and the live context.
#[derive(Debug, Clone, PartialEq)]
pub struct SideInputs {
    pub team: String,
    pub has_history: bool,
    pub matches_considered: usize,
    pub attack_rate: f64,
    pub defense_weakness: f64,
    pub form_ratio: f64,
    pub average_goals_half: f64,
    pub goals_so_far: u32,
    pub events: SideEvents,
    pub samples: Vec<IntensitySample>,
}

impl SideInputs {
    pub fn empty(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            has_history: false,
            matches_considered: 0,
            attack_rate: 0.0,
            defense_weakness: 0.0,
            form_ratio: 1.0,
            average_goals_half: 0.0,
            goals_so_far: 0,
            events: SideEvents::default(),
            samples: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideFactors {
    pub team: String,
    pub has_history: bool,
    pub matches_considered: usize,
    pub attack_rate: f64,
    pub defense_weakness: f64,
    pub events: SideEvents,
    pub event_modifier: EventModifier,
    pub form_ratio: f64,
    pub saturation: SaturationValue,
    /// `None` when fewer samples than the momentum window were observed.
    pub momentum: Option<f64>,
    pub momentum_multiplier: f64,
    /// Attack rate after event, form and saturation factors.
    pub adjusted_attack: f64,
    pub pressure: f64,
    /// `adjusted_attack / probability_norm`, clamped to [0, 1].
    pub goal_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DangerDetails {
    pub minute: u16,
    pub interval: Option<String>,
    pub half: Option<Half>,
    pub out_of_range: bool,
    pub home: SideFactors,
    pub away: SideFactors,
}

impl DangerDetails {
    pub fn side(&self, side: Side) -> &SideFactors {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn missing_history(&self) -> bool {
        !self.home.has_history || !self.away.has_history
    }
}

/// Gather one side's inputs for `interval`. Unknown teams yield zero rates.
pub fn side_inputs(
    history: &HistorySnapshot,
    ctx: &LiveMatchContext,
    side: Side,
    interval: IntervalId,
    half: Half,
    cfg: &EngineConfig,
) -> SideInputs {
    let team = ctx.team(side);
    let venue = match side {
        Side::Home => VenueSide::Home,
        Side::Away => VenueSide::Away,
    };
    let window = cfg.profile_window;
    let scored = history.recurrence_of(team, venue, interval, window, GoalKind::Scored);
    let conceded = history.recurrence_of(team, venue, interval, window, GoalKind::Conceded);
    SideInputs {
        team: team.to_string(),
        has_history: scored.has_history(),
        matches_considered: scored.matches_considered,
        attack_rate: scored.recurrence_rate,
        defense_weakness: conceded.recurrence_rate,
        form_ratio: history.form_ratio(team, venue),
        average_goals_half: history.average_goals_by_half(team, venue, half),
        goals_so_far: ctx.score(side),
        events: *ctx.events.side(side),
        samples: ctx.samples(side),
    }
}

/// Score the live context against history. The second value carries every
/// intermediate factor.
pub fn danger_score(
    history: &HistorySnapshot,
    taxonomy: &Taxonomy,
    ctx: &LiveMatchContext,
    cfg: &EngineConfig,
) -> (f64, DangerDetails) {
    let Some(interval) = taxonomy.interval_for_period(ctx.current_minute, ctx.current_half()) else {
        let home = SideInputs {
            events: ctx.events.home,
            goals_so_far: ctx.home_score,
            ..SideInputs::empty(ctx.home_team.clone())
        };
        let away = SideInputs {
            events: ctx.events.away,
            goals_so_far: ctx.away_score,
            ..SideInputs::empty(ctx.away_team.clone())
        };
        let (_, mut details) = compose(ctx.current_minute, None, None, &home, &away, cfg);
        details.out_of_range = true;
        return (0.0, details);
    };
    let half = taxonomy.half_of(interval);
    let home = side_inputs(history, ctx, Side::Home, interval, half, cfg);
    let away = side_inputs(history, ctx, Side::Away, interval, half, cfg);
    let (score, details) = compose(
        ctx.current_minute,
        Some(taxonomy.label(interval).to_string()),
        Some(half),
        &home,
        &away,
        cfg,
    );
    debug!(
        home = %ctx.home_team,
        away = %ctx.away_team,
        minute = ctx.current_minute,
        interval = taxonomy.label(interval),
        score,
        "danger score"
    );
    (score, details)
}

/// Pure composition over already-gathered inputs.
pub fn compose(
    minute: u16,
    interval: Option<String>,
    half: Option<Half>,
    home: &SideInputs,
    away: &SideInputs,
    cfg: &EngineConfig,
) -> (f64, DangerDetails) {
    let home_f = side_factors(home, away.defense_weakness, cfg);
    let away_f = side_factors(away, home.defense_weakness, cfg);
    let score = cfg.score_scale * (home_f.pressure + away_f.pressure);
    let score = if score.is_finite() { score.max(0.0) } else { 0.0 };
    (
        score,
        DangerDetails {
            minute,
            interval,
            half,
            out_of_range: false,
            home: home_f,
            away: away_f,
        },
    )
}

fn side_factors(own: &SideInputs, opponent_weakness: f64, cfg: &EngineConfig) -> SideFactors {
    let event = event_modifier(&own.events, &cfg.events);
    let sat = saturation::evaluate(own.goals_so_far, own.average_goals_half, &cfg.saturation);
    let adjusted_attack = own.attack_rate * event.total * own.form_ratio * sat.factor;

    let momentum_value = has_momentum_signal(&own.samples, cfg.momentum.window)
        .then(|| momentum(&own.samples, cfg.momentum.window, cfg.momentum.gain));
    let momentum_multiplier = match momentum_value {
        Some(m) => 1.0 + cfg.momentum.weight * (m - 0.5),
        None => 1.0,
    };

    let pressure = momentum_multiplier * (adjusted_attack + opponent_weakness) / 2.0;
    SideFactors {
        team: own.team.clone(),
        has_history: own.has_history,
        matches_considered: own.matches_considered,
        attack_rate: own.attack_rate,
        defense_weakness: own.defense_weakness,
        events: own.events,
        event_modifier: event,
        form_ratio: own.form_ratio,
        saturation: sat,
        momentum: momentum_value,
        momentum_multiplier,
        adjusted_attack,
        pressure,
        goal_probability: (adjusted_attack / cfg.probability_norm).clamp(0.0, 1.0),
    }
}

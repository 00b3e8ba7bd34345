use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::danger::{DangerDetails, Interpretation};
use crate::intervals::Taxonomy;

const TIE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    Pass,
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceTier::Pass => "PASS",
            ConfidenceTier::Low => "LOW",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::High => "HIGH",
        }
    }
}

impl From<Interpretation> for ConfidenceTier {
    fn from(band: Interpretation) -> Self {
        match band {
            Interpretation::Low => ConfidenceTier::Pass,
            Interpretation::Moderate => ConfidenceTier::Low,
            Interpretation::High => ConfidenceTier::Medium,
            Interpretation::Critical => ConfidenceTier::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikelySide {
    Home,
    Away,
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    NoBet,
    /// Worth watching, not worth a stake yet.
    Monitor,
    /// Over 0.5 goals before the interval ends.
    GoalInInterval,
    /// The likely side scores before the interval ends.
    TeamToScoreInInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub confidence: ConfidenceTier,
    pub market: Market,
    pub likely_side: LikelySide,
    pub action: String,
    pub minutes_left_in_interval: u16,
    /// Fewer than `closing_window_minutes` remain in the interval.
    pub closing_window: bool,
    pub home_goal_probability: f64,
    pub away_goal_probability: f64,
}

pub fn likely_side(details: &DangerDetails) -> LikelySide {
    let diff = details.home.adjusted_attack - details.away.adjusted_attack;
    if diff.abs() <= TIE_EPSILON {
        LikelySide::Either
    } else if diff > 0.0 {
        LikelySide::Home
    } else {
        LikelySide::Away
    }
}

/// Nominal end of the current interval minus the minute, floored at 0.
pub fn minutes_left(details: &DangerDetails, taxonomy: &Taxonomy) -> u16 {
    details
        .interval
        .as_deref()
        .and_then(|label| taxonomy.find_label(label))
        .and_then(|id| taxonomy.get(id))
        .map(|def| def.end.saturating_sub(details.minute))
        .unwrap_or(0)
}

pub fn recommend(
    danger_score: f64,
    details: &DangerDetails,
    interpretation: Interpretation,
    taxonomy: &Taxonomy,
    cfg: &EngineConfig,
) -> Recommendation {
    let confidence = ConfidenceTier::from(interpretation);
    let side = likely_side(details);
    let market = match (interpretation, side) {
        (Interpretation::Low, _) => Market::NoBet,
        (Interpretation::Moderate, _) => Market::Monitor,
        (Interpretation::Critical, LikelySide::Home | LikelySide::Away) => {
            Market::TeamToScoreInInterval
        }
        _ => Market::GoalInInterval,
    };
    let left = minutes_left(details, taxonomy);
    let closing_window = left < cfg.closing_window_minutes;
    let interval = details.interval.as_deref().unwrap_or("-");

    let mut action = match market {
        Market::NoBet => format!("No bet: danger {danger_score:.1} in {interval}"),
        Market::Monitor => format!("Monitor {interval}: danger {danger_score:.1}"),
        Market::GoalInInterval => {
            format!("Goal before the end of {interval} ({left} min left)")
        }
        Market::TeamToScoreInInterval => {
            let team = match side {
                LikelySide::Away => details.away.team.as_str(),
                _ => details.home.team.as_str(),
            };
            format!("{team} to score before the end of {interval} ({left} min left)")
        }
    };
    if closing_window && market != Market::NoBet {
        action.push_str(" - window closing");
    }

    Recommendation {
        confidence,
        market,
        likely_side: side,
        action,
        minutes_left_in_interval: left,
        closing_window,
        home_goal_probability: details.home.goal_probability,
        away_goal_probability: details.away.goal_probability,
    }
}

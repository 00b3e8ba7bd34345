//! Goal saturation: once a side has already produced its usual output for the
//! half, further goals are treated as less likely.
//!
//! Both forms are coarse heuristics, not fitted models. The composer always
//! applies the chosen form as a multiplier on the side's attack rate:
//! `Step` contributes `1 + adjustment`, `Dampener` contributes the score itself.

use serde::{Deserialize, Serialize};

use crate::config::{SaturationConfig, SaturationMode};
use crate::intervals::Half;
use crate::match_log::VenueSide;
use crate::recurrence::HistorySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturationValue {
    pub goals_so_far: u32,
    pub average_goals: f64,
    pub ratio: f64,
    /// Tiered additive adjustment (always reported, used only in `Step` mode).
    pub adjustment: f64,
    /// Continuous dampener (always reported, used only in `Dampener` mode).
    pub dampener: f64,
    /// What the composer multiplies the attack rate by.
    pub factor: f64,
}

/// `goals / average`, or 0 when there is no baseline to compare against.
pub fn saturation_ratio(goals_so_far: u32, average_goals: f64) -> f64 {
    if average_goals <= 0.0 || !average_goals.is_finite() {
        return 0.0;
    }
    f64::from(goals_so_far) / average_goals
}

pub fn step_adjustment(goals_so_far: u32, average_goals: f64, cfg: &SaturationConfig) -> f64 {
    let ratio = saturation_ratio(goals_so_far, average_goals);
    cfg.steps
        .iter()
        .find(|step| ratio < step.below)
        .map(|step| step.adjustment)
        .unwrap_or(cfg.above_adjustment)
}

/// `max(floor, 1 - max(0, (goals - avg) / (avg + 1)))`, in [floor, 1].
pub fn saturation_score(goals_so_far: u32, average_goals: f64, floor: f64) -> f64 {
    let avg = average_goals.max(0.0);
    let excess = ((f64::from(goals_so_far) - avg) / (avg + 1.0)).max(0.0);
    (1.0 - excess).max(floor)
}

pub fn evaluate(goals_so_far: u32, average_goals: f64, cfg: &SaturationConfig) -> SaturationValue {
    let adjustment = step_adjustment(goals_so_far, average_goals, cfg);
    let dampener = saturation_score(goals_so_far, average_goals, cfg.dampener_floor);
    let factor = match cfg.mode {
        SaturationMode::Step => 1.0 + adjustment,
        SaturationMode::Dampener => dampener,
    };
    SaturationValue {
        goals_so_far,
        average_goals,
        ratio: saturation_ratio(goals_so_far, average_goals),
        adjustment,
        dampener,
        factor,
    }
}

/// Signed tiered adjustment for `team`, using its historical average goals
/// scored by the end of `half` at `venue`.
pub fn saturation_adjustment(
    history: &HistorySnapshot,
    team: &str,
    venue: VenueSide,
    goals_so_far: u32,
    half: Half,
    cfg: &SaturationConfig,
) -> f64 {
    let average = history.average_goals_by_half(team, venue, half);
    step_adjustment(goals_so_far, average, cfg)
}

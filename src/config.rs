use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::intervals::{IntervalDefinition, Taxonomy, standard_intervals};
use crate::recurrence::Window;

/// Every tunable of the engine. All fields default, so a config file only needs
/// the knobs it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub intervals: Vec<IntervalDefinition>,
    pub first_half_overflow_ceiling: u16,
    pub full_time_overflow_ceiling: u16,
    /// History window the composer reads rates from.
    pub profile_window: Window,
    /// Matches in the "recent" side of the form ratio.
    pub form_window: usize,
    pub form_min: f64,
    pub form_max: f64,
    pub saturation: SaturationConfig,
    pub events: EventConfig,
    pub momentum: MomentumConfig,
    /// Converts summed side pressure into the danger score scale (typically 0-10).
    pub score_scale: f64,
    pub bands: BandThresholds,
    /// Divides a side's pressure into its goal probability.
    pub probability_norm: f64,
    /// Minutes left in the interval below which the recommendation warns that
    /// the window is closing.
    pub closing_window_minutes: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intervals: standard_intervals(),
            first_half_overflow_ceiling: 60,
            full_time_overflow_ceiling: 130,
            profile_window: Window::AllTime,
            form_window: 5,
            form_min: 0.5,
            form_max: 2.0,
            saturation: SaturationConfig::default(),
            events: EventConfig::default(),
            momentum: MomentumConfig::default(),
            score_scale: 5.0,
            bands: BandThresholds::default(),
            probability_norm: 1.5,
            closing_window_minutes: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationMode {
    /// Tiered adjustment, applied as a `1 + adjustment` factor.
    Step,
    /// Continuous dampener in [floor, 1].
    Dampener,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturationStep {
    /// Applies while `ratio < below`.
    pub below: f64,
    pub adjustment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaturationConfig {
    pub mode: SaturationMode,
    pub steps: Vec<SaturationStep>,
    pub above_adjustment: f64,
    pub dampener_floor: f64,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self {
            mode: SaturationMode::Step,
            steps: vec![
                SaturationStep { below: 0.75, adjustment: 0.05 },
                SaturationStep { below: 1.00, adjustment: -0.05 },
                SaturationStep { below: 1.25, adjustment: -0.10 },
                SaturationStep { below: 1.50, adjustment: -0.15 },
            ],
            above_adjustment: -0.20,
            dampener_floor: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub red_card_step: f64,
    pub red_card_floor: f64,
    pub penalty_step: f64,
    pub penalty_cap: f64,
    pub injury_step: f64,
    pub injury_floor: f64,
    /// Bounds on the product of the three per-kind modifiers.
    pub min_total: f64,
    pub max_total: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            red_card_step: 0.3,
            red_card_floor: 0.4,
            penalty_step: 0.4,
            penalty_cap: 2.0,
            injury_step: 0.15,
            injury_floor: 0.6,
            min_total: 0.2,
            max_total: 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub window: usize,
    pub gain: f64,
    /// Pressure multiplier is `1 + weight * (momentum - 0.5)`.
    pub weight: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window: 5,
            gain: 0.7,
            weight: 0.6,
        }
    }
}

/// Lower bounds of the MODERATE, HIGH and CRITICAL bands. Anything below
/// `moderate` is LOW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandThresholds {
    pub moderate: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            moderate: 2.0,
            high: 4.0,
            critical: 6.0,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let cfg: EngineConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads `GOALWATCH_CONFIG` when set, then applies scalar overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var("GOALWATCH_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        if let Some(n) = env_parse::<usize>("GOALWATCH_FORM_WINDOW") {
            cfg.form_window = n;
        }
        if let Some(n) = env_parse::<usize>("GOALWATCH_MOMENTUM_WINDOW") {
            cfg.momentum.window = n;
        }
        if let Ok(raw) = std::env::var("GOALWATCH_SATURATION_MODE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "step" => cfg.saturation.mode = SaturationMode::Step,
                "dampener" => cfg.saturation.mode = SaturationMode::Dampener,
                _ => {}
            }
        }
        if let Ok(raw) = std::env::var("GOALWATCH_PROFILE_WINDOW") {
            let raw = raw.trim().to_ascii_lowercase();
            if raw == "all" || raw == "all_time" {
                cfg.profile_window = Window::AllTime;
            } else if let Ok(n) = raw.parse::<usize>() {
                cfg.profile_window = Window::Recent(n);
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn taxonomy(&self) -> Result<Taxonomy, ConfigError> {
        Taxonomy::new(self.intervals.clone())?.with_overflow_ceilings(
            self.first_half_overflow_ceiling,
            self.full_time_overflow_ceiling,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.taxonomy()?;

        let b = self.bands;
        let finite = b.moderate.is_finite() && b.high.is_finite() && b.critical.is_finite();
        if !finite || !(b.moderate < b.high && b.high < b.critical) {
            return Err(ConfigError::InvalidBands);
        }

        self.validate_saturation()?;
        self.validate_events()?;

        let m = self.momentum;
        if m.window == 0 || !(m.gain.is_finite() && m.gain > 0.0) || !(0.0..=2.0).contains(&m.weight)
        {
            return Err(ConfigError::InvalidMomentum);
        }

        if self.form_window == 0 || matches!(self.profile_window, Window::Recent(0)) {
            return Err(ConfigError::InvalidWindow);
        }
        if !(self.form_min > 0.0 && self.form_min <= 1.0 && self.form_max >= 1.0)
            || !self.form_max.is_finite()
        {
            return Err(ConfigError::NonPositive("form bounds"));
        }
        if !(self.score_scale.is_finite() && self.score_scale > 0.0) {
            return Err(ConfigError::NonPositive("score_scale"));
        }
        if !(self.probability_norm.is_finite() && self.probability_norm > 0.0) {
            return Err(ConfigError::NonPositive("probability_norm"));
        }
        Ok(())
    }

    fn validate_saturation(&self) -> Result<(), ConfigError> {
        let s = &self.saturation;
        let mut prev_below = f64::NEG_INFINITY;
        let mut prev_adj = f64::INFINITY;
        for step in &s.steps {
            let ok = step.below.is_finite()
                && step.adjustment.is_finite()
                && step.below > prev_below
                && step.adjustment <= prev_adj
                && step.adjustment > -1.0;
            if !ok {
                return Err(ConfigError::InvalidSaturationSteps);
            }
            prev_below = step.below;
            prev_adj = step.adjustment;
        }
        if !(s.above_adjustment <= prev_adj && s.above_adjustment > -1.0) {
            return Err(ConfigError::InvalidSaturationSteps);
        }
        if !(s.dampener_floor > 0.0 && s.dampener_floor <= 1.0) {
            return Err(ConfigError::InvalidSaturationSteps);
        }
        Ok(())
    }

    fn validate_events(&self) -> Result<(), ConfigError> {
        let e = self.events;
        let steps_ok = [e.red_card_step, e.penalty_step, e.injury_step]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        let floors_ok = [e.red_card_floor, e.injury_floor]
            .iter()
            .all(|v| *v > 0.0 && *v <= 1.0);
        let bounds_ok = e.penalty_cap >= 1.0
            && e.penalty_cap.is_finite()
            && e.min_total > 0.0
            && e.min_total <= 1.0
            && e.max_total >= 1.0
            && e.max_total.is_finite();
        if steps_ok && floors_ok && bounds_ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidEventBounds)
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"score_scale": 6.0, "momentum": {"window": 8}}"#).unwrap();
        assert_eq!(cfg.score_scale, 6.0);
        assert_eq!(cfg.momentum.window, 8);
        assert_eq!(cfg.momentum.gain, 0.7);
        assert_eq!(cfg.intervals.len(), 6);
        cfg.validate().unwrap();
    }

    #[test]
    fn non_monotonic_bands_are_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.bands.high = 1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBands)));
    }

    #[test]
    fn increasing_saturation_adjustments_are_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.saturation.steps[1].adjustment = 0.10;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidSaturationSteps)
        ));
    }

    #[test]
    fn broken_taxonomy_fails_validation() {
        let mut cfg = EngineConfig::default();
        cfg.intervals.remove(2);
        assert!(matches!(cfg.validate(), Err(ConfigError::IntervalGap { .. })));
    }
}

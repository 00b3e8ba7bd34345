use serde::{Deserialize, Serialize};

/// One observation of a side's attacking output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensitySample {
    #[serde(alias = "tirs")]
    pub shots: f64,
    pub attacks: f64,
    pub dangerous_attacks: f64,
    pub corners: f64,
}

impl IntensitySample {
    pub fn total(&self) -> f64 {
        self.shots + self.attacks + self.dangerous_attacks + self.corners
    }
}

/// Recent attacking intensity relative to the whole match, in [0, 1].
/// 0.5 means "same as usual". Returns 0.0 when fewer than `window` samples exist
/// or the match has shown no activity at all.
pub fn momentum(samples: &[IntensitySample], window: usize, gain: f64) -> f64 {
    if window == 0 || samples.len() < window {
        return 0.0;
    }
    let overall_avg = mean(samples.iter().map(IntensitySample::total), samples.len());
    if overall_avg <= 0.0 {
        return 0.0;
    }
    let recent = &samples[samples.len() - window..];
    let recent_avg = mean(recent.iter().map(IntensitySample::total), window);
    let ratio = recent_avg / overall_avg;
    ((ratio - 1.0) * gain + 0.5).clamp(0.0, 1.0)
}

/// Whether `momentum` would have enough samples to say anything.
pub fn has_momentum_signal(samples: &[IntensitySample], window: usize) -> bool {
    window > 0 && samples.len() >= window
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    values.sum::<f64>() / n as f64
}

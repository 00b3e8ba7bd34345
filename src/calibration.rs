use serde::{Deserialize, Serialize};

use crate::danger::Interpretation;

/// One scored prediction: probability that a goal falls in the interval, the
/// band it was given, and whether a goal actually came.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub prob: f64,
    pub band: Interpretation,
    pub goal: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    /// Share of samples where `prob >= 0.5` agreed with the outcome.
    pub accuracy: f64,
    pub base_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandHitRate {
    pub band: Interpretation,
    pub count: usize,
    pub hit_rate: f64,
}

/// Goal in the interval from either side, treating the two as independent.
pub fn any_goal_probability(home: f64, away: f64) -> f64 {
    1.0 - (1.0 - home.clamp(0.0, 1.0)) * (1.0 - away.clamp(0.0, 1.0))
}

pub fn evaluate(samples: &[Sample]) -> Metrics {
    if samples.is_empty() {
        return Metrics::default();
    }
    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;
    let mut goals = 0usize;
    for s in samples {
        let y = if s.goal { 1.0 } else { 0.0 };
        let p = s.prob.clamp(0.0, 1.0);
        brier_sum += (p - y).powi(2);
        let p_actual = if s.goal { p } else { 1.0 - p }.clamp(1e-12, 1.0);
        log_loss_sum += -p_actual.ln();
        if (p >= 0.5) == s.goal {
            correct += 1;
        }
        if s.goal {
            goals += 1;
        }
    }
    let n = samples.len() as f64;
    Metrics {
        samples: samples.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
        base_rate: goals as f64 / n,
    }
}

pub fn calibration_bins(samples: &[Sample], bins: usize) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for s in samples {
        let p = s.prob.clamp(0.0, 1.0);
        let idx = ((p * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += p;
        if s.goal {
            actual_sum[idx] += 1.0;
        }
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (avg_pred, actual_rate) = if count > 0 {
                (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

/// Hit rate per band, LOW first. Bands with no samples are still listed.
pub fn band_hit_rates(samples: &[Sample]) -> Vec<BandHitRate> {
    [
        Interpretation::Low,
        Interpretation::Moderate,
        Interpretation::High,
        Interpretation::Critical,
    ]
    .into_iter()
    .map(|band| {
        let in_band = samples.iter().filter(|s| s.band == band);
        let (count, hits) = in_band.fold((0usize, 0usize), |(c, h), s| (c + 1, h + usize::from(s.goal)));
        BandHitRate {
            band,
            count,
            hit_rate: if count > 0 { hits as f64 / count as f64 } else { 0.0 },
        }
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(prob: f64, band: Interpretation, goal: bool) -> Sample {
        Sample { prob, band, goal }
    }

    #[test]
    fn perfect_predictions_have_zero_brier() {
        let m = evaluate(&[
            s(1.0, Interpretation::Critical, true),
            s(0.0, Interpretation::Low, false),
        ]);
        assert_eq!(m.samples, 2);
        assert!(m.brier < 1e-12);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.base_rate, 0.5);
    }

    #[test]
    fn coin_flip_log_loss_is_ln2() {
        let m = evaluate(&[
            s(0.5, Interpretation::Moderate, true),
            s(0.5, Interpretation::Moderate, false),
        ]);
        assert!((m.log_loss - std::f64::consts::LN_2).abs() < 1e-12);
        assert!((m.brier - 0.25).abs() < 1e-12);
    }

    #[test]
    fn bins_partition_samples() {
        let samples = [
            s(0.05, Interpretation::Low, false),
            s(0.95, Interpretation::High, true),
            s(1.0, Interpretation::Critical, true),
        ];
        let bins = calibration_bins(&samples, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(bins[9].count, 2);
        assert_eq!(bins[9].actual_rate, 1.0);
    }

    #[test]
    fn band_rates_list_every_band() {
        let rates = band_hit_rates(&[
            s(0.2, Interpretation::High, true),
            s(0.2, Interpretation::High, false),
        ]);
        assert_eq!(rates.len(), 4);
        assert_eq!(rates[2].count, 2);
        assert_eq!(rates[2].hit_rate, 0.5);
        assert_eq!(rates[0].count, 0);
    }

    #[test]
    fn any_goal_combines_sides() {
        assert_eq!(any_goal_probability(0.0, 0.0), 0.0);
        assert!((any_goal_probability(0.5, 0.5) - 0.75).abs() < 1e-12);
    }
}

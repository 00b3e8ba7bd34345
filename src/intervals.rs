use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const HALF_TIME_MINUTE: u16 = 45;
pub const FULL_TIME_MINUTE: u16 = 90;
/// Highest minute accepted anywhere (extra time included).
pub const MAX_MINUTE: u16 = 130;

const DEFAULT_FIRST_HALF_CEILING: u16 = 60;
const DEFAULT_FULL_TIME_CEILING: u16 = MAX_MINUTE;

static STANDARD: Lazy<Taxonomy> = Lazy::new(|| {
    Taxonomy::from_sorted(
        standard_intervals(),
        DEFAULT_FIRST_HALF_CEILING,
        DEFAULT_FULL_TIME_CEILING,
    )
});

static TEN_MINUTE: Lazy<Taxonomy> = Lazy::new(|| {
    Taxonomy::from_sorted(
        ten_minute_intervals(),
        DEFAULT_FIRST_HALF_CEILING,
        DEFAULT_FULL_TIME_CEILING,
    )
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalDefinition {
    pub label: String,
    pub start: u16,
    pub end: u16,
}

impl IntervalDefinition {
    pub fn new(label: impl Into<String>, start: u16, end: u16) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    pub fn width(&self) -> u16 {
        self.end - self.start + 1
    }
}

/// Index of an interval inside its taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntervalId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Half {
    First,
    Second,
}

impl Half {
    pub fn of_minute(minute: u16) -> Self {
        if minute <= HALF_TIME_MINUTE {
            Half::First
        } else {
            Half::Second
        }
    }
}

/// Ordered, gap-free partition of minutes 1..=90. Minutes 91..=130 fold into the
/// interval that closes the match.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    intervals: Vec<IntervalDefinition>,
    first_half_ceiling: u16,
    full_time_ceiling: u16,
}

impl Taxonomy {
    pub fn new(mut intervals: Vec<IntervalDefinition>) -> Result<Self, ConfigError> {
        if intervals.is_empty() {
            return Err(ConfigError::EmptyTaxonomy);
        }
        for def in &intervals {
            if def.start > def.end {
                return Err(ConfigError::InvalidInterval {
                    label: def.label.clone(),
                    start: def.start,
                    end: def.end,
                });
            }
        }
        intervals.sort_by_key(|d| (d.start, d.end));

        for pair in intervals.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start <= prev.end {
                return Err(ConfigError::IntervalOverlap {
                    label: prev.label.clone(),
                    other: next.label.clone(),
                });
            }
            if next.start != prev.end + 1 {
                return Err(ConfigError::IntervalGap {
                    after: prev.end,
                    next_start: next.start,
                });
            }
        }
        let mut labels = intervals.iter().map(|d| d.label.as_str()).collect::<Vec<_>>();
        labels.sort_unstable();
        if let Some(dup) = labels.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::DuplicateLabel(dup[0].to_string()));
        }

        let first = intervals[0].start;
        let last = intervals[intervals.len() - 1].end;
        if first != 1 || last != FULL_TIME_MINUTE {
            return Err(ConfigError::TaxonomyCoverage { first, last });
        }

        Ok(Self::from_sorted(
            intervals,
            DEFAULT_FIRST_HALF_CEILING,
            DEFAULT_FULL_TIME_CEILING,
        ))
    }

    fn from_sorted(
        intervals: Vec<IntervalDefinition>,
        first_half_ceiling: u16,
        full_time_ceiling: u16,
    ) -> Self {
        Self {
            intervals,
            first_half_ceiling,
            full_time_ceiling,
        }
    }

    /// The six 15-minute intervals used for live prediction.
    pub fn standard() -> &'static Taxonomy {
        &STANDARD
    }

    /// Nine 10-minute buckets, as some historical sources publish them.
    pub fn ten_minute() -> &'static Taxonomy {
        &TEN_MINUTE
    }

    pub fn with_overflow_ceilings(
        mut self,
        first_half: u16,
        full_time: u16,
    ) -> Result<Self, ConfigError> {
        if !(HALF_TIME_MINUTE..=MAX_MINUTE).contains(&first_half)
            || !(FULL_TIME_MINUTE..=MAX_MINUTE).contains(&full_time)
        {
            return Err(ConfigError::InvalidOverflowCeiling {
                first_half,
                full_time,
            });
        }
        self.first_half_ceiling = first_half;
        self.full_time_ceiling = full_time;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = IntervalId> + '_ {
        (0..self.intervals.len()).map(IntervalId)
    }

    pub fn definitions(&self) -> &[IntervalDefinition] {
        &self.intervals
    }

    pub fn get(&self, id: IntervalId) -> Option<&IntervalDefinition> {
        self.intervals.get(id.0)
    }

    pub fn label(&self, id: IntervalId) -> &str {
        self.intervals
            .get(id.0)
            .map(|d| d.label.as_str())
            .unwrap_or("")
    }

    pub fn find_label(&self, label: &str) -> Option<IntervalId> {
        let want = label.trim();
        self.intervals
            .iter()
            .position(|d| d.label.eq_ignore_ascii_case(want))
            .map(IntervalId)
    }

    /// `None` for minute 0 (nothing elapsed yet) and anything past `MAX_MINUTE`.
    pub fn interval_for(&self, minute: u16) -> Option<IntervalId> {
        if minute == 0 || minute > MAX_MINUTE {
            return None;
        }
        if minute > FULL_TIME_MINUTE {
            return Some(IntervalId(self.intervals.len() - 1));
        }
        self.intervals
            .iter()
            .position(|d| d.start <= minute && minute <= d.end)
            .map(IntervalId)
    }

    /// `interval_for` with the period the clock is in. First-half stoppage
    /// (minute past 45 while the first half is still running) stays in the
    /// interval holding minute 45.
    pub fn interval_for_period(&self, minute: u16, period: Option<Half>) -> Option<IntervalId> {
        if period == Some(Half::First) && minute > HALF_TIME_MINUTE && minute <= MAX_MINUTE {
            return self.interval_for(HALF_TIME_MINUTE);
        }
        self.interval_for(minute)
    }

    pub fn half_of(&self, id: IntervalId) -> Half {
        let end = self.get(id).map(|d| d.end).unwrap_or(FULL_TIME_MINUTE);
        Half::of_minute(end)
    }

    /// Which half the interval closes, if its nominal end is minute 45 or 90.
    pub fn closes_half(&self, id: IntervalId) -> Option<Half> {
        match self.get(id)?.end {
            HALF_TIME_MINUTE => Some(Half::First),
            FULL_TIME_MINUTE => Some(Half::Second),
            _ => None,
        }
    }

    /// Upper bound of the interval for one specific historical match. Half-closing
    /// intervals stretch to the latest minute observed in that match so that
    /// stoppage-time goals stay in the interval they were scored in.
    pub fn effective_end(&self, id: IntervalId, match_max_minute: u16) -> u16 {
        let Some(def) = self.get(id) else {
            return 0;
        };
        match self.closes_half(id) {
            Some(Half::First) => def.end.max(match_max_minute.min(self.first_half_ceiling)),
            Some(Half::Second) => def.end.max(match_max_minute.min(self.full_time_ceiling)),
            None => def.end,
        }
    }

    pub fn contains_in_match(&self, id: IntervalId, minute: u16, match_max_minute: u16) -> bool {
        let Some(def) = self.get(id) else {
            return false;
        };
        minute >= def.start && minute <= self.effective_end(id, match_max_minute)
    }

    /// Per-interval goal counts for one list of minutes.
    pub fn bucket_minutes(&self, minutes: &[u16]) -> Vec<f64> {
        let mut out = vec![0.0; self.intervals.len()];
        for minute in minutes {
            if let Some(id) = self.interval_for(*minute) {
                out[id.0] += 1.0;
            }
        }
        out
    }
}

/// Re-bucket counts from one taxonomy into another, splitting each source bucket
/// across the target buckets it overlaps in proportion to the shared minutes.
/// Going from 10- to 15-minute buckets this splits 11-20, 41-50 and 71-80 evenly.
pub fn resample(counts: &[f64], from: &Taxonomy, to: &Taxonomy) -> Vec<f64> {
    let mut out = vec![0.0; to.len()];
    for (src, count) in from.definitions().iter().zip(counts) {
        if *count == 0.0 {
            continue;
        }
        let width = f64::from(src.width());
        for (slot, dst) in out.iter_mut().zip(to.definitions()) {
            let lo = src.start.max(dst.start);
            let hi = src.end.min(dst.end);
            if lo > hi {
                continue;
            }
            *slot += count * f64::from(hi - lo + 1) / width;
        }
    }
    out
}

pub fn standard_intervals() -> Vec<IntervalDefinition> {
    vec![
        IntervalDefinition::new("0-15", 1, 15),
        IntervalDefinition::new("16-30", 16, 30),
        IntervalDefinition::new("31-45+", 31, 45),
        IntervalDefinition::new("46-60", 46, 60),
        IntervalDefinition::new("61-75", 61, 75),
        IntervalDefinition::new("76-90+", 76, 90),
    ]
}

pub fn ten_minute_intervals() -> Vec<IntervalDefinition> {
    (0..9u16)
        .map(|i| {
            let start = i * 10 + 1;
            let end = i * 10 + 10;
            IntervalDefinition::new(format!("{start}-{end}"), start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_regulation_minute_has_exactly_one_interval() {
        let tax = Taxonomy::standard();
        for minute in 1..=FULL_TIME_MINUTE {
            let hits = tax
                .definitions()
                .iter()
                .filter(|d| d.start <= minute && minute <= d.end)
                .count();
            assert_eq!(hits, 1, "minute {minute}");
            assert!(tax.interval_for(minute).is_some());
        }
    }

    #[test]
    fn out_of_window_minutes_have_no_interval() {
        let tax = Taxonomy::standard();
        assert_eq!(tax.interval_for(0), None);
        assert_eq!(tax.interval_for(131), None);
        assert_eq!(tax.label(tax.interval_for(94).unwrap()), "76-90+");
        assert_eq!(tax.label(tax.interval_for(130).unwrap()), "76-90+");
        assert_eq!(tax.label(tax.interval_for(45).unwrap()), "31-45+");
        assert_eq!(tax.label(tax.interval_for(46).unwrap()), "46-60");
    }

    #[test]
    fn overflow_ceilings_are_bounded() {
        let tax = || Taxonomy::new(standard_intervals()).unwrap();
        assert!(matches!(
            tax().with_overflow_ceilings(40, 130),
            Err(ConfigError::InvalidOverflowCeiling { first_half: 40, full_time: 130 })
        ));
        assert!(matches!(
            tax().with_overflow_ceilings(60, 140),
            Err(ConfigError::InvalidOverflowCeiling { .. })
        ));
        let ok = tax().with_overflow_ceilings(50, 100).unwrap();
        let closing = ok.find_label("31-45+").unwrap();
        assert_eq!(ok.effective_end(closing, 58), 50);
    }

    #[test]
    fn first_half_stoppage_stays_before_the_break() {
        let tax = Taxonomy::standard();
        let at = |minute, period| tax.interval_for_period(minute, period).map(|id| tax.label(id));
        assert_eq!(at(47, Some(Half::First)), Some("31-45+"));
        assert_eq!(at(47, Some(Half::Second)), Some("46-60"));
        assert_eq!(at(47, None), Some("46-60"));
        assert_eq!(at(20, Some(Half::First)), Some("16-30"));
        assert_eq!(at(0, Some(Half::First)), None);
    }

    #[test]
    fn gaps_and_overlaps_are_rejected() {
        let gap = vec![
            IntervalDefinition::new("a", 1, 40),
            IntervalDefinition::new("b", 42, 90),
        ];
        assert!(matches!(
            Taxonomy::new(gap),
            Err(ConfigError::IntervalGap { after: 40, next_start: 42 })
        ));

        let overlap = vec![
            IntervalDefinition::new("a", 1, 45),
            IntervalDefinition::new("b", 45, 90),
        ];
        assert!(matches!(
            Taxonomy::new(overlap),
            Err(ConfigError::IntervalOverlap { .. })
        ));

        let short = vec![IntervalDefinition::new("a", 1, 80)];
        assert!(matches!(
            Taxonomy::new(short),
            Err(ConfigError::TaxonomyCoverage { first: 1, last: 80 })
        ));
    }

    #[test]
    fn half_closing_intervals_stretch_to_the_match_stoppage() {
        let tax = Taxonomy::standard();
        let end_first = tax.find_label("31-45+").unwrap();
        assert!(tax.contains_in_match(end_first, 47, 47));
        assert!(!tax.contains_in_match(end_first, 47, 45));
        assert_eq!(tax.effective_end(end_first, 75), 60);

        let end_match = tax.find_label("76-90+").unwrap();
        assert!(tax.contains_in_match(end_match, 94, 94));
        assert_eq!(tax.effective_end(end_match, 12), 90);

        let middle = tax.find_label("16-30").unwrap();
        assert_eq!(tax.effective_end(middle, 80), 30);
    }

    #[test]
    fn resampling_splits_straddling_buckets_evenly() {
        let mut counts = vec![0.0; 9];
        counts[1] = 2.0; // 11-20
        let out = resample(&counts, Taxonomy::ten_minute(), Taxonomy::standard());
        assert_eq!(out[0], 1.0);
        assert_eq!(out[1], 1.0);
        assert!(out[2..].iter().all(|c| *c == 0.0));
    }

    #[test]
    fn resampling_conserves_total_goals() {
        let minutes = [3, 14, 19, 33, 44, 48, 52, 67, 71, 79, 88, 92];
        let ten = Taxonomy::ten_minute().bucket_minutes(&minutes);
        let fifteen = resample(&ten, Taxonomy::ten_minute(), Taxonomy::standard());
        let before: f64 = ten.iter().sum();
        let after: f64 = fifteen.iter().sum();
        assert!((before - after).abs() < 1e-9);
        assert_eq!(before, minutes.len() as f64);
    }
}

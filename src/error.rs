use thiserror::Error;

/// Raised once, while building the engine. A bad taxonomy or band table would
/// silently corrupt every later evaluation, so construction refuses it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("interval taxonomy is empty")]
    EmptyTaxonomy,
    #[error("interval `{label}` has start {start} > end {end}")]
    InvalidInterval { label: String, start: u16, end: u16 },
    #[error("interval taxonomy has a gap after minute {after} (next interval starts at {next_start})")]
    IntervalGap { after: u16, next_start: u16 },
    #[error("intervals `{label}` and `{other}` overlap")]
    IntervalOverlap { label: String, other: String },
    #[error("interval taxonomy must cover minutes 1..=90, got {first}..={last}")]
    TaxonomyCoverage { first: u16, last: u16 },
    #[error(
        "overflow ceilings must be 45..=130 for the first half and 90..=130 for full time, got {first_half} and {full_time}"
    )]
    InvalidOverflowCeiling { first_half: u16, full_time: u16 },
    #[error("duplicate interval label `{0}`")]
    DuplicateLabel(String),
    #[error("interpretation band thresholds must be finite and strictly increasing")]
    InvalidBands,
    #[error("saturation steps must have increasing ratios and non-increasing adjustments")]
    InvalidSaturationSteps,
    #[error("event modifier coefficients or bounds are invalid")]
    InvalidEventBounds,
    #[error("momentum settings are invalid")]
    InvalidMomentum,
    #[error("window size must be at least 1")]
    InvalidWindow,
    #[error("{0} must be finite and positive")]
    NonPositive(&'static str),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinuteParseError {
    #[error("`{0}` is not a goal minute")]
    NotANumber(String),
    #[error("minute {0} is outside 1..=130")]
    OutOfRange(u32),
}

/// Why an external row never became a `MatchRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum QuarantineReason {
    #[error("team name missing")]
    MissingTeam,
    #[error("opponent name missing")]
    MissingOpponent,
    #[error("match date missing")]
    MissingDate,
    #[error("unparsable match date `{0}`")]
    BadDate(String),
    #[error("unknown venue side `{0}`")]
    BadVenue(String),
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::ingest::parse_minute_parts;
use crate::intervals::Half;
use crate::live_events::{LiveEventCounts, Side, SideEvents};
use crate::momentum::IntensitySample;

/// Match lifecycle as reported by the live feed. `Live` is in play with the
/// period unknown; `FirstHalf` and `SecondHalf` carry it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    #[default]
    #[serde(alias = "NS", alias = "pre", alias = "scheduled")]
    Pre,
    #[serde(alias = "live", alias = "in_play")]
    Live,
    #[serde(alias = "1H", alias = "first_half")]
    FirstHalf,
    #[serde(alias = "2H", alias = "second_half")]
    SecondHalf,
    #[serde(alias = "HT", alias = "halftime", alias = "half_time")]
    HalfTime,
    #[serde(alias = "FT", alias = "fulltime", alias = "full_time", alias = "finished")]
    FullTime,
}

impl MatchStatus {
    pub fn is_live(self) -> bool {
        matches!(
            self,
            MatchStatus::Live | MatchStatus::FirstHalf | MatchStatus::SecondHalf
        )
    }

    pub fn period(self) -> Option<Half> {
        match self {
            MatchStatus::FirstHalf => Some(Half::First),
            MatchStatus::SecondHalf => Some(Half::Second),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pre => "PRE",
            MatchStatus::Live => "LIVE",
            MatchStatus::FirstHalf => "FIRST_HALF",
            MatchStatus::SecondHalf => "SECOND_HALF",
            MatchStatus::HalfTime => "HALF_TIME",
            MatchStatus::FullTime => "FULL_TIME",
        }
    }
}

/// Both sides' intensity counters from one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensitySnapshot {
    pub home: IntensitySample,
    pub away: IntensitySample,
}

impl IntensitySnapshot {
    pub fn side(&self, side: Side) -> &IntensitySample {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

/// Match clock as the feed shows it: `45+2` is base 45 with 2 added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LiveMinute {
    pub base: u16,
    #[serde(default)]
    pub added: u16,
}

impl LiveMinute {
    pub fn new(base: u16, added: u16) -> Self {
        Self { base, added }
    }

    pub fn total(self) -> u16 {
        self.base.saturating_add(self.added)
    }

    /// Added time only runs at the end of a half, so it pins the period.
    pub fn implied_period(self) -> Option<Half> {
        (self.added > 0).then(|| Half::of_minute(self.base))
    }

    /// Reads `47`, `"47"`, `"45+2"`, `"90'+4"` or `{"base":45,"added":2}`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                let base = u16::try_from(n.as_u64()?).ok()?;
                Some(Self::new(base, 0))
            }
            Value::String(s) => parse_minute_parts(s.trim())
                .ok()
                .map(|(base, added)| Self::new(base, added)),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }
}

fn lenient_minute<'de, D: Deserializer<'de>>(de: D) -> Result<Option<LiveMinute>, D::Error> {
    let raw = Option::<Value>::deserialize(de)?;
    let minute = raw.as_ref().and_then(LiveMinute::from_value);
    if minute.is_none()
        && let Some(raw) = raw.as_ref().filter(|v| !v.is_null())
    {
        warn!(%raw, "unreadable minute in live snapshot; ignored");
    }
    Ok(minute)
}

fn lenient_status<'de, D: Deserializer<'de>>(de: D) -> Result<Option<MatchStatus>, D::Error> {
    let raw = Option::<Value>::deserialize(de)?;
    let status = raw
        .as_ref()
        .and_then(|v| serde_json::from_value::<MatchStatus>(v.clone()).ok());
    if status.is_none()
        && let Some(raw) = raw.as_ref().filter(|v| !v.is_null())
    {
        warn!(%raw, "unknown match status in live snapshot; ignored");
    }
    Ok(status)
}

/// One poll from the live feed. Every field may be missing; an unreadable
/// status or minute is dropped rather than failing the poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSnapshot {
    #[serde(deserialize_with = "lenient_status")]
    pub status: Option<MatchStatus>,
    #[serde(deserialize_with = "lenient_minute")]
    pub minute: Option<LiveMinute>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Cumulative counts since kickoff.
    pub events: Option<LiveEventCounts>,
    pub intensity: Option<IntensitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMatchContext {
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub league: String,
    #[serde(default)]
    pub status: MatchStatus,
    /// Elapsed minutes, added time included.
    #[serde(default)]
    pub current_minute: u16,
    /// Added time inside `current_minute` when the feed announced it.
    #[serde(default)]
    pub added_time: u16,
    #[serde(default)]
    pub period: Option<Half>,
    #[serde(default)]
    pub home_score: u32,
    #[serde(default)]
    pub away_score: u32,
    #[serde(default)]
    pub events: LiveEventCounts,
    #[serde(default)]
    pub intensity: Vec<IntensitySnapshot>,
}

impl LiveMatchContext {
    pub fn new(
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        league: impl Into<String>,
    ) -> Self {
        Self {
            home_team: home_team.into(),
            away_team: away_team.into(),
            league: league.into(),
            status: MatchStatus::Pre,
            current_minute: 0,
            added_time: 0,
            period: None,
            home_score: 0,
            away_score: 0,
            events: LiveEventCounts::default(),
            intensity: Vec::new(),
        }
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home_score,
            Side::Away => self.away_score,
        }
    }

    pub fn samples(&self, side: Side) -> Vec<IntensitySample> {
        self.intensity.iter().map(|s| *s.side(side)).collect()
    }

    /// The half the clock is in: the feed's period when known, otherwise
    /// whatever announced added time implies.
    pub fn current_half(&self) -> Option<Half> {
        self.period.or_else(|| {
            (self.added_time > 0)
                .then(|| Half::of_minute(self.current_minute.saturating_sub(self.added_time)))
        })
    }

    /// Merge a poll. Minute, period, scores and event counters never go
    /// backwards; a regression in the feed is logged and the previous value
    /// kept. The minute restarts at 46 when the second half begins.
    pub fn apply_snapshot(&mut self, snap: &LiveSnapshot) {
        if let Some(status) = snap.status {
            self.status = status;
        }
        let period = snap
            .status
            .and_then(MatchStatus::period)
            .or_else(|| snap.minute.and_then(LiveMinute::implied_period));
        let second_half_began =
            period == Some(Half::Second) && self.period != Some(Half::Second);
        if let Some(period) = period {
            if period == Half::First && self.period == Some(Half::Second) {
                warn!(
                    home = %self.home_team,
                    away = %self.away_team,
                    "period went backwards; keeping second half"
                );
            } else {
                self.period = Some(period);
            }
        }
        if let Some(minute) = snap.minute {
            let total = minute.total();
            if total < self.current_minute && !second_half_began {
                warn!(
                    home = %self.home_team,
                    away = %self.away_team,
                    previous = self.current_minute,
                    received = total,
                    "minute went backwards; keeping previous"
                );
            } else {
                self.current_minute = total;
                self.added_time = minute.added;
            }
        }
        self.home_score = self.merge_score(Side::Home, self.home_score, snap.home_score);
        self.away_score = self.merge_score(Side::Away, self.away_score, snap.away_score);
        if let Some(events) = snap.events {
            merge_events(&mut self.events.home, &events.home);
            merge_events(&mut self.events.away, &events.away);
        }
        if let Some(sample) = snap.intensity {
            self.intensity.push(sample);
        }
    }

    fn merge_score(&self, side: Side, current: u32, received: Option<u32>) -> u32 {
        match received {
            Some(v) if v < current => {
                warn!(
                    home = %self.home_team,
                    away = %self.away_team,
                    ?side,
                    previous = current,
                    received = v,
                    "score went backwards; keeping previous"
                );
                current
            }
            Some(v) => v,
            None => current,
        }
    }
}

fn merge_events(into: &mut SideEvents, from: &SideEvents) {
    into.red_cards = into.red_cards.max(from.red_cards);
    into.penalties = into.penalties.max(from.penalties);
    into.injuries = into.injuries.max(from.injuries);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_with_nothing_changes_nothing() {
        let mut ctx = LiveMatchContext::new("A", "B", "L");
        let before = ctx.clone();
        ctx.apply_snapshot(&LiveSnapshot::default());
        assert_eq!(ctx, before);
    }

    #[test]
    fn regressions_are_ignored() {
        let mut ctx = LiveMatchContext::new("A", "B", "L");
        ctx.apply_snapshot(&LiveSnapshot {
            status: Some(MatchStatus::Live),
            minute: Some(LiveMinute::new(40, 0)),
            home_score: Some(2),
            away_score: Some(1),
            ..LiveSnapshot::default()
        });
        ctx.apply_snapshot(&LiveSnapshot {
            minute: Some(LiveMinute::new(38, 0)),
            home_score: Some(1),
            ..LiveSnapshot::default()
        });
        assert_eq!(ctx.current_minute, 40);
        assert_eq!(ctx.home_score, 2);
        assert_eq!(ctx.away_score, 1);
    }

    #[test]
    fn intensity_is_append_only_per_side() {
        let mut ctx = LiveMatchContext::new("A", "B", "L");
        for shots in [1.0, 2.0, 3.0] {
            ctx.apply_snapshot(&LiveSnapshot {
                intensity: Some(IntensitySnapshot {
                    home: IntensitySample {
                        shots,
                        ..IntensitySample::default()
                    },
                    away: IntensitySample::default(),
                }),
                ..LiveSnapshot::default()
            });
        }
        let home = ctx.samples(Side::Home);
        assert_eq!(home.len(), 3);
        assert_eq!(home[2].shots, 3.0);
        assert_eq!(ctx.samples(Side::Away)[0].total(), 0.0);
    }

    #[test]
    fn status_accepts_feed_shorthand() {
        let s: MatchStatus = serde_json::from_str("\"HT\"").unwrap();
        assert_eq!(s, MatchStatus::HalfTime);
        let s: MatchStatus = serde_json::from_str("\"LIVE\"").unwrap();
        assert!(s.is_live());
        let s: MatchStatus = serde_json::from_str("\"2H\"").unwrap();
        assert_eq!(s, MatchStatus::SecondHalf);
        assert!(s.is_live());
    }

    #[test]
    fn first_half_stoppage_poll_keeps_its_period() {
        let snap: LiveSnapshot =
            serde_json::from_str(r#"{"status":"1H","minute":"45+2"}"#).unwrap();
        assert_eq!(snap.status, Some(MatchStatus::FirstHalf));
        assert_eq!(snap.minute, Some(LiveMinute::new(45, 2)));

        let mut ctx = LiveMatchContext::new("A", "B", "L");
        ctx.apply_snapshot(&snap);
        assert_eq!(ctx.current_minute, 47);
        assert_eq!(ctx.added_time, 2);
        assert_eq!(ctx.current_half(), Some(Half::First));

        // the second half restarts the clock at 46
        ctx.apply_snapshot(&serde_json::from_str(r#"{"status":"2H","minute":46}"#).unwrap());
        assert_eq!(ctx.current_minute, 46);
        assert_eq!(ctx.current_half(), Some(Half::Second));
    }

    #[test]
    fn added_time_alone_implies_the_half() {
        let mut ctx = LiveMatchContext::new("A", "B", "L");
        ctx.apply_snapshot(&serde_json::from_str(r#"{"status":"LIVE","minute":"45+3"}"#).unwrap());
        assert_eq!(ctx.period, Some(Half::First));
        ctx.apply_snapshot(&serde_json::from_str(r#"{"minute":"90+1"}"#).unwrap());
        assert_eq!(ctx.period, Some(Half::Second));
        assert_eq!(ctx.current_minute, 91);
    }

    #[test]
    fn unreadable_fields_degrade_instead_of_failing() {
        let snap: LiveSnapshot =
            serde_json::from_str(r#"{"status":"ABANDONED?","minute":"soon","home_score":1}"#)
                .unwrap();
        assert_eq!(snap.status, None);
        assert_eq!(snap.minute, None);
        assert_eq!(snap.home_score, Some(1));
    }
}

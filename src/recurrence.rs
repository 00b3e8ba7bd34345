use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::intervals::{Half, HALF_TIME_MINUTE, IntervalId, Taxonomy};
use crate::match_log::{MatchLog, MatchRecord, VenueSide};
use crate::team_names::normalize_team_name;

const VENUES: [VenueSide; 2] = [VenueSide::Home, VenueSide::Away];
const KINDS: [GoalKind; 3] = [GoalKind::Both, GoalKind::Scored, GoalKind::Conceded];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    AllTime,
    /// The N most recent matches by date (ties keep insertion order).
    Recent(usize),
}

/// Which goals of a match count toward an interval hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Both,
    Scored,
    Conceded,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamIntervalProfile {
    pub window: Window,
    /// Matches inside the window, including those without minute data.
    pub matches_considered: usize,
    pub matches_with_goal: usize,
    pub total_goals_in_interval: usize,
    /// Matches counted in `matches_considered` that could not be bucketed.
    pub matches_without_minutes: usize,
    pub recurrence_rate: f64,
}

impl TeamIntervalProfile {
    pub fn empty(window: Window) -> Self {
        Self {
            window,
            matches_considered: 0,
            matches_with_goal: 0,
            total_goals_in_interval: 0,
            matches_without_minutes: 0,
            recurrence_rate: 0.0,
        }
    }

    pub fn has_history(&self) -> bool {
        self.matches_considered > 0
    }
}

fn goal_minutes(record: &MatchRecord, kind: GoalKind) -> impl Iterator<Item = u16> + '_ {
    let scored = matches!(kind, GoalKind::Both | GoalKind::Scored);
    let conceded = matches!(kind, GoalKind::Both | GoalKind::Conceded);
    record
        .goals_scored_minutes
        .iter()
        .filter(move |_| scored)
        .chain(record.goals_conceded_minutes.iter().filter(move |_| conceded))
        .copied()
}

/// Aggregate one interval over an already-windowed set of matches.
pub fn compute_profile(
    records: &[&MatchRecord],
    taxonomy: &Taxonomy,
    interval: IntervalId,
    kind: GoalKind,
    window: Window,
) -> TeamIntervalProfile {
    let mut profile = TeamIntervalProfile::empty(window);
    for record in records {
        profile.matches_considered += 1;
        if !record.minutes_known {
            profile.matches_without_minutes += 1;
            continue;
        }
        let max_minute = record.max_minute();
        let goals = goal_minutes(record, kind)
            .filter(|m| taxonomy.contains_in_match(interval, *m, max_minute))
            .count();
        if goals > 0 {
            profile.matches_with_goal += 1;
        }
        profile.total_goals_in_interval += goals;
    }
    if profile.matches_considered > 0 {
        profile.recurrence_rate =
            profile.matches_with_goal as f64 / profile.matches_considered as f64;
    }
    profile
}

/// Apply `window` to matches given in insertion order.
pub fn select_window<'a>(records: &[&'a MatchRecord], window: Window) -> Vec<&'a MatchRecord> {
    match window {
        Window::AllTime => records.to_vec(),
        Window::Recent(n) => {
            let mut sorted = records.to_vec();
            // stable: equal dates stay in insertion order
            sorted.sort_by(|a, b| b.match_date.cmp(&a.match_date));
            sorted.truncate(n);
            sorted
        }
    }
}

/// Mean goals scored by the end of `half` (first half: minutes up to 45;
/// second half: the whole match). Records without minutes are skipped.
pub fn average_goals_by_half(records: &[&MatchRecord], half: Half) -> f64 {
    let known = records.iter().filter(|r| r.minutes_known).collect::<Vec<_>>();
    if known.is_empty() {
        return 0.0;
    }
    let total: usize = known
        .iter()
        .map(|r| match half {
            Half::First => r
                .goals_scored_minutes
                .iter()
                .filter(|m| **m <= HALF_TIME_MINUTE)
                .count(),
            Half::Second => r.goals_scored(),
        })
        .sum();
    total as f64 / known.len() as f64
}

/// Recent-N average goals scored over the all-time average, clamped to
/// `[min, max]`. Neutral (1.0) without a baseline.
pub fn form_ratio(records: &[&MatchRecord], recent_n: usize, min: f64, max: f64) -> f64 {
    let known = records
        .iter()
        .copied()
        .filter(|r| r.minutes_known)
        .collect::<Vec<_>>();
    if known.is_empty() || recent_n == 0 {
        return 1.0;
    }
    let all_avg = mean_scored(&known);
    if all_avg <= 0.0 {
        return 1.0;
    }
    let recent = select_window(&known, Window::Recent(recent_n));
    (mean_scored(&recent) / all_avg).clamp(min, max)
}

fn mean_scored(records: &[&MatchRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let goals: usize = records.iter().map(|r| r.goals_scored()).sum();
    goals as f64 / records.len() as f64
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProfileKey {
    team: String,
    venue: VenueSide,
    interval: IntervalId,
    kind: GoalKind,
    window: Window,
}

#[derive(Debug, Clone)]
struct TeamHistory {
    display_name: String,
    home: Vec<usize>,
    away: Vec<usize>,
}

impl TeamHistory {
    fn indices(&self, venue: VenueSide) -> &[usize] {
        match venue {
            VenueSide::Home => &self.home,
            VenueSide::Away => &self.away,
        }
    }
}

#[derive(Debug, Default)]
struct TeamAggregates {
    profiles: Vec<(ProfileKey, TeamIntervalProfile)>,
    half_averages: Vec<((String, VenueSide, Half), f64)>,
    form: Vec<((String, VenueSide), f64)>,
}

/// Immutable view of the historical match log with the aggregates the engine
/// reads on every evaluation. Rebuilt from scratch when the log changes.
#[derive(Debug)]
pub struct HistorySnapshot {
    log: MatchLog,
    taxonomy: Taxonomy,
    teams: HashMap<String, TeamHistory>,
    literal_names: HashMap<String, String>,
    profiles: HashMap<ProfileKey, TeamIntervalProfile>,
    half_averages: HashMap<(String, VenueSide, Half), f64>,
    form: HashMap<(String, VenueSide), f64>,
    form_window: usize,
    form_min: f64,
    form_max: f64,
    built_at: DateTime<Utc>,
}

impl HistorySnapshot {
    pub fn build(log: MatchLog, taxonomy: &Taxonomy, cfg: &EngineConfig) -> Self {
        let mut teams: HashMap<String, TeamHistory> = HashMap::new();
        let mut literal_names = HashMap::new();
        for (idx, record) in log.iter().enumerate() {
            let key = team_key(&record.team);
            literal_names
                .entry(record.team.trim().to_string())
                .or_insert_with(|| key.clone());
            let entry = teams.entry(key).or_insert_with(|| TeamHistory {
                display_name: record.team.trim().to_string(),
                home: Vec::new(),
                away: Vec::new(),
            });
            match record.venue {
                VenueSide::Home => entry.home.push(idx),
                VenueSide::Away => entry.away.push(idx),
            }
        }

        let mut windows = vec![Window::AllTime];
        if let Window::Recent(n) = cfg.profile_window {
            windows.push(Window::Recent(n));
        }

        let aggregates = teams
            .par_iter()
            .map(|(key, history)| {
                aggregate_team(
                    key,
                    history,
                    &log,
                    taxonomy,
                    &windows,
                    cfg.form_window,
                    (cfg.form_min, cfg.form_max),
                )
            })
            .collect::<Vec<_>>();

        let mut profiles = HashMap::new();
        let mut half_averages = HashMap::new();
        let mut form = HashMap::new();
        for agg in aggregates {
            profiles.extend(agg.profiles);
            half_averages.extend(agg.half_averages);
            form.extend(agg.form);
        }

        info!(
            records = log.len(),
            teams = teams.len(),
            profiles = profiles.len(),
            "built history snapshot"
        );

        Self {
            log,
            taxonomy: taxonomy.clone(),
            teams,
            literal_names,
            profiles,
            half_averages,
            form,
            form_window: cfg.form_window,
            form_min: cfg.form_min,
            form_max: cfg.form_max,
            built_at: Utc::now(),
        }
    }

    pub fn empty(taxonomy: &Taxonomy, cfg: &EngineConfig) -> Self {
        Self::build(MatchLog::new(), taxonomy, cfg)
    }

    pub fn log(&self) -> &MatchLog {
        &self.log
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Normalized key first, then the literal name as given.
    pub fn resolve_team(&self, name: &str) -> Option<&str> {
        let key = team_key(name);
        if let Some((k, _)) = self.teams.get_key_value(&key) {
            return Some(k.as_str());
        }
        self.literal_names.get(name.trim()).map(String::as_str)
    }

    pub fn display_name(&self, name: &str) -> Option<&str> {
        let key = self.resolve_team(name)?;
        self.teams.get(key).map(|t| t.display_name.as_str())
    }

    pub fn matches(&self, team: &str, venue: VenueSide) -> Vec<&MatchRecord> {
        let Some(history) = self.resolve_team(team).and_then(|k| self.teams.get(k)) else {
            return Vec::new();
        };
        history
            .indices(venue)
            .iter()
            .filter_map(|idx| self.log.records().get(*idx))
            .collect()
    }

    pub fn has_history(&self, team: &str, venue: VenueSide) -> bool {
        !self.matches(team, venue).is_empty()
    }

    /// Profile over scored and conceded goals together.
    pub fn recurrence(
        &self,
        team: &str,
        venue: VenueSide,
        interval: IntervalId,
        window: Window,
    ) -> TeamIntervalProfile {
        self.recurrence_of(team, venue, interval, window, GoalKind::Both)
    }

    pub fn recurrence_of(
        &self,
        team: &str,
        venue: VenueSide,
        interval: IntervalId,
        window: Window,
        kind: GoalKind,
    ) -> TeamIntervalProfile {
        let Some(key) = self.resolve_team(team) else {
            return TeamIntervalProfile::empty(window);
        };
        let cache_key = ProfileKey {
            team: key.to_string(),
            venue,
            interval,
            kind,
            window,
        };
        if let Some(profile) = self.profiles.get(&cache_key) {
            return *profile;
        }
        let records = self.matches(team, venue);
        let selected = select_window(&records, window);
        compute_profile(&selected, &self.taxonomy, interval, kind, window)
    }

    /// Goals of `kind` per interval summed over the window.
    pub fn interval_goal_counts(
        &self,
        team: &str,
        venue: VenueSide,
        kind: GoalKind,
        window: Window,
    ) -> Vec<f64> {
        self.taxonomy
            .ids()
            .map(|id| {
                self.recurrence_of(team, venue, id, window, kind)
                    .total_goals_in_interval as f64
            })
            .collect()
    }

    pub fn average_goals_by_half(&self, team: &str, venue: VenueSide, half: Half) -> f64 {
        let Some(key) = self.resolve_team(team) else {
            return 0.0;
        };
        self.half_averages
            .get(&(key.to_string(), venue, half))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn form_ratio(&self, team: &str, venue: VenueSide) -> f64 {
        let Some(key) = self.resolve_team(team) else {
            return 1.0;
        };
        match self.form.get(&(key.to_string(), venue)) {
            Some(v) => *v,
            None => form_ratio(
                &self.matches(team, venue),
                self.form_window,
                self.form_min,
                self.form_max,
            ),
        }
    }
}

fn team_key(name: &str) -> String {
    let key = normalize_team_name(name);
    if key.is_empty() {
        name.trim().to_string()
    } else {
        key
    }
}

fn aggregate_team(
    key: &str,
    history: &TeamHistory,
    log: &MatchLog,
    taxonomy: &Taxonomy,
    windows: &[Window],
    form_window: usize,
    (form_min, form_max): (f64, f64),
) -> TeamAggregates {
    let mut out = TeamAggregates::default();
    for venue in VENUES {
        let records = history
            .indices(venue)
            .iter()
            .filter_map(|idx| log.records().get(*idx))
            .collect::<Vec<_>>();
        if records.is_empty() {
            continue;
        }
        for window in windows {
            let selected = select_window(&records, *window);
            for interval in taxonomy.ids() {
                for kind in KINDS {
                    let profile = compute_profile(&selected, taxonomy, interval, kind, *window);
                    out.profiles.push((
                        ProfileKey {
                            team: key.to_string(),
                            venue,
                            interval,
                            kind,
                            window: *window,
                        },
                        profile,
                    ));
                }
            }
        }
        for half in [Half::First, Half::Second] {
            out.half_averages.push((
                (key.to_string(), venue, half),
                average_goals_by_half(&records, half),
            ));
        }
        out.form.push((
            (key.to_string(), venue),
            form_ratio(&records, form_window, form_min, form_max),
        ));
    }
    out
}

/// Shared handle to the current snapshot. Readers clone the `Arc`; a refresh
/// builds a complete new snapshot and swaps it in under the write lock.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<HistorySnapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: HistorySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn current(&self) -> Arc<HistorySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `snapshot`, returning the one it replaced.
    pub fn replace(&self, snapshot: HistorySnapshot) -> Arc<HistorySnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// Build from `log` outside the lock, then swap.
    pub fn refresh(&self, log: MatchLog, taxonomy: &Taxonomy, cfg: &EngineConfig) {
        let snapshot = HistorySnapshot::build(log, taxonomy, cfg);
        let previous = self.replace(snapshot);
        info!(
            previous_records = previous.log().len(),
            "history snapshot swapped"
        );
    }
}

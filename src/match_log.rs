use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::team_names::normalize_team_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VenueSide {
    Home,
    Away,
}

impl VenueSide {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "h" | "dom" | "domicile" => Some(VenueSide::Home),
            "away" | "a" | "ext" | "exterieur" | "extérieur" => Some(VenueSide::Away),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VenueSide::Home => "HOME",
            VenueSide::Away => "AWAY",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            VenueSide::Home => VenueSide::Away,
            VenueSide::Away => VenueSide::Home,
        }
    }
}

impl fmt::Display for VenueSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One historical match seen from `team`'s side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default)]
    pub match_id: Option<String>,
    pub team: String,
    pub opponent: String,
    pub league: String,
    pub venue: VenueSide,
    pub goals_scored_minutes: Vec<u16>,
    pub goals_conceded_minutes: Vec<u16>,
    pub match_date: NaiveDate,
    /// False when the source gave no usable minute data. Such records still count
    /// as matches played but never contribute to interval-level counts.
    #[serde(default = "default_true")]
    pub minutes_known: bool,
}

fn default_true() -> bool {
    true
}

impl MatchRecord {
    pub fn key(&self) -> RecordKey {
        match self.match_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => RecordKey::Explicit {
                match_id: id.to_string(),
                team: normalize_team_name(&self.team),
            },
            _ => RecordKey::Composite {
                team: normalize_team_name(&self.team),
                opponent: normalize_team_name(&self.opponent),
                date: self.match_date,
            },
        }
    }

    /// Latest goal minute of the match, 0 for a goalless one.
    pub fn max_minute(&self) -> u16 {
        self.goals_scored_minutes
            .iter()
            .chain(&self.goals_conceded_minutes)
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub fn goals_scored(&self) -> usize {
        self.goals_scored_minutes.len()
    }

    pub fn goals_conceded(&self) -> usize {
        self.goals_conceded_minutes.len()
    }
}

/// Deduplication key. A later copy of the same match replaces the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Explicit {
        match_id: String,
        team: String,
    },
    Composite {
        team: String,
        opponent: String,
        date: NaiveDate,
    },
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Explicit { match_id, team } => write!(f, "id:{match_id}:{team}"),
            RecordKey::Composite {
                team,
                opponent,
                date,
            } => write!(f, "c:{team}:{opponent}:{date}"),
        }
    }
}

/// Insertion-ordered set of match records.
#[derive(Debug, Clone, Default)]
pub struct MatchLog {
    records: Vec<MatchRecord>,
    index: HashMap<RecordKey, usize>,
}

impl MatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = MatchRecord>) -> Self {
        let mut log = Self::new();
        log.extend(records);
        log
    }

    /// Returns true when the record replaced an existing one.
    pub fn insert(&mut self, record: MatchRecord) -> bool {
        let key = record.key();
        if let Some(&idx) = self.index.get(&key) {
            self.records[idx] = record;
            return true;
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        false
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = MatchRecord>) {
        for record in records {
            self.insert(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchRecord> {
        self.records.iter()
    }

    /// A new log holding only records that satisfy `keep`, order preserved.
    pub fn filtered(&self, keep: impl Fn(&MatchRecord) -> bool) -> MatchLog {
        MatchLog::from_records(self.records.iter().filter(|r| keep(r)).cloned())
    }
}

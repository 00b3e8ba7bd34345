use serde::{Deserialize, Serialize};

use crate::config::EventConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveEventKind {
    RedCard,
    Penalty,
    Injury,
}

/// Events accumulated by one side since kickoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideEvents {
    pub red_cards: u32,
    pub penalties: u32,
    pub injuries: u32,
}

impl SideEvents {
    pub fn get(&self, kind: LiveEventKind) -> u32 {
        match kind {
            LiveEventKind::RedCard => self.red_cards,
            LiveEventKind::Penalty => self.penalties,
            LiveEventKind::Injury => self.injuries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.red_cards == 0 && self.penalties == 0 && self.injuries == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveEventCounts {
    pub home: SideEvents,
    pub away: SideEvents,
}

impl LiveEventCounts {
    pub fn side(&self, side: Side) -> &SideEvents {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideEvents {
        match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        }
    }

    pub fn get(&self, kind: LiveEventKind, side: Side) -> u32 {
        self.side(side).get(kind)
    }
}

/// Per-kind factors plus their clamped product, kept apart so each one can be
/// inspected in the prediction details.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventModifier {
    pub red_card: f64,
    pub penalty: f64,
    pub injury: f64,
    pub total: f64,
}

impl EventModifier {
    pub const NEUTRAL: EventModifier = EventModifier {
        red_card: 1.0,
        penalty: 1.0,
        injury: 1.0,
        total: 1.0,
    };
}

pub fn event_modifier(events: &SideEvents, cfg: &EventConfig) -> EventModifier {
    if events.is_empty() {
        return EventModifier::NEUTRAL;
    }
    let red_card = (1.0 - cfg.red_card_step * f64::from(events.red_cards)).max(cfg.red_card_floor);
    let penalty = (1.0 + cfg.penalty_step * f64::from(events.penalties)).min(cfg.penalty_cap);
    let injury = (1.0 - cfg.injury_step * f64::from(events.injuries)).max(cfg.injury_floor);
    let total = (red_card * penalty * injury).clamp(cfg.min_total, cfg.max_total);
    EventModifier {
        red_card,
        penalty,
        injury,
        total,
    }
}

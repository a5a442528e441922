use std::fmt;

use chrono::NaiveDateTime;

/// What a player did at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Joined,
    Left,
}

impl Action {
    /// Map the verb used in server log lines ("joined" / "left").
    pub fn from_verb(verb: &str) -> Option<Self> {
        match verb {
            "joined" => Some(Action::Joined),
            "left" => Some(Action::Left),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Joined => f.write_str("joined"),
            Action::Left => f.write_str("left"),
        }
    }
}

/// A single join/leave event extracted from one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: NaiveDateTime,
    pub player: String,
    pub action: Action,
}

impl LogEvent {
    pub fn new(timestamp: NaiveDateTime, player: impl Into<String>, action: Action) -> Self {
        Self {
            timestamp,
            player: player.into(),
            action,
        }
    }
}

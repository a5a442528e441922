use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::{Anomaly, SessionInterval};
use crate::events::{Action, LogEvent};

/// Where an unterminated session is considered to end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenSessionEnd {
    /// Timestamp of the player's last observed event.
    #[default]
    LastEvent,
    /// A fixed instant, usually "now". Never earlier than the session start.
    Until(NaiveDateTime),
}

/// Sessions per player, plus what was lost along the way.
#[derive(Debug, Default)]
pub struct Reconstruction {
    pub sessions: BTreeMap<String, Vec<SessionInterval>>,
    /// Players in order of first appearance in the input.
    pub player_order: Vec<String>,
    pub anomalies: Vec<Anomaly>,
}

impl Reconstruction {
    /// Sessions in first-appearance player order.
    pub fn ordered(&self) -> impl Iterator<Item = (&str, &[SessionInterval])> {
        self.player_order.iter().filter_map(|player| {
            self.sessions
                .get(player)
                .map(|s| (player.as_str(), s.as_slice()))
        })
    }
}

/// Pair each join with the next chronological leave, per player.
///
/// Input order does not matter. Events with equal timestamps keep their
/// input order.
pub fn reconstruct(events: &[LogEvent], open_end: OpenSessionEnd) -> Reconstruction {
    let mut player_order: Vec<String> = Vec::new();
    let grouped = events.iter().enumerate().fold(
        BTreeMap::<&str, Vec<(usize, &LogEvent)>>::new(),
        |mut acc, (seq, event)| {
            acc.entry(event.player.as_str())
                .or_insert_with(|| {
                    player_order.push(event.player.clone());
                    Vec::new()
                })
                .push((seq, event));
            acc
        },
    );

    let mut sessions = BTreeMap::new();
    let mut anomalies = Vec::new();

    for (player, mut player_events) in grouped {
        player_events.sort_by_key(|(seq, event)| (event.timestamp, *seq));

        let scan = player_events
            .iter()
            .fold(PlayerScan::new(player), |scan, (_, event)| scan.step(event));

        let (intervals, mut found) = scan.finish(open_end);
        anomalies.append(&mut found);
        sessions.insert(player.to_string(), intervals);
    }

    tracing::debug!(
        players = sessions.len(),
        anomalies = anomalies.len(),
        "reconstructed sessions"
    );

    Reconstruction {
        sessions,
        player_order,
        anomalies,
    }
}

/// Scan state for one player's time-sorted events.
struct PlayerScan<'a> {
    player: &'a str,
    open_join: Option<NaiveDateTime>,
    last_seen: Option<NaiveDateTime>,
    intervals: Vec<SessionInterval>,
    anomalies: Vec<Anomaly>,
}

impl<'a> PlayerScan<'a> {
    fn new(player: &'a str) -> Self {
        Self {
            player,
            open_join: None,
            last_seen: None,
            intervals: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    fn step(mut self, event: &LogEvent) -> Self {
        self.last_seen = Some(event.timestamp);

        match event.action {
            Action::Joined => {
                if let Some(discarded) = self.open_join.replace(event.timestamp) {
                    self.anomalies.push(Anomaly::DuplicateJoin {
                        player: self.player.to_string(),
                        discarded,
                        replaced_by: event.timestamp,
                    });
                }
            }
            Action::Left => match self.open_join.take() {
                Some(start) => self.intervals.push(SessionInterval {
                    player: self.player.to_string(),
                    start,
                    end: event.timestamp,
                    is_open: false,
                }),
                None => self.anomalies.push(Anomaly::OrphanLeave {
                    player: self.player.to_string(),
                    at: event.timestamp,
                }),
            },
        }

        self
    }

    fn finish(mut self, open_end: OpenSessionEnd) -> (Vec<SessionInterval>, Vec<Anomaly>) {
        if let Some(start) = self.open_join {
            let end = match open_end {
                OpenSessionEnd::LastEvent => self.last_seen.unwrap_or(start),
                OpenSessionEnd::Until(until) => until.max(start),
            };

            self.intervals.push(SessionInterval {
                player: self.player.to_string(),
                start,
                end,
                is_open: true,
            });
            self.anomalies.push(Anomaly::OpenSession {
                player: self.player.to_string(),
                start,
            });
        }

        (self.intervals, self.anomalies)
    }
}

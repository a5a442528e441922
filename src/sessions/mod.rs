pub mod reconstruct;
pub mod stats;

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::events::LogEvent;

pub use reconstruct::{reconstruct, OpenSessionEnd, Reconstruction};
pub use stats::{compute_statistics, PlayerStatistics};

/// One connected stretch of a player's time on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInterval {
    pub player: String,
    pub start: NaiveDateTime,
    /// For open sessions this is an estimate, see [`OpenSessionEnd`].
    pub end: NaiveDateTime,
    pub is_open: bool,
}

impl SessionInterval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// End before start. Only possible from corrupted input.
    pub fn is_anomalous(&self) -> bool {
        self.end < self.start
    }
}

/// Data loss or corruption noticed while building sessions.
///
/// None of these abort a run; they are surfaced so the operator can see
/// what was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// A second join arrived before any leave; the earlier join was dropped.
    DuplicateJoin {
        player: String,
        discarded: NaiveDateTime,
        replaced_by: NaiveDateTime,
    },
    /// A leave with no preceding join.
    OrphanLeave { player: String, at: NaiveDateTime },
    /// Event fell outside the active date range and was dropped.
    OutOfRange { player: String, at: NaiveDateTime },
    /// A join that never saw a matching leave.
    OpenSession { player: String, start: NaiveDateTime },
    /// Interval with end before start; counted as zero length.
    NegativeDuration {
        player: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::DuplicateJoin {
                player,
                discarded,
                replaced_by,
            } => write!(
                f,
                "{player}: join at {discarded} replaced by join at {replaced_by} without a leave"
            ),
            Anomaly::OrphanLeave { player, at } => {
                write!(f, "{player}: leave at {at} has no matching join")
            }
            Anomaly::OutOfRange { player, at } => {
                write!(f, "{player}: event at {at} is outside the date range")
            }
            Anomaly::OpenSession { player, start } => {
                write!(f, "{player}: session started at {start} never ended")
            }
            Anomaly::NegativeDuration { player, start, end } => {
                write!(f, "{player}: session ends at {end} before it starts at {start}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("start date {start} is after end date {end}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive calendar-date window applied to events before reconstruction.
///
/// `end` is inclusive as a date, so the effective upper bound on timestamps
/// is midnight of the following day (exclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, InvalidDateRange> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(InvalidDateRange { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let after_start = self
            .start
            .map_or(true, |start| ts >= start.and_time(NaiveTime::MIN));
        // A range ending on the last representable date has no upper bound.
        let before_end = self
            .end
            .and_then(|end| end.succ_opt())
            .map_or(true, |next| ts < next.and_time(NaiveTime::MIN));
        after_start && before_end
    }

    /// Human-readable form for titles, `None` when no filter is active.
    pub fn describe(&self) -> Option<String> {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => Some(format!("{start} to {end}")),
            (Some(start), None) => Some(format!("from {start}")),
            (None, Some(end)) => Some(format!("until {end}")),
            (None, None) => None,
        }
    }

    /// Keep events inside the range; everything else becomes an
    /// [`Anomaly::OutOfRange`]. This can split a join/leave pair.
    pub fn filter(&self, events: Vec<LogEvent>) -> (Vec<LogEvent>, Vec<Anomaly>) {
        if self.is_unbounded() {
            return (events, Vec::new());
        }

        let (kept, dropped): (Vec<_>, Vec<_>) =
            events.into_iter().partition(|e| self.contains(e.timestamp));

        let anomalies = dropped
            .into_iter()
            .map(|e| Anomaly::OutOfRange {
                player: e.player,
                at: e.timestamp,
            })
            .collect();

        (kept, anomalies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Action;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        d.and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn test_date_range_bounds() {
        let range = DateRange::new(Some(date(2025, 3, 23)), Some(date(2025, 3, 25))).unwrap();

        assert!(!range.contains(at(date(2025, 3, 22), 23, 59, 59)));
        assert!(range.contains(at(date(2025, 3, 23), 0, 0, 0)));
        assert!(range.contains(at(date(2025, 3, 25), 23, 59, 59)));
        assert!(!range.contains(at(date(2025, 3, 26), 0, 0, 0)));
    }

    #[test]
    fn test_open_ended_ranges() {
        let from = DateRange::new(Some(date(2025, 3, 23)), None).unwrap();
        assert!(from.contains(at(date(2099, 1, 1), 0, 0, 0)));
        assert!(!from.contains(at(date(2025, 3, 22), 12, 0, 0)));

        let until = DateRange::new(None, Some(date(2025, 3, 25))).unwrap();
        assert!(until.contains(at(date(1999, 1, 1), 0, 0, 0)));
        assert!(!until.contains(at(date(2025, 3, 26), 0, 0, 0)));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let err = DateRange::new(Some(date(2025, 3, 25)), Some(date(2025, 3, 23))).unwrap_err();
        assert_eq!(err.start, date(2025, 3, 25));
    }

    #[test]
    fn test_describe() {
        assert_eq!(DateRange::default().describe(), None);
        assert_eq!(
            DateRange::new(Some(date(2025, 3, 23)), Some(date(2025, 3, 25)))
                .unwrap()
                .describe()
                .as_deref(),
            Some("2025-03-23 to 2025-03-25")
        );
        assert_eq!(
            DateRange::new(None, Some(date(2025, 3, 25)))
                .unwrap()
                .describe()
                .as_deref(),
            Some("until 2025-03-25")
        );
    }

    #[test]
    fn test_filter_reports_dropped_events() {
        let range = DateRange::new(Some(date(2025, 3, 23)), Some(date(2025, 3, 25))).unwrap();
        let events = vec![
            LogEvent::new(at(date(2025, 3, 25), 23, 30, 0), "Steve", Action::Joined),
            LogEvent::new(at(date(2025, 3, 26), 0, 15, 0), "Steve", Action::Left),
        ];

        let (kept, anomalies) = range.filter(events);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].action, Action::Joined);
        assert_eq!(
            anomalies,
            vec![Anomaly::OutOfRange {
                player: "Steve".to_string(),
                at: at(date(2025, 3, 26), 0, 15, 0),
            }]
        );
    }

    #[test]
    fn test_interval_duration_and_anomaly() {
        let d = date(2025, 3, 23);
        let ok = SessionInterval {
            player: "Steve".into(),
            start: at(d, 12, 0, 0),
            end: at(d, 12, 30, 0),
            is_open: false,
        };
        assert_eq!(ok.duration(), Duration::minutes(30));
        assert!(!ok.is_anomalous());

        let reversed = SessionInterval {
            end: at(d, 11, 0, 0),
            ..ok
        };
        assert!(reversed.is_anomalous());
    }
}

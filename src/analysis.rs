use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::events::{parse_log, LineFailure};
use crate::sessions::{
    compute_statistics, reconstruct, Anomaly, DateRange, OpenSessionEnd, PlayerStatistics,
    Reconstruction,
};

/// Inputs that shape a run besides the log text itself.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Date given to lines with no file prefix.
    pub reference_date: NaiveDate,
    pub range: DateRange,
    pub open_end: OpenSessionEnd,
}

/// Everything derived from one block of log text.
#[derive(Debug)]
pub struct Analysis {
    pub events_parsed: usize,
    pub events_in_range: usize,
    pub failures: Vec<LineFailure>,
    pub reconstruction: Reconstruction,
    pub statistics: BTreeMap<String, PlayerStatistics>,
    /// Filtering, pairing and statistics anomalies, in that order.
    pub anomalies: Vec<Anomaly>,
}

impl Analysis {
    /// No session survived parsing, filtering and pairing. Not an error,
    /// but there is nothing to report or draw. Orphan leaves alone do not
    /// make a result.
    pub fn is_empty(&self) -> bool {
        self.reconstruction.sessions.values().all(Vec::is_empty)
    }
}

/// Parse, filter, reconstruct and summarise. Never fails: bad lines and
/// lossy pairings are collected instead.
pub fn analyze(text: &str, options: &AnalysisOptions) -> Analysis {
    let parsed = parse_log(text, options.reference_date);
    let events_parsed = parsed.events.len();

    let (events, mut anomalies) = options.range.filter(parsed.events);
    let events_in_range = events.len();

    let reconstruction = reconstruct(&events, options.open_end);
    anomalies.extend(reconstruction.anomalies.iter().cloned());

    anomalies.extend(
        reconstruction
            .sessions
            .values()
            .flatten()
            .filter(|s| s.is_anomalous())
            .map(|s| Anomaly::NegativeDuration {
                player: s.player.clone(),
                start: s.start,
                end: s.end,
            }),
    );

    let statistics = compute_statistics(&reconstruction.sessions);

    Analysis {
        events_parsed,
        events_in_range,
        failures: parsed.failures,
        reconstruction,
        statistics,
        anomalies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ParseError;
    use chrono::Duration;

    const SAMPLE_LOG: &str = "\
2025-03-23-1.log:[12:00:00] [Server thread/INFO]: PlayerOne joined the game
2025-03-23-1.log:[12:30:00] [Server thread/INFO]: PlayerOne left the game
2025-03-23-1.log:[13:00:00] [Server thread/INFO]: PlayerTwo joined the game
[14:00:00] [Server thread/INFO]: PlayerTwo left the game
invalid line format
2025-03-23-1.log:[15:00:00] [Server thread/INFO]: PlayerOne joined the game
";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn options(range: DateRange) -> AnalysisOptions {
        AnalysisOptions {
            reference_date: date(2025, 3, 23),
            range,
            open_end: OpenSessionEnd::LastEvent,
        }
    }

    #[test]
    fn test_sample_log_end_to_end() {
        let analysis = analyze(SAMPLE_LOG, &options(DateRange::default()));

        assert_eq!(analysis.events_parsed, 5);
        assert_eq!(analysis.failures.len(), 1);
        assert_eq!(analysis.failures[0].line_number, 5);
        assert_eq!(
            analysis.failures[0].error,
            ParseError::InvalidFormat("invalid line format".to_string())
        );

        let one = &analysis.statistics["PlayerOne"];
        let two = &analysis.statistics["PlayerTwo"];
        assert_eq!(one.session_count, 2);
        assert_eq!(one.open_sessions, 1);
        assert_eq!(one.total_duration, Duration::minutes(30));
        assert_eq!(two.session_count, 1);
        assert_eq!(two.total_duration, Duration::hours(1));

        assert_eq!(
            analysis.reconstruction.player_order,
            vec!["PlayerOne", "PlayerTwo"]
        );
        assert!(matches!(
            analysis.anomalies.as_slice(),
            [Anomaly::OpenSession { .. }]
        ));
        assert!(!analysis.is_empty());
    }

    #[test]
    fn test_date_filter_drops_events_after_end_date() {
        let text = "\
2025-03-25-1.log:[23:00:00] [Server thread/INFO]: Steve joined the game
2025-03-25-1.log:[23:59:59] [Server thread/INFO]: Steve left the game
2025-03-26-1.log:[00:00:00] [Server thread/INFO]: Alex joined the game
2025-03-26-1.log:[00:30:00] [Server thread/INFO]: Alex left the game
";
        let range = DateRange::new(Some(date(2025, 3, 23)), Some(date(2025, 3, 25))).unwrap();
        let analysis = analyze(text, &options(range));

        assert_eq!(analysis.events_parsed, 4);
        assert_eq!(analysis.events_in_range, 2);
        assert_eq!(analysis.statistics.len(), 1);
        assert_eq!(analysis.statistics["Steve"].session_count, 1);
        assert_eq!(
            analysis
                .anomalies
                .iter()
                .filter(|a| matches!(a, Anomaly::OutOfRange { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_filter_can_split_a_session() {
        let text = "\
2025-03-25-1.log:[23:30:00] [Server thread/INFO]: Steve joined the game
2025-03-26-1.log:[00:30:00] [Server thread/INFO]: Steve left the game
";
        let range = DateRange::new(None, Some(date(2025, 3, 25))).unwrap();
        let analysis = analyze(text, &options(range));

        let steve = &analysis.statistics["Steve"];
        assert_eq!(steve.session_count, 1);
        assert_eq!(steve.open_sessions, 1);
        assert_eq!(steve.total_duration, Duration::zero());
    }

    #[test]
    fn test_nothing_in_range_is_empty() {
        let range = DateRange::new(Some(date(2030, 1, 1)), None).unwrap();
        let analysis = analyze(SAMPLE_LOG, &options(range));

        assert!(analysis.is_empty());
        assert!(analysis.statistics.is_empty());
        assert_eq!(analysis.failures.len(), 1);
    }

    #[test]
    fn test_only_orphan_leaves_in_range_is_empty() {
        let text = "\
2025-03-22-1.log:[23:00:00] [Server thread/INFO]: Steve joined the game
2025-03-23-1.log:[01:00:00] [Server thread/INFO]: Steve left the game
";
        let range = DateRange::new(Some(date(2025, 3, 23)), None).unwrap();
        let analysis = analyze(text, &options(range));

        assert_eq!(analysis.events_in_range, 1);
        assert!(analysis.is_empty());
        assert!(analysis
            .anomalies
            .iter()
            .any(|a| matches!(a, Anomaly::OrphanLeave { .. })));
    }

    #[test]
    fn test_empty_text() {
        let analysis = analyze("", &options(DateRange::default()));
        assert!(analysis.is_empty());
        assert!(analysis.failures.is_empty());
    }
}

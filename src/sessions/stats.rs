use std::collections::BTreeMap;

use chrono::Duration;

use super::SessionInterval;

/// Aggregate playtime figures for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatistics {
    pub player: String,
    pub session_count: usize,
    pub open_sessions: usize,
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub min_duration: Duration,
    pub max_duration: Duration,
    /// Sample standard deviation; zero with fewer than two sessions.
    pub stddev_duration: Duration,
    /// Intervals that ended before they started, counted as zero length.
    pub anomalous_intervals: usize,
}

pub fn compute_statistics(
    sessions: &BTreeMap<String, Vec<SessionInterval>>,
) -> BTreeMap<String, PlayerStatistics> {
    sessions
        .iter()
        .map(|(player, intervals)| (player.clone(), player_statistics(player, intervals)))
        .collect()
}

fn player_statistics(player: &str, intervals: &[SessionInterval]) -> PlayerStatistics {
    let mut anomalous_intervals = 0;
    let durations: Vec<Duration> = intervals
        .iter()
        .map(|interval| {
            if interval.is_anomalous() {
                tracing::warn!(
                    player,
                    start = %interval.start,
                    end = %interval.end,
                    "session ends before it starts, counting as zero"
                );
                anomalous_intervals += 1;
                Duration::zero()
            } else {
                interval.duration()
            }
        })
        .collect();

    let session_count = durations.len();
    // saturates rather than overflowing on absurd spans
    let total_duration = durations
        .iter()
        .fold(Duration::zero(), |acc, d| acc.checked_add(d).unwrap_or(Duration::MAX));

    let average_duration = if session_count == 0 {
        Duration::zero()
    } else {
        Duration::milliseconds(total_duration.num_milliseconds() / session_count as i64)
    };

    PlayerStatistics {
        player: player.to_string(),
        session_count,
        open_sessions: intervals.iter().filter(|s| s.is_open).count(),
        total_duration,
        average_duration,
        min_duration: durations.iter().min().copied().unwrap_or_else(Duration::zero),
        max_duration: durations.iter().max().copied().unwrap_or_else(Duration::zero),
        stddev_duration: sample_stddev(&durations),
        anomalous_intervals,
    }
}

/// Sample standard deviation (n - 1) of durations, in whole-second precision.
fn sample_stddev(durations: &[Duration]) -> Duration {
    let n = durations.len();
    if n < 2 {
        return Duration::zero();
    }

    let secs: Vec<f64> = durations.iter().map(|d| d.num_seconds() as f64).collect();
    let mean = secs.iter().sum::<f64>() / n as f64;
    let variance = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

    Duration::milliseconds((variance.sqrt() * 1000.0).round() as i64)
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::sessions::PlayerStatistics;

/// Serialisable view of [`PlayerStatistics`] with durations in seconds.
#[derive(Debug, Serialize)]
pub struct StatisticsRecord<'a> {
    pub player: &'a str,
    pub session_count: usize,
    pub open_sessions: usize,
    pub total_seconds: i64,
    pub average_seconds: i64,
    pub min_seconds: i64,
    pub max_seconds: i64,
    pub stddev_seconds: i64,
    pub anomalous_intervals: usize,
}

impl<'a> From<&'a PlayerStatistics> for StatisticsRecord<'a> {
    fn from(s: &'a PlayerStatistics) -> Self {
        Self {
            player: &s.player,
            session_count: s.session_count,
            open_sessions: s.open_sessions,
            total_seconds: s.total_duration.num_seconds(),
            average_seconds: s.average_duration.num_seconds(),
            min_seconds: s.min_duration.num_seconds(),
            max_seconds: s.max_duration.num_seconds(),
            stddev_seconds: s.stddev_duration.num_seconds(),
            anomalous_intervals: s.anomalous_intervals,
        }
    }
}

pub fn statistics_json(stats: &BTreeMap<String, PlayerStatistics>) -> serde_json::Result<String> {
    let records: Vec<StatisticsRecord<'_>> = stats.values().map(StatisticsRecord::from).collect();
    serde_json::to_string_pretty(&records)
}

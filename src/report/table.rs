use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::Duration;

use crate::sessions::PlayerStatistics;

const PLAYER_WIDTH: usize = 20;
const COUNT_WIDTH: usize = 8;
const DURATION_WIDTH: usize = 10;

/// Render a duration as whole hours and minutes ("1h 30m", "45m").
/// Seconds are truncated. Negative durations render as "0m".
pub fn format_duration(d: Duration) -> String {
    let minutes = d.num_minutes().max(0);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Fixed-width statistics table, one row per player in name order.
pub fn format_statistics_table(stats: &BTreeMap<String, PlayerStatistics>) -> String {
    let mut out = String::new();

    let header = format!(
        "{:<pw$} {:>cw$} {:>dw$} {:>dw$} {:>dw$} {:>dw$} {:>dw$}",
        "Player",
        "Sessions",
        "Total",
        "Average",
        "Min",
        "Max",
        "StdDev",
        pw = PLAYER_WIDTH,
        cw = COUNT_WIDTH,
        dw = DURATION_WIDTH,
    );
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", "-".repeat(header.len()));

    // BTreeMap iteration is already lexicographic by player
    for s in stats.values() {
        let _ = writeln!(
            out,
            "{:<pw$} {:>cw$} {:>dw$} {:>dw$} {:>dw$} {:>dw$} {:>dw$}",
            truncate(&s.player, PLAYER_WIDTH),
            s.session_count,
            format_duration(s.total_duration),
            format_duration(s.average_duration),
            format_duration(s.min_duration),
            format_duration(s.max_duration),
            format_duration(s.stddev_duration),
            pw = PLAYER_WIDTH,
            cw = COUNT_WIDTH,
            dw = DURATION_WIDTH,
        );
    }

    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{}~", head)
    }
}

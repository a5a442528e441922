use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::event::{Action, LogEvent};

/// `<file-prefix>:[HH:MM:SS] <anything>: <player> joined|left the game`
///
/// This is the shape grep produces when searching several files at once.
static PREFIXED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<prefix>.+?):\[(?P<h>[0-9]{2}):(?P<m>[0-9]{2}):(?P<s>[0-9]{2})\] .*: (?P<player>\w+) (?P<action>joined|left) the game",
    )
    .expect("prefixed line pattern is valid")
});

/// `[HH:MM:SS] <anything>: <player> joined|left the game`
static PLAIN_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[(?P<h>[0-9]{2}):(?P<m>[0-9]{2}):(?P<s>[0-9]{2})\] .*: (?P<player>\w+) (?P<action>joined|left) the game",
    )
    .expect("plain line pattern is valid")
});

static PREFIX_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<y>[0-9]{4})-(?P<mo>[0-9]{2})-(?P<d>[0-9]{2})")
        .expect("date pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unrecognised log line: {0}")]
    InvalidFormat(String),
    #[error("no YYYY-MM-DD date in file prefix: {0}")]
    MissingDate(String),
    #[error("invalid date or time: {0}")]
    InvalidTimestamp(String),
}

/// Parse one raw log line into a join/leave event.
///
/// Lines carrying a file prefix take their date from the prefix. Lines
/// without one are dated `reference_date`; callers wanting today's date
/// must pass it explicitly.
pub fn parse_line(raw: &str, reference_date: NaiveDate) -> Result<LogEvent, ParseError> {
    let line = raw.trim();

    if let Some(caps) = PREFIXED_LINE.captures(line) {
        let prefix = &caps["prefix"];
        let date = date_from_prefix(prefix, line)?;
        return build_event(&caps, date, line);
    }

    if let Some(caps) = PLAIN_LINE.captures(line) {
        return build_event(&caps, reference_date, line);
    }

    Err(ParseError::InvalidFormat(line.to_string()))
}

/// Take the last `YYYY-MM-DD` in the prefix, so directory names never win
/// over the file name.
fn date_from_prefix(prefix: &str, line: &str) -> Result<NaiveDate, ParseError> {
    let caps = PREFIX_DATE
        .captures_iter(prefix)
        .last()
        .ok_or_else(|| ParseError::MissingDate(line.to_string()))?;

    let year: i32 = number(&caps, "y", line)?;
    let month: u32 = number(&caps, "mo", line)?;
    let day: u32 = number(&caps, "d", line)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ParseError::InvalidTimestamp(line.to_string()))
}

fn build_event(caps: &Captures<'_>, date: NaiveDate, line: &str) -> Result<LogEvent, ParseError> {
    let hour: u32 = number(caps, "h", line)?;
    let minute: u32 = number(caps, "m", line)?;
    let second: u32 = number(caps, "s", line)?;

    let time = NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| ParseError::InvalidTimestamp(line.to_string()))?;

    let action = Action::from_verb(&caps["action"])
        .ok_or_else(|| ParseError::InvalidFormat(line.to_string()))?;

    Ok(LogEvent::new(date.and_time(time), &caps["player"], action))
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, name: &str, line: &str) -> Result<T, ParseError> {
    caps[name]
        .parse()
        .map_err(|_| ParseError::InvalidTimestamp(line.to_string()))
}

/// A line that could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    /// 1-based line number within the fetched text.
    pub line_number: usize,
    pub error: ParseError,
}

/// Result of parsing a whole block of log text.
#[derive(Debug, Default)]
pub struct ParsedLog {
    pub events: Vec<LogEvent>,
    pub failures: Vec<LineFailure>,
}

/// Parse every non-blank line. Bad lines are collected, never fatal.
pub fn parse_log(text: &str, reference_date: NaiveDate) -> ParsedLog {
    let mut parsed = ParsedLog::default();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line, reference_date) {
            Ok(event) => parsed.events.push(event),
            Err(error) => {
                tracing::debug!(line = idx + 1, %error, "skipping log line");
                parsed.failures.push(LineFailure {
                    line_number: idx + 1,
                    error,
                });
            }
        }
    }

    tracing::debug!(
        events = parsed.events.len(),
        failures = parsed.failures.len(),
        "parsed log text"
    );
    parsed
}

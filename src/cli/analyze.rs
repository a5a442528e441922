use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Args;

use super::OutputFormat;
use crate::analysis::{analyze, Analysis, AnalysisOptions};
use crate::config::{Config, VizOverrides, VizSettings};
use crate::remote::{FileLogSource, LogSource, SshLogSource};
use crate::report::timeline::{self, RenderError};
use crate::report::{format_statistics_table, json};
use crate::sessions::{Anomaly, DateRange, OpenSessionEnd, Reconstruction};

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// First day to include (YYYY-MM-DD), overrides [viz].start_date
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD), overrides [viz].end_date
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    /// Chart output path, overrides [viz].output_path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Read log lines from a local file ("-" for stdin) instead of SSH
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// Date for log lines without a dated file prefix (default: today)
    #[arg(long)]
    pub reference_date: Option<NaiveDate>,
    /// End unterminated sessions now instead of at the player's last event
    #[arg(long)]
    pub open_until_now: bool,
    /// Skip rendering the timeline image
    #[arg(long)]
    pub no_chart: bool,
    /// Statistics output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Draws the timeline for a finished analysis.
type RenderFn<'a> = &'a dyn Fn(&Reconstruction, &DateRange, &Path) -> Result<(), RenderError>;

/// How a run ended once the log text was in hand.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// No sessions to report; nothing drawn.
    Empty,
    Reported { chart: Option<PathBuf> },
}

struct ReportSettings<'a> {
    viz: &'a VizSettings,
    format: OutputFormat,
    no_chart: bool,
}

pub fn run(config_path: Option<&Path>, args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let viz = config.viz.resolve(&VizOverrides {
        start_date: args.start_date,
        end_date: args.end_date,
        output_path: args.output.clone(),
    })?;

    let source: Box<dyn LogSource> = match &args.input {
        Some(path) => Box::new(FileLogSource::new(path)),
        None => Box::new(SshLogSource::new(config.ssh()?.clone())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.format == OutputFormat::Text {
        writeln!(out, "{}", source.progress())?;
    }
    let text = source.fetch().context("failed to fetch server logs")?;

    // The only wall-clock reads in a run
    let now = Local::now().naive_local();
    let options = AnalysisOptions {
        reference_date: args.reference_date.unwrap_or_else(|| now.date()),
        range: viz.range,
        open_end: if args.open_until_now {
            OpenSessionEnd::Until(now)
        } else {
            OpenSessionEnd::LastEvent
        },
    };

    let settings = ReportSettings {
        viz: &viz,
        format: args.format,
        no_chart: args.no_chart,
    };
    process(&text, &options, &settings, &timeline::render_timeline, &mut out)?;
    Ok(())
}

/// Everything after the fetch: analyse, print the report, draw the chart.
fn process(
    text: &str,
    options: &AnalysisOptions,
    settings: &ReportSettings<'_>,
    render: RenderFn<'_>,
    out: &mut dyn Write,
) -> anyhow::Result<Outcome> {
    let text_mode = settings.format == OutputFormat::Text;

    if text_mode {
        writeln!(out, "Processing log lines...")?;
    }
    let analysis = analyze(text, options);
    if text_mode {
        writeln!(
            out,
            "Parsed {} event(s), {} in range, {} line(s) skipped",
            analysis.events_parsed,
            analysis.events_in_range,
            analysis.failures.len()
        )?;
    }
    report_failures(&analysis, text_mode, out)?;
    report_anomalies(&analysis.anomalies, text_mode, out)?;

    if analysis.is_empty() {
        match settings.format {
            OutputFormat::Text => match settings.viz.range.describe() {
                Some(window) => writeln!(out, "No player sessions found ({}).", window)?,
                None => writeln!(out, "No player sessions found.")?,
            },
            // consumers always get a document
            OutputFormat::Json => writeln!(out, "{}", json::statistics_json(&analysis.statistics)?)?,
        }
        return Ok(Outcome::Empty);
    }

    match settings.format {
        OutputFormat::Text => {
            writeln!(out)?;
            write!(out, "{}", format_statistics_table(&analysis.statistics))?;
            writeln!(out)?;
        }
        OutputFormat::Json => writeln!(out, "{}", json::statistics_json(&analysis.statistics)?)?,
    }

    if settings.no_chart {
        return Ok(Outcome::Reported { chart: None });
    }

    let path = &settings.viz.output_path;
    if text_mode {
        writeln!(out, "Rendering timeline...")?;
    }
    render(&analysis.reconstruction, &settings.viz.range, path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    if text_mode {
        writeln!(out, "Saved timeline to {}", path.display())?;
    }

    Ok(Outcome::Reported {
        chart: Some(path.clone()),
    })
}

fn report_failures(analysis: &Analysis, text_mode: bool, out: &mut dyn Write) -> std::io::Result<()> {
    for failure in &analysis.failures {
        if text_mode {
            writeln!(out, "  skipped line {}: {}", failure.line_number, failure.error)?;
        } else {
            tracing::warn!(line = failure.line_number, error = %failure.error, "skipped log line");
        }
    }
    Ok(())
}

fn report_anomalies(anomalies: &[Anomaly], text_mode: bool, out: &mut dyn Write) -> std::io::Result<()> {
    for anomaly in anomalies {
        match anomaly {
            Anomaly::OutOfRange { .. } => tracing::debug!(%anomaly, "dropped event"),
            _ => tracing::warn!(%anomaly, "session data anomaly"),
        }
    }

    if text_mode {
        for line in anomaly_summary(anomalies) {
            writeln!(out, "  {}", line)?;
        }
    }
    Ok(())
}

/// One line per anomaly kind that occurred, with its count.
fn anomaly_summary(anomalies: &[Anomaly]) -> Vec<String> {
    let mut counts = [0usize; 5];
    for anomaly in anomalies {
        let idx = match anomaly {
            Anomaly::OutOfRange { .. } => 0,
            Anomaly::DuplicateJoin { .. } => 1,
            Anomaly::OrphanLeave { .. } => 2,
            Anomaly::OpenSession { .. } => 3,
            Anomaly::NegativeDuration { .. } => 4,
        };
        counts[idx] += 1;
    }

    let labels = [
        "event(s) outside the date range dropped",
        "join(s) replaced by a later join without a leave",
        "leave(s) without a matching join ignored",
        "session(s) still open at the end of the log",
        "session(s) ending before they start counted as zero",
    ];

    counts
        .iter()
        .zip(labels)
        .filter(|(count, _)| **count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect()
}

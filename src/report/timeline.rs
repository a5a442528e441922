use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use plotters::prelude::*;

use crate::sessions::{DateRange, Reconstruction, SessionInterval};

const CHART_WIDTH: u32 = 1400;
const ROW_HEIGHT: u32 = 50;
const CHROME_HEIGHT: u32 = 180;
const BAR_HALF_HEIGHT: f64 = 0.3;
/// Padding applied when every event falls on the same instant.
const MIN_SPAN_SECS: i64 = 3600;

/// Matplotlib "tab10".
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no sessions to draw")]
    Empty,
    #[error("failed to prepare output path: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to draw chart: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Debug>(e: E) -> RenderError {
    RenderError::Draw(format!("{:?}", e))
}

/// Colour for the player on row `row`, cycling through the palette.
pub fn palette_color(row: usize) -> RGBColor {
    PALETTE[row % PALETTE.len()]
}

pub fn chart_title(range: &DateRange) -> String {
    match range.describe() {
        Some(window) => format!("Minecraft Player Sessions ({})", window),
        None => "Minecraft Player Sessions".to_string(),
    }
}

fn epoch_secs(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

fn axis_label(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc().format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Row assignment and x-extent for the chart, independent of drawing.
#[derive(Debug)]
pub struct TimelineLayout<'a> {
    pub rows: Vec<(&'a str, &'a [SessionInterval])>,
    pub x_min: i64,
    pub x_max: i64,
}

impl<'a> TimelineLayout<'a> {
    /// Players keep the row of their first appearance in the log.
    pub fn new(reconstruction: &'a Reconstruction) -> Result<Self, RenderError> {
        let rows: Vec<_> = reconstruction.ordered().collect();

        let (min, max) = rows
            .iter()
            .flat_map(|(_, sessions)| sessions.iter())
            .flat_map(|s| [epoch_secs(s.start), epoch_secs(s.end)])
            .fold(None, |acc: Option<(i64, i64)>, t| match acc {
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
                None => Some((t, t)),
            })
            .ok_or(RenderError::Empty)?;

        let (x_min, x_max) = if max - min < MIN_SPAN_SECS {
            let pad = (MIN_SPAN_SECS - (max - min)) / 2 + 1;
            (min - pad, max + pad)
        } else {
            let pad = (max - min) / 50;
            (min - pad, max + pad)
        };

        Ok(Self { rows, x_min, x_max })
    }

    /// Player name for a y-axis tick; blank between rows.
    pub fn label_for(&self, y: f64) -> String {
        if (y - y.round()).abs() > 1e-6 || y < 0.0 {
            return String::new();
        }
        self.rows
            .get(y.round() as usize)
            .map(|(player, _)| player.to_string())
            .unwrap_or_default()
    }
}

/// Create the parent directory of `path` if it is missing.
pub fn prepare_output_path(path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Draw one bar per session, one row per player, and write a PNG to `path`.
pub fn render_timeline(
    reconstruction: &Reconstruction,
    range: &DateRange,
    path: &Path,
) -> Result<(), RenderError> {
    let layout = TimelineLayout::new(reconstruction)?;
    prepare_output_path(path)?;

    let row_count = layout.rows.len();
    let height = CHROME_HEIGHT + ROW_HEIGHT * row_count as u32;

    let root = BitMapBackend::new(path, (CHART_WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(chart_title(range), ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(160)
        .build_cartesian_2d(layout.x_min..layout.x_max, -0.5f64..(row_count as f64 - 0.5))
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_labels(10)
        .x_label_formatter(&|secs: &i64| axis_label(*secs))
        .y_labels(row_count)
        .y_label_formatter(&|y: &f64| layout.label_for(*y))
        .x_desc("Time")
        .disable_y_mesh()
        .draw()
        .map_err(draw_err)?;

    for (row, (_, sessions)) in layout.rows.iter().enumerate() {
        let color = palette_color(row);
        let y = row as f64;

        chart
            .draw_series(sessions.iter().map(|s| {
                Rectangle::new(
                    [
                        (epoch_secs(s.start), y - BAR_HALF_HEIGHT),
                        (epoch_secs(s.end), y + BAR_HALF_HEIGHT),
                    ],
                    color.filled(),
                )
            }))
            .map_err(draw_err)?;

        // open sessions often have zero width; mark their start
        chart
            .draw_series(
                sessions
                    .iter()
                    .filter(|s| s.is_open)
                    .map(|s| Circle::new((epoch_secs(s.start), y), 5, color.stroke_width(2))),
            )
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    tracing::debug!(path = %path.display(), rows = row_count, "timeline written");
    Ok(())
}

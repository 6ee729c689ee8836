//! One-shot CLI commands: header summary, delta tables, export helpers
//!
//! Formatting lives here so it can be tested without touching the network.

use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Row, Table};
use nowcast_core::analytics::{fields, DeltaSummary, HeaderSummary, MergedRecord, RegionDelta};
use nowcast_core::{PanelView, TimePoint};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum CliError {
    /// A panel had no data after the fetch
    NoData { panel: String, reason: String },
    InvalidTime(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NoData { panel, reason } => {
                write!(f, "No data for {}: {}", panel, reason)
            }
            CliError::InvalidTime(input) => write!(
                f,
                "Invalid time '{}' (expected: now, 2024-06-01T10:30 or RFC 3339)",
                input
            ),
        }
    }
}

impl std::error::Error for CliError {}

// ============================================================================
// Query Helpers
// ============================================================================

/// Reference time from `--at`, floored to the playback step
pub fn parse_reference(
    at: Option<&str>,
    now: TimePoint,
    step: chrono::Duration,
) -> Result<TimePoint, CliError> {
    match at.map(str::trim) {
        None | Some("now") => Ok(now.floor_to(step)),
        Some(s) => s
            .parse::<TimePoint>()
            .map(|t| t.floor_to(step))
            .map_err(|_| CliError::InvalidTime(s.to_string())),
    }
}

/// Unwrap a ready panel or say why it is not
pub fn require<T>(view: PanelView<T>, panel: &str) -> Result<T, CliError> {
    match view {
        PanelView::Ready(value) => Ok(value),
        PanelView::Loading => Err(CliError::NoData {
            panel: panel.to_string(),
            reason: "not fetched".to_string(),
        }),
        PanelView::Failed(reason) => Err(CliError::NoData {
            panel: panel.to_string(),
            reason,
        }),
    }
}

// ============================================================================
// Formatters
// ============================================================================

/// Format the national header (human or JSON)
pub fn format_header(header: &HeaderSummary, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(header).unwrap_or_else(|_| "{}".to_string());
    }

    let actual_time = header
        .actual_time
        .map(|t| t.time_label())
        .unwrap_or_else(|| "--:--".to_string());

    let lines = [
        format!(
            "PV live:          {:.2} GW  (at {})",
            header.actual_gw, actual_time
        ),
        format!(
            "Forecast:         {:.2} GW  (at {})",
            header.forecast_at_actual_gw, actual_time
        ),
        format!("Delta:            {:+.2} GW", header.delta_gw()),
        format!(
            "Next forecast:    {:.2} GW  (at {})",
            header.next_forecast_gw,
            header.next_forecast_time.time_label()
        ),
    ];
    lines.join("\n")
}

/// Bucket counts as a one-row-per-bucket table
pub fn format_bucket_table(summary: &DeltaSummary, no_color: bool) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    if no_color {
        table.set_header(vec!["Key", "Bucket (MW)", "Regions"]);
    } else {
        table.set_header(vec![
            Cell::new("Key").fg(Color::Cyan),
            Cell::new("Bucket (MW)").fg(Color::Cyan),
            Cell::new("Regions").fg(Color::Cyan),
        ]);
    }

    for (i, bucket) in summary.buckets.iter().enumerate() {
        let mut label = Cell::new(bucket.label);
        if !no_color {
            if let Some(color) = rgb(bucket.color) {
                label = label.fg(color);
            }
        }
        table.add_row(vec![
            Cell::new(i + 1),
            label,
            Cell::new(bucket.count).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

/// Region deltas sorted by delta, most negative first (human or JSON)
pub fn format_delta_table(
    summary: &DeltaSummary,
    limit: Option<usize>,
    json: bool,
    no_color: bool,
) -> String {
    let mut rows: Vec<&RegionDelta> = summary.deltas.iter().collect();
    rows.sort_by(|a, b| a.delta.total_cmp(&b.delta));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    if json {
        let value = serde_json::json!({
            "reference": summary.reference,
            "mode": summary.mode,
            "buckets": summary.buckets,
            "deltas": rows,
        });
        return serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    }

    if rows.is_empty() {
        return "No regions found.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let headers = ["ID", "Region", "Actual MW", "Forecast MW", "Delta MW", "Actual %", "Norm %"];
    if no_color {
        table.set_header(headers.to_vec());
    } else {
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }

    for d in rows {
        let mut delta = Cell::new(format!("{:+.1}", d.delta)).set_alignment(CellAlignment::Right);
        if !no_color {
            delta = delta.fg(if d.delta < 0.0 {
                Color::Red
            } else if d.delta > 0.0 {
                Color::Blue
            } else {
                Color::DarkGrey
            });
        }

        table.add_row(Row::from(vec![
            Cell::new(d.region_id),
            Cell::new(truncate(&d.region_name, 28)),
            Cell::new(format!("{:.1}", d.actual_value_mw)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", d.forecast_value_mw)).set_alignment(CellAlignment::Right),
            delta,
            Cell::new(format_percentage(d.finite_percentage()))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.0}", d.normalized_percentage()))
                .set_alignment(CellAlignment::Right),
        ]));
    }

    table.to_string()
}

/// Regional solar/wind chart records, one row per time (human or JSON)
pub fn format_regional_table(
    records: &[MergedRecord],
    reference: TimePoint,
    json: bool,
    no_color: bool,
) -> String {
    if json {
        return serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
    }

    if records.is_empty() {
        return "No regional forecast found.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let headers = ["Time", "Solar fc MW", "Solar MW", "Wind fc MW", "Wind MW"];
    if no_color {
        table.set_header(headers.to_vec());
    } else {
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }

    let mw = |value: Option<f64>| {
        Cell::new(value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string()))
            .set_alignment(CellAlignment::Right)
    };

    for record in records {
        let future = record.formatted_time >= reference;
        let solar_fc = record
            .get(fields::SOLAR_FORECAST_PAST)
            .or_else(|| record.get(fields::SOLAR_FORECAST_FUTURE));
        let wind_fc = record
            .get(fields::WIND_FORECAST_PAST)
            .or_else(|| record.get(fields::WIND_FORECAST_FUTURE));

        let mut time = Cell::new(record.formatted_time.to_string());
        if future && !no_color {
            time = time.fg(Color::Yellow);
        }

        table.add_row(Row::from(vec![
            time,
            mw(solar_fc),
            mw(record.get(fields::SOLAR_GENERATION)),
            mw(wind_fc),
            mw(record.get(fields::WIND_GENERATION)),
        ]));
    }

    table.to_string()
}

// ============================================================================
// Utilities
// ============================================================================

fn format_percentage(pct: Option<f64>) -> String {
    pct.map(|p| format!("{:.0}%", p))
        .unwrap_or_else(|| "-".to_string())
}

fn rgb(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================

//! National (or single-region) chart tab
//!
//! Header cards on top, then one Braille line per visible chart field with
//! a vertical marker at the selected time.

use crate::components::{render_failed, render_loading};
use crate::theme::{delta_color, fg, line_color, muted, ColorScheme, StatusColor};
use nowcast_core::analytics::{fields, max_value, HeaderSummary, MergedRecord};
use nowcast_core::{PanelView, StateSnapshot, TimePoint};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};
use std::sync::Arc;

/// Legend names of the chart fields
fn legend_name(field: &str) -> &'static str {
    match field {
        fields::GENERATION => "PV live",
        fields::GENERATION_UPDATED => "PV updated",
        fields::FORECAST => "Forecast",
        fields::PAST_FORECAST => "Past forecast",
        fields::FOUR_HOUR_FORECAST => "4h forecast",
        fields::FOUR_HOUR_PAST_FORECAST => "4h past",
        _ => "",
    }
}

/// Minutes between two times, as a chart x coordinate
fn minutes_between(origin: TimePoint, time: TimePoint) -> f64 {
    (time.as_datetime() - origin.as_datetime()).num_minutes() as f64
}

/// Points of one field, x in minutes from `origin`, y divided by `divisor`
pub fn chart_points(
    records: &[MergedRecord],
    field: &str,
    origin: TimePoint,
    divisor: f64,
) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter_map(|r| {
            r.get(field)
                .map(|v| (minutes_between(origin, r.formatted_time), v / divisor))
        })
        .collect()
}

/// What the chart body shows
pub struct ChartSource<'a> {
    pub title: String,
    pub view: PanelView<Arc<Vec<MergedRecord>>>,
    /// Values are divided by this for display (1000 shows MW as GW)
    pub divisor: f64,
    pub unit: &'a str,
}

pub struct NationalTab;

impl Default for NationalTab {
    fn default() -> Self {
        Self::new()
    }
}

impl NationalTab {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        header: PanelView<HeaderSummary>,
        chart: ChartSource<'_>,
        snapshot: &StateSnapshot,
        spinner: Span<'static>,
        scheme: ColorScheme,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(8)])
            .split(area);

        self.render_header_cards(frame, chunks[0], header, scheme);

        match chart.view {
            PanelView::Loading => render_loading(frame, chunks[1], &chart.title, spinner, scheme),
            PanelView::Failed(ref message) => {
                render_failed(frame, chunks[1], &chart.title, message, scheme)
            }
            PanelView::Ready(ref records) => self.render_chart(
                frame,
                chunks[1],
                records,
                &chart,
                snapshot,
                scheme,
            ),
        }
    }

    fn render_header_cards(
        &self,
        frame: &mut Frame,
        area: Rect,
        header: PanelView<HeaderSummary>,
        scheme: ColorScheme,
    ) {
        let Some(header) = header.ready() else {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(muted(scheme)));
            frame.render_widget(block, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ])
            .split(area);

        let actual_label = header
            .actual_time
            .map(|t| t.time_label())
            .unwrap_or_else(|| "--:--".to_string());

        self.render_stat_card(
            frame,
            chunks[0],
            "PV live",
            &format!("{:.2} GW", header.actual_gw),
            &format!("at {}", actual_label),
            StatusColor::Success.to_color(scheme),
            scheme,
        );
        self.render_stat_card(
            frame,
            chunks[1],
            "Forecast",
            &format!("{:.2} GW", header.forecast_at_actual_gw),
            &format!("at {}", actual_label),
            StatusColor::Warning.to_color(scheme),
            scheme,
        );
        let delta = header.delta_gw();
        self.render_stat_card(
            frame,
            chunks[2],
            "Delta",
            &format!("{:+.2} GW", delta),
            "actual - forecast",
            delta_color(delta, scheme),
            scheme,
        );
        self.render_stat_card(
            frame,
            chunks[3],
            "Next forecast",
            &format!("{:.2} GW", header.next_forecast_gw),
            &format!("at {}", header.next_forecast_time.time_label()),
            StatusColor::Focus.to_color(scheme),
            scheme,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn render_stat_card(
        &self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        value: &str,
        subtitle: &str,
        color: ratatui::style::Color,
        scheme: ColorScheme,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(Span::styled(
                format!(" {} ", title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));

        let text = vec![
            Line::from(Span::styled(
                value.to_string(),
                Style::default().fg(fg(scheme)).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                subtitle.to_string(),
                Style::default().fg(muted(scheme)),
            )),
        ];

        let para = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(para, area);
    }

    fn render_chart(
        &self,
        frame: &mut Frame,
        area: Rect,
        records: &[MergedRecord],
        chart: &ChartSource<'_>,
        snapshot: &StateSnapshot,
        scheme: ColorScheme,
    ) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(muted(scheme)))
            .title(format!(" {} ", chart.title));

        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            let empty = Paragraph::new("No data")
                .alignment(Alignment::Center)
                .style(Style::default().fg(muted(scheme)))
                .block(block);
            frame.render_widget(empty, area);
            return;
        };
        let origin = first.formatted_time;
        let x_max = minutes_between(origin, last.formatted_time).max(1.0);

        let visible: Vec<&str> = fields::NATIONAL_LINES
            .iter()
            .copied()
            .filter(|f| snapshot.is_line_visible(f))
            .filter(|f| {
                snapshot.show_4h_view
                    || !matches!(
                        *f,
                        fields::FOUR_HOUR_FORECAST | fields::FOUR_HOUR_PAST_FORECAST
                    )
            })
            .collect();

        let y_max = max_value(records, &visible).unwrap_or(0.0) / chart.divisor;
        let y_top = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

        let series: Vec<(&str, Vec<(f64, f64)>)> = visible
            .iter()
            .map(|f| (*f, chart_points(records, f, origin, chart.divisor)))
            .collect();

        let selected_x = minutes_between(origin, snapshot.selected_time);
        let marker = [(selected_x, 0.0), (selected_x, y_top)];

        let mut datasets: Vec<Dataset> = series
            .iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(field, points)| {
                let mut style = Style::default().fg(line_color(field, scheme));
                if *field == fields::PAST_FORECAST || *field == fields::FOUR_HOUR_PAST_FORECAST {
                    style = style.add_modifier(Modifier::DIM);
                }
                Dataset::default()
                    .name(legend_name(field))
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(style)
                    .data(points)
            })
            .collect();

        if (0.0..=x_max).contains(&selected_x) {
            datasets.push(
                Dataset::default()
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(StatusColor::Focus.to_color(scheme)))
                    .data(&marker),
            );
        }

        let mid = origin
            .checked_add(chrono::Duration::minutes((x_max / 2.0) as i64))
            .map(|t| t.time_label())
            .unwrap_or_default();
        let x_labels = vec![
            Span::raw(origin.time_label()),
            Span::raw(mid),
            Span::raw(last.formatted_time.time_label()),
        ];
        let y_labels = vec![
            Span::raw("0"),
            Span::raw(format!("{:.1}", y_top / 2.0)),
            Span::raw(format!("{:.1}", y_top)),
        ];

        let chart_widget = Chart::new(datasets)
            .block(block)
            .x_axis(
                Axis::default()
                    .title(format!("UTC  (selected {})", snapshot.selected_time.time_label()))
                    .style(Style::default().fg(muted(scheme)))
                    .labels(x_labels)
                    .bounds([0.0, x_max]),
            )
            .y_axis(
                Axis::default()
                    .title(chart.unit.to_string())
                    .style(Style::default().fg(muted(scheme)))
                    .labels(y_labels)
                    .bounds([0.0, y_top]),
            );

        frame.render_widget(chart_widget, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowcast_core::analytics::{merge, national_chart_inputs, sort_records};
    use nowcast_core::models::SeriesSample;

    fn tp(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    #[test]
    fn test_chart_points_offsets_and_scale() {
        let forecast = vec![
            SeriesSample::new(tp("2024-06-01T10:00"), 5000.0),
            SeriesSample::new(tp("2024-06-01T11:00"), 6000.0),
        ];
        let inputs = national_chart_inputs(&forecast, None, &[], &[]);
        let mut records = merge(&inputs, tp("2024-06-01T10:30"));
        sort_records(&mut records);

        let origin = records[0].formatted_time;
        assert_eq!(
            chart_points(&records, fields::FORECAST, origin, 1000.0),
            vec![(60.0, 6.0)]
        );
        assert_eq!(
            chart_points(&records, fields::PAST_FORECAST, origin, 1000.0),
            vec![(0.0, 5.0)]
        );
    }

    #[test]
    fn test_every_line_has_a_legend_name() {
        for field in fields::NATIONAL_LINES {
            assert!(!legend_name(field).is_empty());
        }
    }
}

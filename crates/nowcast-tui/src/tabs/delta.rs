//! Region delta tab: bucket counts plus the two region columns

use crate::components::{render_failed, render_loading};
use crate::theme::{delta_color, fg, hex_color, muted, ColorScheme, StatusColor};
use nowcast_core::analytics::{delta_columns, BucketKey, DeltaSummary, RegionDelta};
use nowcast_core::PanelView;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One row of a region column: name, delta MW, delta %
pub fn format_row(delta: &RegionDelta) -> String {
    let pct = delta
        .finite_percentage()
        .map(|p| format!("{:>5.0}%", p))
        .unwrap_or_else(|| "    -%".to_string());
    format!(
        "{:<22} {:>+8.1} MW {}",
        truncate(&delta.region_name, 22),
        delta.delta,
        pct
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

fn region_list(
    rows: &[&RegionDelta],
    title: String,
    highlight: Style,
    scheme: ColorScheme,
) -> List<'static> {
    let items: Vec<ListItem> = rows
        .iter()
        .map(|d| {
            ListItem::new(format_row(d)).style(Style::default().fg(delta_color(d.delta, scheme)))
        })
        .collect();
    List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(highlight)
}

pub struct DeltaTab {
    negative_state: ListState,
    positive_state: ListState,
}

impl Default for DeltaTab {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaTab {
    pub fn new() -> Self {
        Self {
            negative_state: ListState::default(),
            positive_state: ListState::default(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        view: PanelView<Arc<DeltaSummary>>,
        selected: &BTreeSet<BucketKey>,
        cursor: usize,
        spinner: Span<'static>,
        scheme: ColorScheme,
    ) {
        let summary = match view {
            PanelView::Loading => {
                render_loading(frame, area, "Region deltas", spinner, scheme);
                return;
            }
            PanelView::Failed(message) => {
                render_failed(frame, area, "Region deltas", &message, scheme);
                return;
            }
            PanelView::Ready(summary) => summary,
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(9),
                Constraint::Length(1),
                Constraint::Min(5),
            ])
            .split(area);

        self.render_buckets(frame, chunks[0], &summary, selected, scheme);
        self.render_totals(frame, chunks[1], &summary, scheme);
        self.render_columns(frame, chunks[2], &summary, selected, cursor, scheme);
    }

    fn render_buckets(
        &self,
        frame: &mut Frame,
        area: Rect,
        summary: &DeltaSummary,
        selected: &BTreeSet<BucketKey>,
        scheme: ColorScheme,
    ) {
        let bars: Vec<Bar> = summary
            .buckets
            .iter()
            .enumerate()
            .map(|(i, bucket)| {
                let color = if selected.contains(&bucket.key) {
                    hex_color(bucket.color)
                } else {
                    muted(scheme)
                };
                Bar::default()
                    .value(bucket.count as u64)
                    .label(Line::from(format!("{}:{}", i + 1, bucket.label)))
                    .style(Style::default().fg(color))
                    .value_style(Style::default().fg(fg(scheme)).bg(color))
            })
            .collect();

        let chart = BarChart::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Regions per delta bucket (MW, {:?}) ", summary.mode)),
            )
            .data(BarGroup::default().bars(&bars))
            .bar_width(7)
            .bar_gap(1);

        frame.render_widget(chart, area);
    }

    fn render_totals(
        &self,
        frame: &mut Frame,
        area: Rect,
        summary: &DeltaSummary,
        scheme: ColorScheme,
    ) {
        let total = summary.total_delta_mw();
        let mut spans = vec![
            Span::styled(
                format!(" {} regions ", summary.deltas.len()),
                Style::default().fg(muted(scheme)),
            ),
            Span::styled("│", Style::default().fg(muted(scheme))),
            Span::styled(
                format!(" total {:+.1} MW ", total),
                Style::default().fg(delta_color(total, scheme)),
            ),
        ];
        let unbucketed = summary.unbucketed();
        if unbucketed > 0 {
            spans.push(Span::styled("│", Style::default().fg(muted(scheme))));
            spans.push(Span::styled(
                format!(" {} outside every bucket", unbucketed),
                Style::default().fg(StatusColor::Warning.to_color(scheme)),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    #[allow(clippy::too_many_arguments)]
    fn render_columns(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        summary: &DeltaSummary,
        selected: &BTreeSet<BucketKey>,
        cursor: usize,
        scheme: ColorScheme,
    ) {
        let columns = delta_columns(&summary.deltas, selected, summary.mode);
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let negative_len = columns.negative.len();
        if cursor < negative_len {
            self.negative_state.select(Some(cursor));
            self.positive_state.select(None);
        } else {
            self.negative_state.select(None);
            let row = cursor - negative_len;
            self.positive_state
                .select((row < columns.positive.len()).then_some(row));
        }

        let highlight = Style::default()
            .fg(StatusColor::Focus.to_color(scheme))
            .add_modifier(Modifier::BOLD | Modifier::REVERSED);

        frame.render_stateful_widget(
            region_list(
                &columns.negative,
                format!(" Under forecast ({}) ", columns.negative.len()),
                highlight,
                scheme,
            ),
            halves[0],
            &mut self.negative_state,
        );
        frame.render_stateful_widget(
            region_list(
                &columns.positive,
                format!(" Over forecast ({}) ", columns.positive.len()),
                highlight,
                scheme,
            ),
            halves[1],
            &mut self.positive_state,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowcast_core::models::RegionMeta;

    fn meta(name: &str) -> RegionMeta {
        RegionMeta {
            region_id: 1,
            region_name: name.to_string(),
            installed_capacity_mw: 100.0,
        }
    }

    #[test]
    fn test_format_row_with_percentage() {
        let row = format_row(&RegionDelta::from_values(&meta("Abham"), 10.0, 8.0));
        assert!(row.starts_with("Abham"));
        assert!(row.contains("+2.0 MW"));
        assert!(row.contains("125%"));
    }

    #[test]
    fn test_format_row_zero_forecast_has_no_percentage() {
        let row = format_row(&RegionDelta::from_values(&meta("Abham"), 10.0, 0.0));
        assert!(row.ends_with("-%"));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("Short", 22), "Short");
        let long = truncate("A very long grid supply point name", 10);
        assert_eq!(long.chars().count(), 10);
        assert!(long.ends_with('…'));
    }
}

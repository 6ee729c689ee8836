//! TUI rendering logic

use crate::app::{App, Tab};
use crate::tabs::{ChartSource, DeltaTab, NationalTab};
use crate::theme::{muted, ColorScheme, StatusColor};
use nowcast_core::models::MW_PER_GW;
use nowcast_core::{DegradedState, PlaybackStatus, StateSnapshot};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

/// Main UI renderer
pub struct Ui {
    national: NationalTab,
    delta: DeltaTab,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui {
    pub fn new() -> Self {
        Self {
            national: NationalTab::new(),
            delta: DeltaTab::new(),
        }
    }

    /// Render the full UI
    pub fn render(&mut self, frame: &mut Frame, app: &mut App) {
        let size = frame.area();
        app.spinner.tick();

        if app.is_loading {
            self.render_loading_screen(frame, size, app);
            return;
        }

        let snapshot = app.state.snapshot();
        let scheme = app.color_scheme;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tabs + playback bar
                Constraint::Min(0),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(size);

        self.render_header(frame, chunks[0], app, &snapshot);

        let content_area =
            self.render_degraded_banner(frame, chunks[1], &app.store.degraded_state());

        match app.active_tab {
            Tab::National => {
                let header = app.store.header(snapshot.time_now);
                let chart = match snapshot.clicked_region {
                    Some(region_id) => {
                        let name = app
                            .store
                            .region_meta(region_id)
                            .map(|m| m.region_name)
                            .unwrap_or_else(|| format!("GSP {}", region_id));
                        ChartSource {
                            title: format!("{} (Esc for national)", name),
                            view: app.store.region_chart(
                                region_id,
                                snapshot.selected_time,
                                snapshot.show_4h_view,
                            ),
                            divisor: 1.0,
                            unit: "MW",
                        }
                    }
                    None => ChartSource {
                        title: "National solar generation".to_string(),
                        view: app
                            .store
                            .national_chart(snapshot.selected_time, snapshot.show_4h_view),
                        divisor: MW_PER_GW,
                        unit: "GW",
                    },
                };
                self.national.render(
                    frame,
                    content_area,
                    header,
                    chart,
                    &snapshot,
                    app.spinner.render(),
                    scheme,
                );
            }
            Tab::Delta => {
                let view = app.store.deltas(snapshot.selected_time, app.boundary_mode);
                self.delta.render(
                    frame,
                    content_area,
                    view,
                    &snapshot.selected_buckets,
                    app.region_cursor,
                    app.spinner.render(),
                    scheme,
                );
            }
        }

        self.render_status_bar(frame, chunks[2], app);
    }

    fn render_loading_screen(&self, frame: &mut Frame, area: Rect, app: &App) {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Length(5),
                Constraint::Percentage(40),
            ])
            .split(area);

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(40),
                Constraint::Percentage(30),
            ])
            .split(vertical[1]);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(Span::styled(
                " nowcast ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));

        let text = vec![
            Line::from(vec![
                app.spinner.render(),
                Span::raw("  Fetching forecasts and PV live..."),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Press 'q' to quit",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let body = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(body, horizontal[1]);
    }

    fn render_header(
        &self,
        frame: &mut Frame,
        area: Rect,
        app: &App,
        snapshot: &StateSnapshot,
    ) {
        let scheme = app.color_scheme;
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let tab_bar = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(12), Constraint::Min(0)])
            .split(rows[0]);

        let logo = Paragraph::new(Line::from(vec![
            Span::styled("◈ ", Style::default().fg(Color::Cyan)),
            Span::styled("nowcast", Style::default().add_modifier(Modifier::BOLD)),
        ]));
        frame.render_widget(logo, tab_bar[0]);

        let titles: Vec<Line> = Tab::all()
            .iter()
            .map(|t| {
                let style = if *t == app.active_tab {
                    Style::default()
                        .fg(StatusColor::Focus.to_color(scheme))
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                } else {
                    Style::default().fg(muted(scheme))
                };
                Line::from(Span::styled(format!(" {} {} ", t.icon(), t.name()), style))
            })
            .collect();
        let tabs = Tabs::new(titles)
            .select(app.active_tab.index())
            .divider(Span::styled("│", Style::default().fg(muted(scheme))));
        frame.render_widget(tabs, tab_bar[1]);

        frame.render_widget(Paragraph::new(playback_line(snapshot, scheme)), rows[1]);

        let separator = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(muted(scheme)));
        frame.render_widget(separator, rows[2]);
    }

    fn render_degraded_banner(
        &self,
        frame: &mut Frame,
        area: Rect,
        state: &DegradedState,
    ) -> Rect {
        let (icon, reason, color) = match state {
            DegradedState::Healthy => return area,
            DegradedState::PartialData { reason, .. } => (" ⚠ ", reason, Color::Yellow),
            DegradedState::Unavailable { reason } => (" ✗ ", reason, Color::Red),
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(area);

        let banner = Paragraph::new(Line::from(vec![
            Span::styled(icon, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(reason.as_str(), Style::default().fg(color)),
        ]))
        .style(Style::default().bg(Color::DarkGray));

        frame.render_widget(banner, chunks[0]);
        chunks[1]
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, app: &App) {
        let status = if let Some(ref msg) = app.status_message {
            Line::from(vec![
                Span::styled(
                    " ⚠ ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(msg.as_str(), Style::default().fg(Color::Yellow)),
            ])
        } else {
            let hint = match app.active_tab {
                Tab::National => {
                    "␣ play │ ←→ step │ r reset │ 4 4h view │ g/u/f/o lines │ x export"
                }
                Tab::Delta => {
                    "␣ play │ ←→ step │ 1-9 buckets │ a all │ ↑↓ region │ ⏎ open │ x export"
                }
            };
            Line::from(vec![
                Span::styled(
                    " q",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" quit ", Style::default().fg(Color::Gray)),
                Span::styled("│", Style::default().fg(Color::Gray)),
                Span::styled(format!(" {}", hint), Style::default().fg(Color::Gray)),
            ])
        };

        let bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
        frame.render_widget(bar, area);
    }
}

/// Play state, selected time and view flags
fn playback_line(snapshot: &StateSnapshot, scheme: ColorScheme) -> Line<'static> {
    let (icon, color) = match snapshot.playback {
        PlaybackStatus::Playing => ("▶", StatusColor::Success.to_color(scheme)),
        PlaybackStatus::Paused => ("⏸", StatusColor::Warning.to_color(scheme)),
        PlaybackStatus::Stopped => ("■", muted(scheme)),
    };

    let mut spans = vec![
        Span::styled(
            format!(" {} {:<8}", icon, snapshot.playback.label()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            snapshot
                .selected_time
                .as_datetime()
                .format("%Y-%m-%d %H:%M UTC")
                .to_string(),
            Style::default()
                .fg(StatusColor::Focus.to_color(scheme))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  now {}", snapshot.time_now.time_label()),
            Style::default().fg(muted(scheme)),
        ),
    ];
    if snapshot.show_4h_view {
        spans.push(Span::styled("  │ 4h view", Style::default().fg(muted(scheme))));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowcast_core::{AppState, EventBus, TimePoint};

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_playback_line_shows_status_and_time() {
        let now: TimePoint = "2024-06-01T10:30".parse().unwrap();
        let state = AppState::new(now, EventBus::default());
        state.set_playback(PlaybackStatus::Playing);
        state.set_show_4h_view(true);

        let rendered = text(&playback_line(&state.snapshot(), ColorScheme::Dark));
        assert!(rendered.contains("playing"));
        assert!(rendered.contains("2024-06-01 10:30 UTC"));
        assert!(rendered.contains("4h view"));
    }

    #[test]
    fn test_playback_line_stopped_without_4h() {
        let now: TimePoint = "2024-06-01T10:30".parse().unwrap();
        let state = AppState::new(now, EventBus::default());

        let rendered = text(&playback_line(&state.snapshot(), ColorScheme::Light));
        assert!(rendered.contains("stopped"));
        assert!(!rendered.contains("4h view"));
    }
}

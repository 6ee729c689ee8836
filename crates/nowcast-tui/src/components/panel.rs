//! Placeholder bodies for panels that are still loading or failed

use crate::theme::{muted, ColorScheme, StatusColor};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render a bordered panel with a loading line
pub fn render_loading(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    spinner: Span<'static>,
    scheme: ColorScheme,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(muted(scheme)))
        .title(format!(" {} ", title));

    let body = Paragraph::new(vec![
        Line::from(""),
        Line::from(vec![
            spinner,
            Span::styled("  Loading...", Style::default().fg(muted(scheme))),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(block);

    frame.render_widget(body, area);
}

/// Render a bordered panel showing a fetch failure
pub fn render_failed(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    message: &str,
    scheme: ColorScheme,
) {
    let color = StatusColor::Error.to_color(scheme);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));

    let body = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            " ✗ Failed to load",
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::raw(format!("   {}", message))),
        Line::from(""),
        Line::from(Span::styled(
            "   F5 to retry",
            Style::default().fg(muted(scheme)),
        )),
    ])
    .wrap(Wrap { trim: false })
    .block(block);

    frame.render_widget(body, area);
}

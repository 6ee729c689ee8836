//! Color system for the nowcast TUI
//!
//! - Green: actual generation, healthy
//! - Yellow: forecasts, warnings
//! - Red/Blue: under/over forecast in the delta view
//! - Cyan: selection, focus

use nowcast_core::analytics::fields;
use ratatui::style::Color;

/// Terminal background the palette is tuned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Dark,
    Light,
}

impl ColorScheme {
    pub fn toggle(self) -> Self {
        match self {
            ColorScheme::Dark => ColorScheme::Light,
            ColorScheme::Light => ColorScheme::Dark,
        }
    }
}

/// Semantic status colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Success,
    Error,
    Warning,
    Neutral,
    Focus,
}

impl StatusColor {
    pub fn to_color(self, scheme: ColorScheme) -> Color {
        match scheme {
            ColorScheme::Dark => match self {
                StatusColor::Success => Color::Green,
                StatusColor::Error => Color::Red,
                StatusColor::Warning => Color::Yellow,
                StatusColor::Neutral => Color::DarkGray,
                StatusColor::Focus => Color::Cyan,
            },
            ColorScheme::Light => match self {
                StatusColor::Success => Color::Rgb(0, 128, 0),
                StatusColor::Error => Color::Rgb(200, 0, 0),
                StatusColor::Warning => Color::Rgb(180, 120, 0),
                StatusColor::Neutral => Color::Gray,
                StatusColor::Focus => Color::Rgb(0, 128, 128),
            },
        }
    }
}

/// Color of a national/region chart line
pub fn line_color(field: &str, scheme: ColorScheme) -> Color {
    match field {
        fields::GENERATION => StatusColor::Success.to_color(scheme),
        fields::GENERATION_UPDATED => match scheme {
            ColorScheme::Dark => Color::LightGreen,
            ColorScheme::Light => Color::Rgb(0, 90, 0),
        },
        fields::FORECAST | fields::PAST_FORECAST => StatusColor::Warning.to_color(scheme),
        fields::FOUR_HOUR_FORECAST | fields::FOUR_HOUR_PAST_FORECAST => match scheme {
            ColorScheme::Dark => Color::LightMagenta,
            ColorScheme::Light => Color::Rgb(128, 0, 128),
        },
        _ => StatusColor::Neutral.to_color(scheme),
    }
}

/// Parse a `#RRGGBB` bucket color, falling back to gray
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::Gray;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

/// Sign color for a delta (MW or GW)
pub fn delta_color(delta: f64, scheme: ColorScheme) -> Color {
    if !delta.is_finite() || delta == 0.0 {
        StatusColor::Neutral.to_color(scheme)
    } else if delta < 0.0 {
        StatusColor::Error.to_color(scheme)
    } else {
        match scheme {
            ColorScheme::Dark => Color::LightBlue,
            ColorScheme::Light => Color::Blue,
        }
    }
}

pub fn muted(scheme: ColorScheme) -> Color {
    StatusColor::Neutral.to_color(scheme)
}

pub fn fg(scheme: ColorScheme) -> Color {
    match scheme {
        ColorScheme::Dark => Color::White,
        ColorScheme::Light => Color::Black,
    }
}

//! Key bindings for the nowcast TUI
//!
//! Global keys work on every tab. Digits are contextual: on the Delta tab
//! `1`-`9` toggle the nine buckets, elsewhere `4` toggles the 4-hour view.

use crate::app::Tab;
use crossterm::event::{KeyCode, KeyModifiers};
use nowcast_core::analytics::{fields, BucketKey};
use std::collections::HashMap;

/// Groups of chart lines toggled together from the legend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineGroup {
    Actual,
    ActualUpdated,
    Forecast,
    FourHour,
}

impl LineGroup {
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            LineGroup::Actual => &[fields::GENERATION],
            LineGroup::ActualUpdated => &[fields::GENERATION_UPDATED],
            LineGroup::Forecast => &[fields::FORECAST, fields::PAST_FORECAST],
            LineGroup::FourHour => &[
                fields::FOUR_HOUR_FORECAST,
                fields::FOUR_HOUR_PAST_FORECAST,
            ],
        }
    }
}

/// Actions that can be triggered by keyboard shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Quit,
    /// Refetch every series now
    Refresh,
    ThemeToggle,
    NextTab,
    PrevTab,
    TogglePlay,
    /// Stop and jump back to "now"
    Reset,
    StepBack,
    StepForward,
    ToggleFourHour,
    ToggleLine(LineGroup),
    ToggleBucket(BucketKey),
    SelectAllBuckets,
    SelectionUp,
    SelectionDown,
    /// Open the chart of the highlighted region
    OpenRegion,
    /// Back to the national view / clear the region selection
    CloseRegion,
    /// Write the current view to CSV
    Export,
}

impl KeyAction {
    /// Human-readable description for the help line
    pub fn description(&self) -> &'static str {
        match self {
            KeyAction::Quit => "Quit",
            KeyAction::Refresh => "Refresh data",
            KeyAction::ThemeToggle => "Toggle theme",
            KeyAction::NextTab => "Next tab",
            KeyAction::PrevTab => "Previous tab",
            KeyAction::TogglePlay => "Play / pause",
            KeyAction::Reset => "Reset to now",
            KeyAction::StepBack => "Step back",
            KeyAction::StepForward => "Step forward",
            KeyAction::ToggleFourHour => "Toggle 4-hour forecast",
            KeyAction::ToggleLine(_) => "Toggle chart line",
            KeyAction::ToggleBucket(_) => "Toggle delta bucket",
            KeyAction::SelectAllBuckets => "Select every bucket",
            KeyAction::SelectionUp => "Previous region",
            KeyAction::SelectionDown => "Next region",
            KeyAction::OpenRegion => "Open region chart",
            KeyAction::CloseRegion => "Close region chart",
            KeyAction::Export => "Export CSV",
        }
    }
}

/// Key with modifiers for lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct KeyWithMods {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyWithMods {
    fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
        }
    }
}

/// Keybinding tables
pub struct KeyBindings {
    global: HashMap<KeyWithMods, KeyAction>,
    national: HashMap<KeyWithMods, KeyAction>,
    delta: HashMap<KeyWithMods, KeyAction>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        use KeyCode::{BackTab, Char, Down, Enter, Esc, Left, Right, Tab, Up, F};

        let mut global = HashMap::new();
        global.insert(KeyWithMods::plain(Char('q')), KeyAction::Quit);
        global.insert(KeyWithMods::ctrl('c'), KeyAction::Quit);
        global.insert(KeyWithMods::plain(F(5)), KeyAction::Refresh);
        global.insert(KeyWithMods::ctrl('t'), KeyAction::ThemeToggle);
        global.insert(KeyWithMods::plain(Tab), KeyAction::NextTab);
        global.insert(
            KeyWithMods {
                code: BackTab,
                modifiers: KeyModifiers::SHIFT,
            },
            KeyAction::PrevTab,
        );
        global.insert(KeyWithMods::plain(Char(' ')), KeyAction::TogglePlay);
        global.insert(KeyWithMods::plain(Char('r')), KeyAction::Reset);
        global.insert(KeyWithMods::plain(Left), KeyAction::StepBack);
        global.insert(KeyWithMods::plain(Char('h')), KeyAction::StepBack);
        global.insert(KeyWithMods::plain(Right), KeyAction::StepForward);
        global.insert(KeyWithMods::plain(Char('l')), KeyAction::StepForward);
        global.insert(KeyWithMods::plain(Char('x')), KeyAction::Export);
        global.insert(KeyWithMods::plain(Esc), KeyAction::CloseRegion);

        let mut national = HashMap::new();
        national.insert(KeyWithMods::plain(Char('4')), KeyAction::ToggleFourHour);
        national.insert(
            KeyWithMods::plain(Char('g')),
            KeyAction::ToggleLine(LineGroup::Actual),
        );
        national.insert(
            KeyWithMods::plain(Char('u')),
            KeyAction::ToggleLine(LineGroup::ActualUpdated),
        );
        national.insert(
            KeyWithMods::plain(Char('f')),
            KeyAction::ToggleLine(LineGroup::Forecast),
        );
        national.insert(
            KeyWithMods::plain(Char('o')),
            KeyAction::ToggleLine(LineGroup::FourHour),
        );

        let mut delta = HashMap::new();
        for (position, key) in BucketKey::ALL.iter().enumerate() {
            let digit = char::from(b'1' + position as u8);
            delta.insert(KeyWithMods::plain(Char(digit)), KeyAction::ToggleBucket(*key));
        }
        delta.insert(KeyWithMods::plain(Char('a')), KeyAction::SelectAllBuckets);
        delta.insert(KeyWithMods::plain(Up), KeyAction::SelectionUp);
        delta.insert(KeyWithMods::plain(Char('k')), KeyAction::SelectionUp);
        delta.insert(KeyWithMods::plain(Down), KeyAction::SelectionDown);
        delta.insert(KeyWithMods::plain(Char('j')), KeyAction::SelectionDown);
        delta.insert(KeyWithMods::plain(Enter), KeyAction::OpenRegion);

        Self {
            global,
            national,
            delta,
        }
    }

    /// Resolve a key press; tab bindings win over global ones
    pub fn resolve(&self, tab: Tab, code: KeyCode, modifiers: KeyModifiers) -> Option<KeyAction> {
        // Shift is implied by the character itself for symbols
        let modifiers = if matches!(code, KeyCode::Char(_)) {
            modifiers - KeyModifiers::SHIFT
        } else {
            modifiers
        };
        let key = KeyWithMods { code, modifiers };

        let tab_map = match tab {
            Tab::National => &self.national,
            Tab::Delta => &self.delta,
        };
        tab_map
            .get(&key)
            .or_else(|| self.global.get(&key))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_keys_on_every_tab() {
        let bindings = KeyBindings::new();
        for tab in [Tab::National, Tab::Delta] {
            assert_eq!(
                bindings.resolve(tab, KeyCode::Char(' '), KeyModifiers::NONE),
                Some(KeyAction::TogglePlay)
            );
            assert_eq!(
                bindings.resolve(tab, KeyCode::Left, KeyModifiers::NONE),
                Some(KeyAction::StepBack)
            );
            assert_eq!(
                bindings.resolve(tab, KeyCode::Char('c'), KeyModifiers::CONTROL),
                Some(KeyAction::Quit)
            );
        }
    }

    #[test]
    fn test_digit_four_is_contextual() {
        let bindings = KeyBindings::new();

        assert_eq!(
            bindings.resolve(Tab::National, KeyCode::Char('4'), KeyModifiers::NONE),
            Some(KeyAction::ToggleFourHour)
        );
        assert_eq!(
            bindings.resolve(Tab::Delta, KeyCode::Char('4'), KeyModifiers::NONE),
            Some(KeyAction::ToggleBucket(BucketKey::ALL[3]))
        );
    }

    #[test]
    fn test_bucket_digits_in_order() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.resolve(Tab::Delta, KeyCode::Char('1'), KeyModifiers::NONE),
            Some(KeyAction::ToggleBucket(BucketKey::ALL[0]))
        );
        assert_eq!(
            bindings.resolve(Tab::Delta, KeyCode::Char('5'), KeyModifiers::NONE),
            Some(KeyAction::ToggleBucket(BucketKey::CENTER))
        );
        assert_eq!(
            bindings.resolve(Tab::Delta, KeyCode::Char('9'), KeyModifiers::NONE),
            Some(KeyAction::ToggleBucket(BucketKey::ALL[8]))
        );
        assert_eq!(
            bindings.resolve(Tab::National, KeyCode::Char('9'), KeyModifiers::NONE),
            None
        );
    }

    #[test]
    fn test_shifted_char_still_resolves() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.resolve(Tab::National, KeyCode::Char('q'), KeyModifiers::SHIFT),
            Some(KeyAction::Quit)
        );
    }

    #[test]
    fn test_forecast_group_covers_both_fields() {
        assert_eq!(
            LineGroup::Forecast.fields(),
            &[fields::FORECAST, fields::PAST_FORECAST]
        );
    }
}

//! TUI application state and input handling

use crate::components::Spinner;
use crate::keybindings::{KeyAction, KeyBindings, LineGroup};
use crate::theme::ColorScheme;
use crossterm::event::{KeyCode, KeyModifiers};
use nowcast_core::analytics::{delta_columns, fields, BoundaryMode, BucketKey};
use nowcast_core::models::RegionId;
use nowcast_core::{
    export_deltas_to_csv, export_records_to_csv, AppState, DataEvent, DataStore, PlaybackClock,
    TimePoint,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Active tab in the TUI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    National,
    Delta,
}

impl Tab {
    pub fn all() -> &'static [Tab] {
        &[Tab::National, Tab::Delta]
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::National => 0,
            Tab::Delta => 1,
        }
    }

    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => Tab::Delta,
            _ => Tab::National,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tab::National => "National",
            Tab::Delta => "Delta",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Tab::National => "◔",
            Tab::Delta => "±",
        }
    }
}

/// TUI application state
pub struct App {
    pub store: Arc<DataStore>,
    pub state: AppState,
    pub clock: PlaybackClock,

    /// Event receiver for store and state updates
    pub event_rx: broadcast::Receiver<DataEvent>,

    /// Wakes the background refresh loop
    pub refresh: Arc<Notify>,

    pub keybindings: KeyBindings,
    pub active_tab: Tab,
    pub should_quit: bool,

    /// True until the first refresh completes
    pub is_loading: bool,
    pub spinner: Spinner,

    pub color_scheme: ColorScheme,
    pub boundary_mode: BoundaryMode,

    /// Highlighted row in the delta columns (negative column first)
    pub region_cursor: usize,

    /// Error/info message for the status bar
    pub status_message: Option<String>,

    export_dir: PathBuf,
}

impl App {
    pub fn new(
        store: Arc<DataStore>,
        state: AppState,
        clock: PlaybackClock,
        boundary_mode: BoundaryMode,
    ) -> Self {
        let event_rx = state.event_bus().subscribe();

        Self {
            store,
            state,
            clock,
            event_rx,
            refresh: Arc::new(Notify::new()),
            keybindings: KeyBindings::new(),
            active_tab: Tab::National,
            should_quit: false,
            is_loading: true,
            spinner: Spinner::new(),
            color_scheme: ColorScheme::Dark,
            boundary_mode,
            region_cursor: 0,
            status_message: None,
            export_dir: PathBuf::from("."),
        }
    }

    /// Directory `x` writes CSV files into
    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = dir;
        self
    }

    /// Handle keyboard input. Returns true if the key was bound.
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match self.keybindings.resolve(self.active_tab, code, modifiers) {
            Some(action) => {
                debug!(?action, "Key action");
                self.apply(action);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::Quit => self.should_quit = true,
            KeyAction::Refresh => {
                self.status_message = None;
                self.refresh.notify_one();
            }
            KeyAction::ThemeToggle => self.color_scheme = self.color_scheme.toggle(),
            KeyAction::NextTab => {
                let idx = self.active_tab.index();
                self.active_tab = Tab::from_index((idx + 1) % Tab::all().len());
            }
            KeyAction::PrevTab => {
                let idx = self.active_tab.index();
                self.active_tab =
                    Tab::from_index((idx + Tab::all().len() - 1) % Tab::all().len());
            }
            KeyAction::TogglePlay => {
                if let Err(e) = self.clock.toggle() {
                    warn!(error = %e, "Cannot start playback");
                    self.status_message = Some(e.to_string());
                }
            }
            KeyAction::Reset => self.clock.reset(),
            KeyAction::StepBack => {
                self.clock.step(-1);
            }
            KeyAction::StepForward => {
                self.clock.step(1);
            }
            KeyAction::ToggleFourHour => {
                let show = self.state.toggle_4h_view();
                if show {
                    self.refresh.notify_one();
                }
            }
            KeyAction::ToggleLine(group) => self.toggle_line_group(group),
            KeyAction::ToggleBucket(key) => {
                self.state.toggle_bucket(key);
                self.region_cursor = 0;
            }
            KeyAction::SelectAllBuckets => {
                self.state.set_selected_buckets(BucketKey::all());
                self.region_cursor = 0;
            }
            KeyAction::SelectionUp => {
                self.region_cursor = self.region_cursor.saturating_sub(1);
            }
            KeyAction::SelectionDown => {
                let rows = self.visible_regions().len();
                if self.region_cursor + 1 < rows {
                    self.region_cursor += 1;
                }
            }
            KeyAction::OpenRegion => {
                if let Some(region_id) = self.highlighted_region() {
                    self.state.select_region(Some(region_id));
                    self.active_tab = Tab::National;
                    self.refresh.notify_one();
                }
            }
            KeyAction::CloseRegion => self.state.select_region(None),
            KeyAction::Export => {
                self.status_message = Some(match self.export_current_view() {
                    Ok(path) => format!("Exported {}", path.display()),
                    Err(e) => format!("Export failed: {}", e),
                });
            }
        }
    }

    fn toggle_line_group(&self, group: LineGroup) {
        let snapshot = self.state.snapshot();
        let visible = !group
            .fields()
            .iter()
            .all(|field| snapshot.is_line_visible(field));
        for field in group.fields() {
            self.state.set_line_visible(field, visible);
        }
    }

    /// Region ids in display order: negative column, then positive column
    pub fn visible_regions(&self) -> Vec<RegionId> {
        let Some(summary) = self
            .store
            .deltas(self.state.selected_time(), self.boundary_mode)
            .ready()
        else {
            return Vec::new();
        };
        let selected = self.state.selected_buckets();
        let columns = delta_columns(&summary.deltas, &selected, self.boundary_mode);
        columns
            .negative
            .iter()
            .chain(columns.positive.iter())
            .map(|d| d.region_id)
            .collect()
    }

    pub fn highlighted_region(&self) -> Option<RegionId> {
        self.visible_regions().get(self.region_cursor).copied()
    }

    /// Drain pending events (non-blocking)
    pub fn poll_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.on_event(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event receiver lagged");
                }
                Err(_) => break,
            }
        }
    }

    fn on_event(&mut self, event: DataEvent) {
        match event {
            DataEvent::LoadCompleted => {
                self.is_loading = false;
                self.clock.set_bounds(self.store.bounds());
            }
            DataEvent::SeriesFailed { slot, message } => {
                self.status_message = Some(format!("{}: {}", slot.name(), message));
            }
            DataEvent::SelectedTimeChanged(_) | DataEvent::BucketSelectionChanged => {
                let rows = self.visible_regions().len();
                if self.region_cursor >= rows {
                    self.region_cursor = rows.saturating_sub(1);
                }
            }
            DataEvent::RegionSelected(None) => {
                debug!("Region chart closed");
            }
            _ => {}
        }
    }

    fn export_current_view(&self) -> anyhow::Result<PathBuf> {
        let snapshot = self.state.snapshot();
        let reference = snapshot.selected_time;
        let stamp = reference.as_datetime().format("%Y%m%dT%H%M");

        match self.active_tab {
            Tab::National => {
                let (view, name) = match snapshot.clicked_region {
                    Some(region_id) => (
                        self.store
                            .region_chart(region_id, reference, snapshot.show_4h_view),
                        format!("nowcast-region-{}-{}.csv", region_id, stamp),
                    ),
                    None => (
                        self.store.national_chart(reference, snapshot.show_4h_view),
                        format!("nowcast-national-{}.csv", stamp),
                    ),
                };
                let records = view
                    .ready()
                    .ok_or_else(|| anyhow::anyhow!("chart data not loaded"))?;
                let path = self.export_dir.join(name);
                export_records_to_csv(&records, &fields::NATIONAL_LINES, &path)?;
                Ok(path)
            }
            Tab::Delta => {
                let summary = self
                    .store
                    .deltas(reference, self.boundary_mode)
                    .ready()
                    .ok_or_else(|| anyhow::anyhow!("region data not loaded"))?;
                let path = self.export_dir.join(format!("nowcast-deltas-{}.csv", stamp));
                export_deltas_to_csv(&summary.deltas, &path)?;
                Ok(path)
            }
        }
    }

    /// Time the header treats as "now"
    pub fn time_now(&self) -> TimePoint {
        self.state.time_now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowcast_core::models::{ForecastValue, GspAllForecasts, GspPvLive};
    use nowcast_core::{EventBus, PlaybackConfig, PlaybackStatus, SlotUpdate, TickDriver};

    fn tp(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    fn app() -> App {
        let store = Arc::new(DataStore::default());
        let state = AppState::new(tp("2024-06-01T10:00"), store.event_bus().clone());
        let config = PlaybackConfig {
            driver: TickDriver::Manual,
            ..PlaybackConfig::default()
        };
        let clock = PlaybackClock::with_anchor(state.clone(), config, || {
            "2024-06-01T12:00".parse().unwrap()
        });
        App::new(store, state, clock, BoundaryMode::Legacy)
    }

    fn load_regions(app: &App) {
        let forecasts: GspAllForecasts = serde_json::from_str(
            r#"{"forecasts": [
                {"location": {"gspId": 1, "regionName": "A"}, "forecastValues": [
                    {"targetTime": "2024-06-01T10:00:00+00:00", "expectedPowerGenerationMegawatts": 50.0}]},
                {"location": {"gspId": 2, "regionName": "B"}, "forecastValues": [
                    {"targetTime": "2024-06-01T10:00:00+00:00", "expectedPowerGenerationMegawatts": 10.0}]}
            ]}"#,
        )
        .unwrap();
        let pv: Vec<GspPvLive> = serde_json::from_str(
            r#"[
                {"gspId": 1, "regionName": "A", "installedCapacityMw": 100.0,
                 "gspYields": [{"datetimeUtc": "2024-06-01T10:00:00+00:00", "solarGenerationKw": 20000}]},
                {"gspId": 2, "regionName": "B", "installedCapacityMw": 100.0,
                 "gspYields": [{"datetimeUtc": "2024-06-01T10:00:00+00:00", "solarGenerationKw": 40000}]}
            ]"#,
        )
        .unwrap();
        app.store.ingest(SlotUpdate::RegionForecasts(forecasts));
        app.store.ingest(SlotUpdate::RegionPvLive(pv));
    }

    #[test]
    fn test_tab_cycling() {
        let mut app = app();
        assert!(app.handle_key(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(app.active_tab, Tab::Delta);
        assert!(app.handle_key(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(app.active_tab, Tab::National);
        assert!(app.handle_key(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(app.active_tab, Tab::Delta);
    }

    #[test]
    fn test_space_toggles_playback() {
        let mut app = app();
        app.handle_key(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(app.clock.status(), PlaybackStatus::Playing);
        app.handle_key(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(app.clock.status(), PlaybackStatus::Paused);
    }

    #[test]
    fn test_arrows_step_and_reset_returns_to_anchor() {
        let mut app = app();
        app.handle_key(KeyCode::Right, KeyModifiers::NONE);
        assert_eq!(app.state.selected_time(), tp("2024-06-01T10:30"));
        app.handle_key(KeyCode::Left, KeyModifiers::NONE);
        app.handle_key(KeyCode::Left, KeyModifiers::NONE);
        assert_eq!(app.state.selected_time(), tp("2024-06-01T09:30"));

        app.handle_key(KeyCode::Char('r'), KeyModifiers::NONE);
        assert_eq!(app.state.selected_time(), tp("2024-06-01T12:00"));
        assert_eq!(app.clock.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn test_four_toggles_view_on_national_tab() {
        let mut app = app();
        app.handle_key(KeyCode::Char('4'), KeyModifiers::NONE);
        assert!(app.state.show_4h_view());
        app.handle_key(KeyCode::Char('4'), KeyModifiers::NONE);
        assert!(!app.state.show_4h_view());
    }

    #[test]
    fn test_digits_toggle_buckets_on_delta_tab() {
        let mut app = app();
        app.active_tab = Tab::Delta;

        app.handle_key(KeyCode::Char('1'), KeyModifiers::NONE);
        assert!(!app.state.selected_buckets().contains(&BucketKey::ALL[0]));
        assert!(!app.state.show_4h_view());

        app.handle_key(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(app.state.selected_buckets(), BucketKey::all());
    }

    #[test]
    fn test_forecast_line_group_toggles_together() {
        let mut app = app();
        app.handle_key(KeyCode::Char('f'), KeyModifiers::NONE);
        let snapshot = app.state.snapshot();
        assert!(!snapshot.is_line_visible(fields::FORECAST));
        assert!(!snapshot.is_line_visible(fields::PAST_FORECAST));
        assert!(snapshot.is_line_visible(fields::GENERATION));

        app.handle_key(KeyCode::Char('f'), KeyModifiers::NONE);
        assert!(app.state.snapshot().is_line_visible(fields::FORECAST));
    }

    #[test]
    fn test_region_cursor_and_open_region() {
        let mut app = app();
        load_regions(&app);
        app.active_tab = Tab::Delta;

        // A: 20 - 50 = -30 (negative column), B: 40 - 10 = +30 (positive column)
        assert_eq!(app.visible_regions(), vec![1, 2]);

        app.handle_key(KeyCode::Down, KeyModifiers::NONE);
        app.handle_key(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(app.region_cursor, 1);

        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.state.clicked_region(), Some(2));
        assert_eq!(app.active_tab, Tab::National);

        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.state.clicked_region(), None);
    }

    #[test]
    fn test_load_completed_sets_bounds() {
        let mut app = app();
        let forecast = vec![
            ForecastValue {
                target_time: tp("2024-06-01T09:00"),
                expected_power_generation_megawatts: Some(1.0),
            },
            ForecastValue {
                target_time: tp("2024-06-01T10:30"),
                expected_power_generation_megawatts: Some(2.0),
            },
        ];
        app.store.ingest(SlotUpdate::NationalForecast(forecast));
        app.store.event_bus().publish(DataEvent::LoadCompleted);

        app.poll_events();

        assert!(!app.is_loading);
        assert!(app.clock.step(1));
        assert!(!app.clock.step(1));
        assert_eq!(app.state.selected_time(), tp("2024-06-01T10:30"));
    }

    #[test]
    fn test_failed_slot_sets_status_message() {
        let mut app = app();
        app.store
            .fail(nowcast_core::DataSlot::RegionPvLive, "HTTP 503");
        app.poll_events();
        assert!(app.status_message.unwrap().contains("HTTP 503"));
    }

    #[test]
    fn test_export_without_data_reports_error() {
        let mut app = app();
        app.handle_key(KeyCode::Char('x'), KeyModifiers::NONE);
        assert!(app.status_message.unwrap().starts_with("Export failed"));
    }

    #[test]
    fn test_unbound_key_not_handled() {
        let mut app = app();
        assert!(!app.handle_key(KeyCode::Char('z'), KeyModifiers::NONE));
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        app.handle_key(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(app.should_quit);
    }

    #[test]
    fn test_events_shared_with_state() {
        let bus = EventBus::default();
        let store = Arc::new(DataStore::new(bus.clone()));
        let state = AppState::new(tp("2024-06-01T10:00"), bus);
        let clock = PlaybackClock::new(
            state.clone(),
            PlaybackConfig {
                driver: TickDriver::Manual,
                ..PlaybackConfig::default()
            },
        );
        let mut app = App::new(store, state, clock, BoundaryMode::Legacy);

        app.state.select_region(Some(7));
        assert_eq!(
            app.event_rx.try_recv().unwrap(),
            DataEvent::RegionSelected(Some(7))
        );
    }
}

//! nowcast-tui - TUI frontend for nowcast using Ratatui

pub mod app;
pub mod components;
pub mod keybindings;
pub mod tabs;
pub mod theme;
pub mod ui;

pub use app::App;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nowcast_core::{
    ApiClient, AppState, DashboardConfig, DataStore, PlaybackClock, PlaybackConfig, RefreshOptions,
    TickDriver, TimePoint,
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Run the TUI application until the user quits
pub async fn run(
    store: Arc<DataStore>,
    client: Arc<ApiClient>,
    config: DashboardConfig,
    export_dir: PathBuf,
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let playback = config.playback_config(TickDriver::Tokio);
    let state = AppState::new(playback.anchor_at(TimePoint::now()), store.event_bus().clone());
    state.set_show_4h_view(config.show_4h_view);
    let anchor = playback.clone();
    let clock = PlaybackClock::new(state.clone(), playback);

    let mut app = App::new(store.clone(), state.clone(), clock, config.bucket_boundaries)
        .with_export_dir(export_dir);
    let mut ui = ui::Ui::new();

    let refresh_task = spawn_refresh_loop(
        store,
        client,
        state,
        Arc::clone(&app.refresh),
        config.refresh_interval(),
        anchor,
    );

    let result = run_loop(&mut terminal, &mut app, &mut ui);

    refresh_task.abort();
    app.clock.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Refetch on the configured interval and whenever `wake` is notified
fn spawn_refresh_loop(
    store: Arc<DataStore>,
    client: Arc<ApiClient>,
    state: AppState,
    wake: Arc<Notify>,
    interval: Duration,
    anchor: PlaybackConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wake.notified() => {}
            }

            state.set_time_now(anchor.anchor_at(TimePoint::now()));
            let snapshot = state.snapshot();
            let options = RefreshOptions {
                show_4h_view: snapshot.show_4h_view,
                region: snapshot.clicked_region,
            };

            let report = store.refresh(&client, options).await;
            if report.has_fatal_errors() {
                warn!(failed = report.slots_failed, "Refresh lost the national forecast");
            }
        }
    })
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, ui: &mut ui::Ui) -> Result<()>
where
    <B as Backend>::Error: Send + Sync + 'static,
{
    loop {
        app.poll_events();

        terminal.draw(|f| ui.render(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

//! nowcast-core - Core library for nowcast
//!
//! Provides the series merge, region deltas, playback clock, shared state,
//! data store and backend client for the solar nowcasting dashboard.

pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod models;
pub mod playback;
pub mod state;
pub mod store;

pub use client::{ApiClient, EnergySource};
pub use config::DashboardConfig;
pub use error::{CoreError, DegradedState, LoadReport};
pub use event::{DataEvent, DataSlot, EventBus};
pub use export::{export_deltas_to_csv, export_deltas_to_json, export_records_to_csv};
pub use models::TimePoint;
pub use playback::{PlaybackClock, PlaybackConfig, PlaybackStatus, TickDriver, TimeBounds};
pub use state::{AppState, StateSnapshot};
pub use store::{DataStore, FetchState, PanelView, RefreshOptions, RegionalMix, SlotUpdate};

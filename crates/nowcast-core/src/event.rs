//! Event bus for nowcast using tokio::broadcast
//!
//! Data refreshes, state setters and the playback clock all publish here;
//! the TUI subscribes for redraw triggers.

use crate::models::{RegionId, TimePoint};
use crate::playback::PlaybackStatus;
use tokio::sync::broadcast;

/// A fetched data slot of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSlot {
    NationalForecast,
    NationalFourHour,
    NationalPvInDay,
    NationalPvDayAfter,
    RegionForecasts,
    RegionPvLive,
    RegionDetail,
    /// Solar/wind series of the regional product
    RegionalMix,
}

impl DataSlot {
    pub const ALL: [DataSlot; 8] = [
        DataSlot::NationalForecast,
        DataSlot::NationalFourHour,
        DataSlot::NationalPvInDay,
        DataSlot::NationalPvDayAfter,
        DataSlot::RegionForecasts,
        DataSlot::RegionPvLive,
        DataSlot::RegionDetail,
        DataSlot::RegionalMix,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataSlot::NationalForecast => "national_forecast",
            DataSlot::NationalFourHour => "national_forecast_4h",
            DataSlot::NationalPvInDay => "pv_live_in_day",
            DataSlot::NationalPvDayAfter => "pv_live_day_after",
            DataSlot::RegionForecasts => "region_forecasts",
            DataSlot::RegionPvLive => "region_pv_live",
            DataSlot::RegionDetail => "region_detail",
            DataSlot::RegionalMix => "regional_mix",
        }
    }
}

/// Events emitted by the data and state layers
#[derive(Debug, Clone, PartialEq)]
pub enum DataEvent {
    /// A slot received fresh data
    SeriesUpdated(DataSlot),
    /// A slot's fetch failed
    SeriesFailed { slot: DataSlot, message: String },
    /// A full refresh finished
    LoadCompleted,
    /// The shared time of interest moved
    SelectedTimeChanged(TimePoint),
    /// Wall-clock "now" (floored) moved
    TimeNowChanged(TimePoint),
    PlaybackChanged(PlaybackStatus),
    VisibleLinesChanged,
    BucketSelectionChanged,
    RegionSelected(Option<RegionId>),
    FourHourViewToggled(bool),
}

/// Broadcast bus shared by the store, the state and the clock.
///
/// Cloning gives another handle on the same channel. Slow receivers lag
/// rather than block publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DataEvent>,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DataEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

//! Shared application state
//!
//! One `AppState` per dashboard session. Every slot is written through a
//! named setter that publishes a [`DataEvent`] after the write, so panels
//! redraw from events instead of polling. Readers take a [`StateSnapshot`]
//! to see all slots at one instant.

use crate::analytics::{fields, BucketKey};
use crate::event::{DataEvent, EventBus};
use crate::models::{RegionId, TimePoint};
use crate::playback::PlaybackStatus;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Consistent copy of every state slot
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// Time of interest shared by every panel
    pub selected_time: TimePoint,
    /// Wall-clock now, floored to the playback step
    pub time_now: TimePoint,
    pub playback: PlaybackStatus,
    /// Chart lines currently shown (legend toggles)
    pub visible_lines: BTreeSet<String>,
    /// Delta buckets whose regions are listed
    pub selected_buckets: BTreeSet<BucketKey>,
    pub clicked_region: Option<RegionId>,
    pub show_4h_view: bool,
}

impl StateSnapshot {
    fn initial(now: TimePoint) -> Self {
        Self {
            selected_time: now,
            time_now: now,
            playback: PlaybackStatus::Stopped,
            visible_lines: fields::NATIONAL_LINES.iter().map(|l| l.to_string()).collect(),
            selected_buckets: BucketKey::all(),
            clicked_region: None,
            show_4h_view: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackStatus::Playing
    }

    pub fn is_line_visible(&self, line: &str) -> bool {
        self.visible_lines.contains(line)
    }
}

/// Thread-safe handle to the shared state; clones share the same slots
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<StateSnapshot>>,
    event_bus: EventBus,
}

impl AppState {
    pub fn new(now: TimePoint, event_bus: EventBus) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StateSnapshot::initial(now))),
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.read().clone()
    }

    pub fn selected_time(&self) -> TimePoint {
        self.inner.read().selected_time
    }

    pub fn time_now(&self) -> TimePoint {
        self.inner.read().time_now
    }

    pub fn playback(&self) -> PlaybackStatus {
        self.inner.read().playback
    }

    pub fn is_playing(&self) -> bool {
        self.inner.read().is_playing()
    }

    pub fn clicked_region(&self) -> Option<RegionId> {
        self.inner.read().clicked_region
    }

    pub fn show_4h_view(&self) -> bool {
        self.inner.read().show_4h_view
    }

    pub fn selected_buckets(&self) -> BTreeSet<BucketKey> {
        self.inner.read().selected_buckets.clone()
    }

    /// Apply `f` under the write lock, publishing `event` if it reports a change
    fn update(&self, f: impl FnOnce(&mut StateSnapshot) -> Option<DataEvent>) {
        let event = {
            let mut guard = self.inner.write();
            f(&mut guard)
        };
        if let Some(event) = event {
            self.event_bus.publish(event);
        }
    }

    pub fn set_selected_time(&self, time: TimePoint) {
        self.update(|s| {
            (s.selected_time != time).then(|| {
                s.selected_time = time;
                DataEvent::SelectedTimeChanged(time)
            })
        });
    }

    pub fn set_time_now(&self, time: TimePoint) {
        self.update(|s| {
            (s.time_now != time).then(|| {
                s.time_now = time;
                DataEvent::TimeNowChanged(time)
            })
        });
    }

    pub fn set_playback(&self, status: PlaybackStatus) {
        self.update(|s| {
            (s.playback != status).then(|| {
                s.playback = status;
                DataEvent::PlaybackChanged(status)
            })
        });
    }

    pub fn set_line_visible(&self, line: &str, visible: bool) {
        self.update(|s| {
            let changed = if visible {
                s.visible_lines.insert(line.to_string())
            } else {
                s.visible_lines.remove(line)
            };
            changed.then_some(DataEvent::VisibleLinesChanged)
        });
    }

    /// Flip a line's visibility, returning the new state
    pub fn toggle_line(&self, line: &str) -> bool {
        let visible = !self.inner.read().is_line_visible(line);
        self.set_line_visible(line, visible);
        visible
    }

    /// Flip one bucket in the selection, returning whether it is now selected
    pub fn toggle_bucket(&self, key: BucketKey) -> bool {
        let mut selected = false;
        self.update(|s| {
            if !s.selected_buckets.remove(&key) {
                s.selected_buckets.insert(key);
                selected = true;
            }
            Some(DataEvent::BucketSelectionChanged)
        });
        selected
    }

    pub fn set_selected_buckets(&self, buckets: BTreeSet<BucketKey>) {
        self.update(|s| {
            (s.selected_buckets != buckets).then(|| {
                s.selected_buckets = buckets;
                DataEvent::BucketSelectionChanged
            })
        });
    }

    pub fn select_region(&self, region: Option<RegionId>) {
        self.update(|s| {
            (s.clicked_region != region).then(|| {
                s.clicked_region = region;
                DataEvent::RegionSelected(region)
            })
        });
    }

    pub fn set_show_4h_view(&self, show: bool) {
        self.update(|s| {
            (s.show_4h_view != show).then(|| {
                s.show_4h_view = show;
                DataEvent::FourHourViewToggled(show)
            })
        });
    }

    /// Flip the 4-hour forecast view, returning the new value
    pub fn toggle_4h_view(&self) -> bool {
        let mut show = false;
        self.update(|s| {
            s.show_4h_view = !s.show_4h_view;
            show = s.show_4h_view;
            Some(DataEvent::FourHourViewToggled(show))
        });
        show
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("state", &*self.inner.read())
            .finish()
    }
}

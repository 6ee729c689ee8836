//! Playback clock: the time-of-interest cursor
//!
//! The clock owns the only asynchronous writer of the selected time, a
//! repeating timer that advances it by one logical step per tick. Every
//! manual interaction (pause, reset, step, set-time) cancels that timer
//! first, under the same lock the tick takes, so a tick that was already
//! queued when the user paused is discarded by its stale generation.
//!
//! The time itself lives in [`AppState`]; the clock only moves it.

use crate::error::CoreError;
use crate::models::TimePoint;
use crate::state::AppState;
use chrono::Duration;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Playback status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
        }
    }
}

/// What drives the ticks while playing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickDriver {
    /// A tokio interval task on the current runtime
    #[default]
    Tokio,
    /// No task; the host calls [`PlaybackClock::tick`]
    Manual,
}

/// Clock settings
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Logical advance per tick
    pub step: Duration,
    /// Wall-clock time between ticks
    pub tick_interval: std::time::Duration,
    /// Granularity the reset anchor is floored to
    pub anchor_step: Duration,
    pub driver: TickDriver,
}

impl PlaybackConfig {
    /// Where `reset` lands when the wall clock reads `now`
    pub fn anchor_at(&self, now: TimePoint) -> TimePoint {
        now.floor_to(self.anchor_step)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step: Duration::minutes(30),
            tick_interval: std::time::Duration::from_millis(1000),
            anchor_step: Duration::minutes(30),
            driver: TickDriver::Tokio,
        }
    }
}

/// Valid range for stepping and playback; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeBounds {
    pub earliest: Option<TimePoint>,
    pub latest: Option<TimePoint>,
}

impl TimeBounds {
    pub fn new(earliest: Option<TimePoint>, latest: Option<TimePoint>) -> Self {
        Self { earliest, latest }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, time: TimePoint) -> bool {
        self.earliest.is_none_or(|e| time >= e) && self.latest.is_none_or(|l| time <= l)
    }

    /// Nearest time inside the bounds
    pub fn clamp(&self, time: TimePoint) -> TimePoint {
        match (self.earliest, self.latest) {
            (Some(e), _) if time < e => e,
            (_, Some(l)) if time > l => l,
            _ => time,
        }
    }
}

type AnchorFn = dyn Fn() -> TimePoint + Send + Sync;

struct ClockInner {
    status: PlaybackStatus,
    bounds: TimeBounds,
    /// Bumped whenever a timer is started or cancelled
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<ClockInner>,
    state: AppState,
    config: PlaybackConfig,
    anchor: Box<AnchorFn>,
}

impl Shared {
    fn set_status(&self, inner: &mut ClockInner, status: PlaybackStatus) {
        inner.status = status;
        self.state.set_playback(status);
    }

    /// Invalidate the running timer; `abort` is false when called from the
    /// timer task itself
    fn cancel_timer(&self, inner: &mut ClockInner, abort: bool) {
        inner.generation += 1;
        if let Some(handle) = inner.timer.take() {
            if abort {
                handle.abort();
            }
        }
    }

    fn pause_locked(&self, inner: &mut ClockInner, abort: bool) {
        if inner.status == PlaybackStatus::Playing {
            self.cancel_timer(inner, abort);
            self.set_status(inner, PlaybackStatus::Paused);
        }
    }

    /// Advance by one step if `generation` is still current.
    ///
    /// Returns whether playback continues.
    fn advance(&self, generation: u64, from_timer: bool) -> bool {
        let mut inner = self.inner.lock();
        if inner.status != PlaybackStatus::Playing || inner.generation != generation {
            tracing::trace!(generation, current = inner.generation, "Discarding stale tick");
            return false;
        }

        let current = self.state.selected_time();
        let next = current.checked_add(self.config.step);

        match (next, inner.bounds.latest) {
            (Some(next), Some(latest)) if next > latest => {
                self.state.set_selected_time(latest);
                self.pause_locked(&mut inner, !from_timer);
                tracing::debug!(time = %latest, "Playback reached latest bound");
                false
            }
            (Some(next), _) => {
                self.state.set_selected_time(next);
                true
            }
            (None, _) => {
                self.pause_locked(&mut inner, !from_timer);
                false
            }
        }
    }
}

/// Play/pause/reset/step/set-time cursor over the shared selected time
pub struct PlaybackClock {
    shared: Arc<Shared>,
}

impl PlaybackClock {
    pub fn new(state: AppState, config: PlaybackConfig) -> Self {
        let anchor = config.clone();
        Self::with_anchor(state, config, move || anchor.anchor_at(TimePoint::now()))
    }

    /// Use a custom anchor for `reset` (fixed clocks in tests, replays)
    pub fn with_anchor(
        state: AppState,
        config: PlaybackConfig,
        anchor: impl Fn() -> TimePoint + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(ClockInner {
                    status: PlaybackStatus::Stopped,
                    bounds: TimeBounds::unbounded(),
                    generation: 0,
                    timer: None,
                }),
                state,
                config,
                anchor: Box::new(anchor),
            }),
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.shared.inner.lock().status
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    pub fn reference_time(&self) -> TimePoint {
        self.shared.state.selected_time()
    }

    pub fn bounds(&self) -> TimeBounds {
        self.shared.inner.lock().bounds
    }

    pub fn set_bounds(&self, bounds: TimeBounds) {
        self.shared.inner.lock().bounds = bounds;
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.shared.config
    }

    /// Current timer generation
    pub fn generation(&self) -> u64 {
        self.shared.inner.lock().generation
    }

    /// Start playing. No-op when already playing.
    ///
    /// With [`TickDriver::Tokio`] this must be called from within a tokio
    /// runtime.
    pub fn play(&self) -> Result<(), CoreError> {
        let mut inner = self.shared.inner.lock();
        if inner.status == PlaybackStatus::Playing {
            return Ok(());
        }

        let runtime = match self.shared.config.driver {
            TickDriver::Tokio => {
                Some(Handle::try_current().map_err(|_| CoreError::RuntimeUnavailable)?)
            }
            TickDriver::Manual => None,
        };

        inner.generation += 1;
        if let Some(handle) = runtime {
            inner.timer = Some(self.spawn_timer(&handle, inner.generation));
        }

        self.shared.set_status(&mut inner, PlaybackStatus::Playing);
        tracing::debug!(generation = inner.generation, "Playback started");
        Ok(())
    }

    fn spawn_timer(&self, handle: &Handle, generation: u64) -> JoinHandle<()> {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let period = self.shared.config.tick_interval;

        handle.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                if !shared.advance(generation, true) {
                    break;
                }
            }
        })
    }

    pub fn pause(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.pause_locked(&mut inner, true);
    }

    /// Play if paused/stopped, pause if playing
    pub fn toggle(&self) -> Result<(), CoreError> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Cancel playback and jump back to the anchor ("now" floored)
    pub fn reset(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.cancel_timer(&mut inner, true);

        let anchor = (self.shared.anchor)();
        self.shared.state.set_time_now(anchor);
        self.shared.state.set_selected_time(anchor);
        self.shared.set_status(&mut inner, PlaybackStatus::Stopped);
        tracing::debug!(time = %anchor, "Playback reset");
    }

    /// Move one step forward (`direction > 0`) or back (`direction < 0`).
    ///
    /// Pauses first if playing. Returns false, leaving the time unchanged,
    /// when the target falls outside the bounds. From a time already outside
    /// the bounds, a step toward them lands on the nearest bound.
    pub fn step(&self, direction: i32) -> bool {
        let mut inner = self.shared.inner.lock();
        self.shared.pause_locked(&mut inner, true);

        if direction == 0 {
            return false;
        }

        let current = self.shared.state.selected_time();
        let target = if direction > 0 {
            current.checked_add(self.shared.config.step)
        } else {
            current.checked_sub(self.shared.config.step)
        };

        let next = match target {
            Some(target) if inner.bounds.contains(target) => target,
            Some(target) if !inner.bounds.contains(current) => {
                let clamped = inner.bounds.clamp(target);
                let toward = if direction > 0 {
                    clamped > current
                } else {
                    clamped < current
                };
                if !toward {
                    return false;
                }
                clamped
            }
            _ => return false,
        };

        self.shared.state.set_selected_time(next);
        true
    }

    /// Jump to `time` (e.g. a chart click). Pauses first if playing; the
    /// time is not clamped to the bounds.
    pub fn set_time(&self, time: TimePoint) {
        let mut inner = self.shared.inner.lock();
        self.shared.pause_locked(&mut inner, true);
        self.shared.state.set_selected_time(time);
    }

    /// Advance by one tick of the current generation.
    ///
    /// This is how [`TickDriver::Manual`] hosts drive playback. Returns
    /// whether playback continues.
    pub fn tick(&self) -> bool {
        let generation = self.generation();
        self.shared.advance(generation, false)
    }

    /// Advance only if `generation` is still the live one
    pub fn tick_generation(&self, generation: u64) -> bool {
        self.shared.advance(generation, false)
    }

    /// Cancel any running timer; the clock stays usable
    pub fn shutdown(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.cancel_timer(&mut inner, true);
        if inner.status == PlaybackStatus::Playing {
            self.shared.set_status(&mut inner, PlaybackStatus::Paused);
        }
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        if let Some(handle) = inner.timer.take() {
            handle.abort();
        }
        inner.generation += 1;
    }
}

impl std::fmt::Debug for PlaybackClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("PlaybackClock")
            .field("status", &inner.status)
            .field("bounds", &inner.bounds)
            .field("generation", &inner.generation)
            .finish()
    }
}

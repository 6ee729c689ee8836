//! Sun-phase spinner shown while a panel waits for data

use ratatui::{
    style::{Color, Style},
    text::Span,
};
use std::time::{Duration, Instant};

const FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];

#[derive(Debug)]
pub struct Spinner {
    frame: usize,
    last_update: Instant,
    frame_duration: Duration,
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spinner {
    pub fn new() -> Self {
        Self {
            frame: 0,
            last_update: Instant::now(),
            frame_duration: Duration::from_millis(120),
        }
    }

    /// Advance one frame if its time is up. Called once per draw.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        if now.duration_since(self.last_update) >= self.frame_duration {
            self.frame = (self.frame + 1) % FRAMES.len();
            self.last_update = now;
        }
    }

    pub fn render(&self) -> Span<'static> {
        Span::styled(FRAMES[self.frame], Style::default().fg(Color::Yellow))
    }
}

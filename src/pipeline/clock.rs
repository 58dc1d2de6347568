//! Tick timing and frame freshness
//!
//! `dt` handed to the engine is always the measured monotonic delta between
//! ticks, never the nominal interval. A gap longer than the staleness limit
//! is a stall and contributes nothing. Both types take `now` explicitly so
//! tests can drive them without sleeping.

use std::time::Duration;
use tokio::time::Instant;

use crate::types::LandmarkFrame;

/// Measures elapsed time between consecutive ticks.
#[derive(Debug, Clone, Default)]
pub struct TickClock {
    last: Option<Instant>,
}

impl TickClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time since the previous lap; zero on the first lap.
    pub fn lap(&mut self, now: Instant) -> Duration {
        let dt = self
            .last
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or(Duration::ZERO);
        self.last = Some(now);
        dt
    }

    /// Like [`lap`](Self::lap), but a gap longer than `max_gap` starts a new
    /// run: the source was stalled, so none of the gap counts.
    pub fn lap_within(&mut self, now: Instant, max_gap: Duration) -> Duration {
        let stalled = self
            .last
            .is_some_and(|prev| now.saturating_duration_since(prev) > max_gap);
        if stalled {
            self.reset();
        }
        self.lap(now)
    }

    /// Forget the previous lap.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Newest frame from the source plus its arrival time.
#[derive(Debug, Clone)]
pub struct LatestFrame {
    frame: Option<LandmarkFrame>,
    received_at: Option<Instant>,
    stale_after: Duration,
    ended: bool,
}

impl LatestFrame {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            frame: None,
            received_at: None,
            stale_after,
            ended: false,
        }
    }

    pub fn update(&mut self, frame: Option<LandmarkFrame>, now: Instant) {
        self.frame = frame;
        self.received_at = Some(now);
    }

    /// The source has stopped for good; every later read is `None`.
    pub fn mark_ended(&mut self) {
        self.ended = true;
        self.frame = None;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// The frame to classify at `now`: `None` if absent, stale, or the source ended.
    pub fn current(&self, now: Instant) -> Option<&LandmarkFrame> {
        if self.ended {
            return None;
        }
        let received_at = self.received_at?;
        if now.saturating_duration_since(received_at) > self.stale_after {
            return None;
        }
        self.frame.as_ref()
    }
}

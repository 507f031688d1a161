use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
}

/// Counts frames and ticks over a fixed wall-clock window.
#[derive(Debug)]
pub(crate) struct LoopMetricsWindow {
    started_at: Instant,
    length: Duration,
    frames: u32,
    ticks: u32,
    frame_time_total: Duration,
}

impl LoopMetricsWindow {
    pub(crate) fn starting_at(started_at: Instant, length: Duration) -> Self {
        Self {
            started_at,
            length,
            frames: 0,
            ticks: 0,
            frame_time_total: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_total = self.frame_time_total.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    /// Closes the window once it has run its length and starts the next one.
    pub(crate) fn roll(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed < self.length {
            return None;
        }
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
        };
        *self = Self::starting_at(now, self.length);
        Some(snapshot)
    }
}

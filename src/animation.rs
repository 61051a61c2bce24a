use std::time::{Duration, Instant};

use crate::smoothing::AngleFilter;

/// Raw angles written by sensor handlers, smoothed angles written by the
/// frame loop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NeedleState {
    pub raw_device_heading: f64,
    pub raw_needle_rotation: f64,
    pub smoothed_device_heading: f64,
    pub smoothed_needle_rotation: f64,
}

/// Per-frame smoothing of the device heading and the needle rotation.
///
/// The loop only produces output while running. Stopping drops both filters,
/// so a restart settles again from 0.
#[derive(Debug, Default)]
pub struct FrameLoop {
    filters: Option<(AngleFilter, AngleFilter)>,
    factor: Option<f64>,
    frames: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a smoothing factor other than the default for both signals.
    pub fn with_factor(factor: f64) -> Self {
        Self {
            factor: Some(factor),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.filters.is_some()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn start(&mut self) {
        if self.filters.is_none() {
            let filter = self.factor.map(AngleFilter::new).unwrap_or_default();
            self.filters = Some((filter, filter));
            self.frames = 0;
            log::debug!("frame loop started");
        }
    }

    pub fn stop(&mut self) {
        if self.filters.take().is_some() {
            log::debug!("frame loop stopped after {} frames", self.frames);
        }
    }

    /// Run one frame against the current raw values. Returns false and leaves
    /// the state untouched when the loop is stopped.
    pub fn tick(&mut self, needle: &mut NeedleState) -> bool {
        let Some((heading, rotation)) = self.filters.as_mut() else {
            return false;
        };
        needle.smoothed_device_heading = heading.step(needle.raw_device_heading);
        needle.smoothed_needle_rotation = rotation.step(needle.raw_needle_rotation);
        self.frames += 1;
        true
    }
}

/// Fixed-interval frame scheduler.
///
/// Deadlines advance by whole intervals; after a stall the clock skips the
/// missed frames instead of replaying them.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    interval: Duration,
    next_frame: Instant,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            interval,
            next_frame: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left until the next frame is due.
    pub fn time_until_frame(&self, now: Instant) -> Duration {
        self.next_frame.saturating_duration_since(now)
    }

    /// If a frame is due at `now`, schedule the following one and return true.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_frame {
            return false;
        }
        while self.next_frame <= now {
            self.next_frame += self.interval;
        }
        true
    }
}

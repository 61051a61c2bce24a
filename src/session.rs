//! The compass session: single owner of all mutable state.
//!
//! Sources deliver into a channel; the session drains it between frames on
//! the thread that owns it. Position events re-derive distance, bearing and
//! needle rotation, heading events re-derive the needle rotation, and the
//! frame loop damps both angles.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::animation::{FrameClock, FrameLoop, NeedleState};
use crate::compass::{Locale, format_bearing, format_distance};
use crate::config::{DESTINATION, SMOOTHING_FACTOR};
use crate::error::CompassError;
use crate::orientation::HeadingSample;
use crate::position::{BearingReading, GeoPoint};
use crate::reconciler::HeadingReconciler;
use crate::sensors::{
    EventSink, OrientationSource, PositionErrorKind, PositionOptions, PositionSource,
    SensorAdapter, SensorEvent,
};
use crate::status::{SensorStatus, StatusEvent, StatusMachine};

/// What the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderModel {
    pub smoothed_needle_rotation_deg: f64,
    pub smoothed_device_heading_deg: f64,
    pub distance_label: String,
    pub bearing_label: String,
    pub status_label: String,
    pub show_permission_prompt: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionOptions {
    pub locale: Locale,
    pub position: PositionOptions,
    pub smoothing_factor: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            position: PositionOptions::default(),
            smoothing_factor: SMOOTHING_FACTOR,
        }
    }
}

fn placeholders(locale: Locale) -> (&'static str, &'static str) {
    match locale {
        Locale::De => ("Warte auf GPS...", "Kalibriere..."),
        Locale::En => ("Waiting for GPS...", "Calibrating..."),
    }
}

pub struct CompassSession {
    adapter: SensorAdapter,
    events: Receiver<SensorEvent>,
    reconciler: HeadingReconciler,
    needle: NeedleState,
    frame_loop: FrameLoop,
    status: StatusMachine,
    locale: Locale,
    last_fix: Option<GeoPoint>,
    reading: Option<BearingReading>,
    distance_label: String,
    bearing_label: String,
}

impl CompassSession {
    /// Attach the sources and start the frame loop. Pass `None` for a sensor
    /// the platform does not have.
    pub fn mount(
        position: Option<Box<dyn PositionSource>>,
        orientation: Option<Box<dyn OrientationSource>>,
        options: SessionOptions,
    ) -> Self {
        let (sink, events) = EventSink::channel();
        let adapter =
            SensorAdapter::new(position, orientation, sink).with_options(options.position);
        let (distance, bearing) = placeholders(options.locale);

        let mut session = Self {
            adapter,
            events,
            reconciler: HeadingReconciler::new(),
            needle: NeedleState::default(),
            frame_loop: FrameLoop::with_factor(options.smoothing_factor),
            status: StatusMachine::new(),
            locale: options.locale,
            last_fix: None,
            reading: None,
            distance_label: distance.to_string(),
            bearing_label: bearing.to_string(),
        };

        for event in session.adapter.start() {
            session.status.apply(event);
        }
        session.frame_loop.start();
        session
    }

    pub fn status(&self) -> SensorStatus {
        self.status.current()
    }

    pub fn needle(&self) -> NeedleState {
        self.needle
    }

    pub fn reading(&self) -> Option<BearingReading> {
        self.reading
    }

    pub fn last_fix(&self) -> Option<GeoPoint> {
        self.last_fix
    }

    pub fn frames(&self) -> u64 {
        self.frame_loop.frames()
    }

    pub fn is_mounted(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub fn handle_event(&mut self, event: SensorEvent) {
        match event {
            SensorEvent::Position(point) => self.on_position(point),
            SensorEvent::PositionError(kind) => self.on_position_error(kind),
            SensorEvent::Heading(sample) => self.on_heading(sample),
        }
    }

    fn on_position(&mut self, point: GeoPoint) {
        let reading = BearingReading::between(point, DESTINATION);
        log::debug!(
            "fix {} -> {:.3} km @ {:.1}°",
            point,
            reading.distance_km,
            reading.target_bearing_deg
        );

        self.distance_label = format_distance(reading.distance_km);
        self.bearing_label = format_bearing(reading.target_bearing_deg, self.locale);
        self.needle.raw_needle_rotation = self
            .reconciler
            .update_target_bearing(reading.target_bearing_deg);
        self.last_fix = Some(point);
        self.reading = Some(reading);
        self.status.apply(StatusEvent::PositionFix);
    }

    /// Labels keep their last value; only the status changes.
    fn on_position_error(&mut self, kind: PositionErrorKind) {
        log::warn!("{}", CompassError::from(kind));
        self.status.apply(StatusEvent::PositionFailed(kind));
    }

    fn on_heading(&mut self, sample: HeadingSample) {
        self.needle.raw_device_heading = sample.degrees;
        self.needle.raw_needle_rotation = self.reconciler.update_device_heading(sample.degrees);
    }

    /// Handle everything that has arrived so far without blocking.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Advance the smoothing by one frame.
    pub fn tick_frame(&mut self) -> bool {
        self.frame_loop.tick(&mut self.needle)
    }

    /// The user tapped the permission prompt.
    pub fn on_permission_prompt_accepted(&mut self) {
        self.status.apply(StatusEvent::PromptAccepted);
        let outcome = self.adapter.request_orientation_permission();
        self.status.apply(outcome);
    }

    pub fn render_model(&self) -> RenderModel {
        RenderModel {
            smoothed_needle_rotation_deg: self.needle.smoothed_needle_rotation,
            smoothed_device_heading_deg: self.needle.smoothed_device_heading,
            distance_label: self.distance_label.clone(),
            bearing_label: self.bearing_label.clone(),
            status_label: self.status.current().label(self.locale).to_string(),
            show_permission_prompt: self.status.show_permission_prompt(),
        }
    }

    /// Event loop: handle sensor events as they arrive and tick one frame per
    /// `frame_interval`. After each frame `on_frame` gets the session and
    /// decides whether to keep going.
    pub fn run<F>(&mut self, frame_interval: Duration, mut on_frame: F)
    where
        F: FnMut(&mut CompassSession) -> bool,
    {
        let mut clock = FrameClock::new(frame_interval);
        loop {
            let wait = clock.time_until_frame(Instant::now());
            match self.events.recv_timeout(wait) {
                Ok(event) => self.handle_event(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(wait),
            }

            if clock.poll(Instant::now()) {
                self.drain_events();
                if !self.tick_frame() || !on_frame(self) {
                    break;
                }
            }
        }
    }

    /// Release both sensors and stop the frame loop.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.frame_loop.is_running() {
            log::info!("Unmounting compass session");
        }
        self.adapter.stop();
        self.frame_loop.stop();
    }
}

impl Drop for CompassSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

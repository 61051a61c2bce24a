//! Sensor adapter: uniform event interface over position and orientation
//! sources.
//!
//! Sources push into an [`EventSink`]. The sink is the only way data leaves a
//! source, so failures travel the same path as readings and raw orientation
//! events are normalized before anyone downstream sees them.

pub mod magnetometer;
pub mod gps;
pub mod simulated;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::GPS_TIMEOUT;
use crate::error::Result;
use crate::orientation::{self, HeadingSample, OrientationEvent};
use crate::position::GeoPoint;
use crate::status::StatusEvent;

/// Why a position could not be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

/// Acquisition settings handed to a position source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Longest wait for a fresh fix before a timeout is reported.
    pub timeout: Duration,
    /// Whether a previously acquired fix may be re-delivered.
    pub allow_cached_fix: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: GPS_TIMEOUT,
            allow_cached_fix: false,
        }
    }
}

/// Outcome of an orientation permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Everything a source can tell the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorEvent {
    Position(GeoPoint),
    PositionError(PositionErrorKind),
    Heading(HeadingSample),
}

/// Sending half of the sensor channel, handed to sources on subscribe.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: Sender<SensorEvent>,
}

impl EventSink {
    pub fn channel() -> (EventSink, Receiver<SensorEvent>) {
        let (tx, rx) = mpsc::channel();
        (EventSink { tx }, rx)
    }

    /// Each send returns false once the receiving session is gone; workers
    /// use that to wind down.
    pub fn position(&self, point: GeoPoint) -> bool {
        self.tx.send(SensorEvent::Position(point)).is_ok()
    }

    pub fn position_error(&self, kind: PositionErrorKind) -> bool {
        self.tx.send(SensorEvent::PositionError(kind)).is_ok()
    }

    /// Normalize a raw orientation event and forward it. Events without a
    /// usable heading are dropped here.
    pub fn orientation(&self, event: &OrientationEvent) -> bool {
        match orientation::normalize(event) {
            Some(sample) => self.tx.send(SensorEvent::Heading(sample)).is_ok(),
            None => true,
        }
    }
}

/// Cooperative stop flag shared between a [`Subscription`] and its worker.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    const SLICE: Duration = Duration::from_millis(10);

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Sleep for `duration` in short slices. Returns false if stopped meanwhile.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(Self::SLICE));
        }
    }
}

/// Handle for an attached source. Dropping it unsubscribes: the worker is
/// told to stop and joined.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    stop: StopSignal,
    worker: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Run `work` on a named worker thread until it returns or is stopped.
    pub fn spawn<F>(name: &str, work: F) -> Result<Self>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let stop = StopSignal::default();
        let signal = stop.clone();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || work(signal))?;
        log::debug!("{} subscribed", name);
        Ok(Self {
            name: name.to_string(),
            stop,
            worker: Some(worker),
        })
    }

    /// A subscription without a worker, for sources driven from elsewhere.
    pub fn passive(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stop: StopSignal::default(),
            worker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop signal observed by this subscription's producer.
    pub fn signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.stop();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::warn!("{} worker panicked", self.name);
        }
        log::debug!("{} unsubscribed", self.name);
    }
}

pub trait PositionSource {
    fn name(&self) -> &str;

    /// Start delivering fixes and failures to `sink`.
    fn subscribe(&mut self, sink: EventSink, options: PositionOptions) -> Result<Subscription>;
}

pub trait OrientationSource {
    fn name(&self) -> &str;

    fn is_supported(&self) -> bool;

    /// True when the platform wants a user-granted permission before any
    /// orientation data is delivered.
    fn requires_explicit_permission(&self) -> bool;

    /// Must only be called in response to a direct user action.
    fn request_permission(&mut self) -> Result<Permission>;

    fn subscribe(&mut self, sink: EventSink) -> Result<Subscription>;
}

/// Owns both sources and their subscriptions, and turns setup results into
/// status events.
pub struct SensorAdapter {
    position: Option<Box<dyn PositionSource>>,
    orientation: Option<Box<dyn OrientationSource>>,
    options: PositionOptions,
    sink: EventSink,
    position_subscription: Option<Subscription>,
    orientation_subscription: Option<Subscription>,
}

impl SensorAdapter {
    /// `None` for a source means the platform has no such sensor.
    pub fn new(
        position: Option<Box<dyn PositionSource>>,
        orientation: Option<Box<dyn OrientationSource>>,
        sink: EventSink,
    ) -> Self {
        Self {
            position,
            orientation,
            options: PositionOptions::default(),
            sink,
            position_subscription: None,
            orientation_subscription: None,
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_position_attached(&self) -> bool {
        self.position_subscription.is_some()
    }

    pub fn is_orientation_attached(&self) -> bool {
        self.orientation_subscription.is_some()
    }

    /// Attach the position watch and, unless a permission gate is in the way,
    /// the orientation listener. Returns status events in the order they
    /// happened.
    pub fn start(&mut self) -> Vec<StatusEvent> {
        let mut events = Vec::new();

        match self.position.as_mut() {
            Some(source) => {
                log::info!("Starting position source {}", source.name());
                match source.subscribe(self.sink.clone(), self.options) {
                    Ok(subscription) => self.position_subscription = Some(subscription),
                    Err(e) => {
                        log::warn!("Position source {} failed: {}", source.name(), e);
                        events.push(e.status_event().unwrap_or(StatusEvent::PositionFailed(
                            PositionErrorKind::PositionUnavailable,
                        )));
                    }
                }
            }
            None => {
                log::warn!("No position source available");
                events.push(StatusEvent::GpsMissing);
            }
        }

        let gate = self
            .orientation
            .as_ref()
            .filter(|source| source.is_supported())
            .map(|source| source.requires_explicit_permission());
        match gate {
            Some(true) => {
                log::info!("Orientation source needs permission before attaching");
                events.push(StatusEvent::PermissionRequired);
            }
            Some(false) => events.extend(self.attach_orientation()),
            None => {
                log::warn!("No orientation source available");
                events.push(StatusEvent::OrientationMissing);
            }
        }

        events
    }

    /// Ask for orientation access. Call only from a user gesture.
    pub fn request_orientation_permission(&mut self) -> StatusEvent {
        if self.is_orientation_attached() {
            return StatusEvent::PermissionGranted;
        }
        let Some(source) = self.orientation.as_mut() else {
            return StatusEvent::OrientationMissing;
        };
        if !source.is_supported() {
            return StatusEvent::OrientationMissing;
        }

        match source.request_permission() {
            Ok(Permission::Granted) => {
                log::info!("Orientation permission granted");
                self.attach_orientation()
                    .unwrap_or(StatusEvent::PermissionGranted)
            }
            Ok(Permission::Denied) => {
                log::warn!("Orientation permission denied");
                StatusEvent::PermissionDenied
            }
            Err(e) => {
                log::error!("Orientation permission request failed: {}", e);
                match e.status_event() {
                    Some(StatusEvent::PermissionDenied) => StatusEvent::PermissionDenied,
                    _ => StatusEvent::PermissionRequestFailed,
                }
            }
        }
    }

    /// Returns a status event only if attaching failed.
    fn attach_orientation(&mut self) -> Option<StatusEvent> {
        let source = self.orientation.as_mut()?;
        match source.subscribe(self.sink.clone()) {
            Ok(subscription) => {
                log::info!("Orientation source {} attached", source.name());
                self.orientation_subscription = Some(subscription);
                None
            }
            Err(e) => {
                log::warn!("Orientation source {} failed: {}", source.name(), e);
                Some(match e.status_event() {
                    Some(StatusEvent::PermissionDenied) => StatusEvent::PermissionDenied,
                    _ => StatusEvent::OrientationMissing,
                })
            }
        }
    }

    /// Release both subscriptions.
    pub fn stop(&mut self) {
        let subscriptions = [
            self.position_subscription.take(),
            self.orientation_subscription.take(),
        ];
        for subscription in subscriptions.into_iter().flatten() {
            log::info!("Releasing {}", subscription.name());
            subscription.unsubscribe();
        }
    }
}

impl Drop for SensorAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

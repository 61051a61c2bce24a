// This file is only compiled during tests

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{CompassError, Result};
use crate::orientation::OrientationEvent;
use crate::position::GeoPoint;
use crate::sensors::{
    EventSink, OrientationSource, Permission, PositionErrorKind, PositionOptions, PositionSource,
    StopSignal, Subscription,
};

#[derive(Default)]
struct Attached {
    sink: Option<EventSink>,
    signal: Option<StopSignal>,
    subscribe_count: usize,
}

impl Attached {
    fn attach(&mut self, name: &str, sink: EventSink) -> Subscription {
        let subscription = Subscription::passive(name);
        self.sink = Some(sink);
        self.signal = Some(subscription.signal());
        self.subscribe_count += 1;
        subscription
    }

    fn is_subscribed(&self) -> bool {
        self.signal.as_ref().is_some_and(|s| !s.is_stopped())
    }

    /// Deliver through the sink only while subscribed.
    fn with_sink(&self, send: impl FnOnce(&EventSink) -> bool) -> bool {
        match &self.sink {
            Some(sink) if self.is_subscribed() => send(sink),
            _ => false,
        }
    }
}

/// Position source driven by the test.
#[derive(Clone, Default)]
pub struct MockPosition {
    state: Rc<RefCell<(Attached, Option<PositionOptions>)>>,
}

impl MockPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_count(&self) -> usize {
        self.state.borrow().0.subscribe_count
    }

    pub fn last_options(&self) -> Option<PositionOptions> {
        self.state.borrow().1
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().0.is_subscribed()
    }

    pub fn push(&self, latitude: f64, longitude: f64) -> bool {
        self.state
            .borrow()
            .0
            .with_sink(|sink| sink.position(GeoPoint::new(latitude, longitude)))
    }

    pub fn fail(&self, kind: PositionErrorKind) -> bool {
        self.state
            .borrow()
            .0
            .with_sink(|sink| sink.position_error(kind))
    }
}

impl PositionSource for MockPosition {
    fn name(&self) -> &str {
        "mock-position"
    }

    fn subscribe(&mut self, sink: EventSink, options: PositionOptions) -> Result<Subscription> {
        let mut state = self.state.borrow_mut();
        state.1 = Some(options);
        Ok(state.0.attach("mock-position", sink))
    }
}

struct OrientationState {
    attached: Attached,
    supported: bool,
    gated: bool,
    permission: std::result::Result<Permission, String>,
    permission_requests: usize,
}

/// Orientation source driven by the test.
#[derive(Clone)]
pub struct MockOrientation {
    state: Rc<RefCell<OrientationState>>,
}

impl MockOrientation {
    fn with(
        supported: bool,
        gated: bool,
        permission: std::result::Result<Permission, String>,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(OrientationState {
                attached: Attached::default(),
                supported,
                gated,
                permission,
                permission_requests: 0,
            })),
        }
    }

    /// Listener attaches without asking, like most Android browsers.
    pub fn ungated() -> Self {
        Self::with(true, false, Ok(Permission::Granted))
    }

    /// Requires a permission request that resolves to `permission`.
    pub fn gated(permission: std::result::Result<Permission, String>) -> Self {
        Self::with(true, true, permission)
    }

    pub fn unsupported() -> Self {
        Self::with(false, false, Ok(Permission::Denied))
    }

    pub fn subscribe_count(&self) -> usize {
        self.state.borrow().attached.subscribe_count
    }

    pub fn permission_requests(&self) -> usize {
        self.state.borrow().permission_requests
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().attached.is_subscribed()
    }

    pub fn push(&self, event: OrientationEvent) -> bool {
        self.state
            .borrow()
            .attached
            .with_sink(|sink| sink.orientation(&event))
    }
}

impl OrientationSource for MockOrientation {
    fn name(&self) -> &str {
        "mock-orientation"
    }

    fn is_supported(&self) -> bool {
        self.state.borrow().supported
    }

    fn requires_explicit_permission(&self) -> bool {
        self.state.borrow().gated
    }

    fn request_permission(&mut self) -> Result<Permission> {
        let mut state = self.state.borrow_mut();
        state.permission_requests += 1;
        state
            .permission
            .clone()
            .map_err(CompassError::OrientationPermissionRequestFailed)
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<Subscription> {
        let mut state = self.state.borrow_mut();
        if !state.supported {
            return Err(CompassError::OrientationUnsupported);
        }
        Ok(state.attached.attach("mock-orientation", sink))
    }
}

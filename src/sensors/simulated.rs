//! Stand-in sensors for running the compass without hardware.

use std::time::Duration;

use serde::Deserialize;

use crate::config::{DESTINATION, SimulationConfig};
use crate::error::{CompassError, Result};
use crate::orientation::OrientationEvent;
use crate::position::GeoPoint;
use crate::sensors::{
    EventSink, OrientationSource, Permission, PositionErrorKind, PositionOptions, PositionSource,
    Subscription,
};

/// Which platform quirk the simulated compass imitates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingFlavor {
    /// Absolute frame with alpha (Android-style).
    #[default]
    Absolute,
    /// Relative alpha only.
    Relative,
    /// Vendor compass heading field (iOS-style).
    Vendor,
}

/// How the simulated compass answers a permission request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    /// No gate; the listener attaches right away.
    #[default]
    NotRequired,
    Grant,
    Deny,
    Fail,
}

/// Walks from a start point toward the destination at a fixed speed.
pub struct SimulatedWalk {
    start: GeoPoint,
    step_km: f64,
    interval: Duration,
    failure: Option<PositionErrorKind>,
}

impl SimulatedWalk {
    pub fn new(start: GeoPoint, step_km: f64, interval: Duration) -> Self {
        Self {
            start,
            step_km,
            interval,
            failure: None,
        }
    }

    pub fn from_config(cfg: &SimulationConfig) -> Self {
        let interval = Duration::from_millis(cfg.fix_interval_ms.max(1));
        let simulated_hours = interval.as_secs_f64() * cfg.time_scale / 3600.0;
        Self::new(
            GeoPoint::new(cfg.start_latitude, cfg.start_longitude),
            cfg.speed_kmh * simulated_hours,
            interval,
        )
    }

    /// Report `kind` instead of fixes, like a receiver that never locks.
    pub fn failing(mut self, kind: PositionErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }
}

/// Next position after walking `step_km` toward the destination.
pub fn walk_step(from: GeoPoint, step_km: f64) -> GeoPoint {
    let remaining = from.distance_to(&DESTINATION);
    if remaining <= step_km {
        DESTINATION
    } else {
        from.project(from.bearing_to(&DESTINATION), step_km)
    }
}

impl PositionSource for SimulatedWalk {
    fn name(&self) -> &str {
        "simulated-walk"
    }

    fn subscribe(&mut self, sink: EventSink, options: PositionOptions) -> Result<Subscription> {
        let mut position = self.start;
        let step_km = self.step_km;
        let failure = self.failure;
        // A source that never delivers reports once per timeout.
        let interval = match failure {
            Some(_) => options.timeout.max(Duration::from_millis(1)),
            None => self.interval,
        };

        Subscription::spawn("simulated-walk", move |stop| {
            loop {
                let delivered = match failure {
                    Some(kind) => sink.position_error(kind),
                    None => {
                        let delivered = sink.position(position);
                        position = walk_step(position, step_km);
                        delivered
                    }
                };
                if !delivered || !stop.sleep(interval) {
                    break;
                }
            }
        })
    }
}

/// Heading source that turns at a constant rate.
pub struct SimulatedCompass {
    start_heading: f64,
    rate_deg_s: f64,
    interval: Duration,
    flavor: HeadingFlavor,
    permission: PermissionPolicy,
}

impl SimulatedCompass {
    pub fn new(rate_deg_s: f64, interval: Duration, flavor: HeadingFlavor) -> Self {
        Self {
            start_heading: 0.0,
            rate_deg_s,
            interval,
            flavor,
            permission: PermissionPolicy::NotRequired,
        }
    }

    pub fn from_config(cfg: &SimulationConfig) -> Self {
        Self::new(
            cfg.heading_rate_deg_s * cfg.time_scale.max(0.0),
            Duration::from_millis(50),
            cfg.heading_flavor,
        )
        .with_permission(cfg.permission)
    }

    pub fn with_permission(mut self, permission: PermissionPolicy) -> Self {
        self.permission = permission;
        self
    }

    pub fn starting_at(mut self, heading: f64) -> Self {
        self.start_heading = heading;
        self
    }
}

/// Encode a heading the way the given platform would report it.
pub fn flavored_event(flavor: HeadingFlavor, heading: f64) -> OrientationEvent {
    let alpha = (360.0 - heading).rem_euclid(360.0);
    match flavor {
        HeadingFlavor::Absolute => OrientationEvent::absolute(alpha),
        HeadingFlavor::Relative => OrientationEvent::relative(alpha),
        HeadingFlavor::Vendor => OrientationEvent::vendor(heading.rem_euclid(360.0)),
    }
}

impl OrientationSource for SimulatedCompass {
    fn name(&self) -> &str {
        "simulated-compass"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn requires_explicit_permission(&self) -> bool {
        self.permission != PermissionPolicy::NotRequired
    }

    fn request_permission(&mut self) -> Result<Permission> {
        match self.permission {
            PermissionPolicy::NotRequired | PermissionPolicy::Grant => Ok(Permission::Granted),
            PermissionPolicy::Deny => Ok(Permission::Denied),
            PermissionPolicy::Fail => Err(CompassError::OrientationPermissionRequestFailed(
                "simulated failure".into(),
            )),
        }
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<Subscription> {
        let mut heading = self.start_heading;
        let step = self.rate_deg_s * self.interval.as_secs_f64();
        let interval = self.interval;
        let flavor = self.flavor;

        Subscription::spawn("simulated-compass", move |stop| {
            while sink.orientation(&flavored_event(flavor, heading)) && stop.sleep(interval) {
                heading = (heading + step).rem_euclid(360.0);
            }
        })
    }
}

use std::time::{Duration, Instant};

use utopia_compass::sensors::simulated::{HeadingFlavor, PermissionPolicy, SimulatedCompass};
use utopia_compass::sensors::{
    EventSink, PositionErrorKind, PositionOptions, PositionSource, Subscription,
};
use utopia_compass::{CompassSession, GeoPoint, Result, SensorStatus, SessionOptions};

/// Replays a fixed list of position results, then idles until unsubscribed.
struct ScriptedPosition {
    script: Vec<std::result::Result<GeoPoint, PositionErrorKind>>,
}

impl PositionSource for ScriptedPosition {
    fn name(&self) -> &str {
        "scripted"
    }

    fn subscribe(&mut self, sink: EventSink, _options: PositionOptions) -> Result<Subscription> {
        let script = std::mem::take(&mut self.script);
        Subscription::spawn("scripted", move |stop| {
            for step in script {
                let delivered = match step {
                    Ok(point) => sink.position(point),
                    Err(kind) => sink.position_error(kind),
                };
                if !delivered {
                    return;
                }
            }
            while stop.sleep(Duration::from_millis(10)) {}
        })
    }
}

/// Drain events until `done` holds or two seconds pass.
fn settle(session: &mut CompassSession, done: impl Fn(&CompassSession) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        session.drain_events();
        if done(session) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

fn steady_compass(heading: f64) -> SimulatedCompass {
    SimulatedCompass::new(0.0, Duration::from_millis(10), HeadingFlavor::Absolute)
        .starting_at(heading)
}

#[test]
fn needle_points_at_destination_relative_to_heading() {
    let hamburg = GeoPoint::new(53.5511, 9.9937);
    let mut session = CompassSession::mount(
        Some(Box::new(ScriptedPosition {
            script: vec![Ok(hamburg)],
        })),
        Some(Box::new(steady_compass(100.0))),
        SessionOptions::default(),
    );

    assert!(settle(&mut session, |s| {
        s.last_fix().is_some() && s.needle().raw_device_heading != 0.0
    }));

    let model = session.render_model();
    assert_eq!(model.distance_label, "43.8 km");
    assert_eq!(model.bearing_label, "141° SO");
    assert_eq!(model.status_label, "GPS aktiv");

    let needle = session.needle();
    assert!((needle.raw_device_heading - 100.0).abs() < 1e-9);
    assert!((needle.raw_needle_rotation - (140.56 - 100.0)).abs() < 0.01);

    for _ in 0..400 {
        session.tick_frame();
    }
    let model = session.render_model();
    assert!((model.smoothed_device_heading_deg - 100.0).abs() < 1e-3);
    assert!((model.smoothed_needle_rotation_deg - 40.56).abs() < 0.01);

    session.unmount();
}

#[test]
fn gps_error_after_fix_keeps_labels() {
    let mut session = CompassSession::mount(
        Some(Box::new(ScriptedPosition {
            script: vec![
                Ok(GeoPoint::new(53.25, 10.40)),
                Err(PositionErrorKind::Timeout),
            ],
        })),
        None,
        SessionOptions::default(),
    );

    assert!(settle(&mut session, |s| {
        s.status() == SensorStatus::GpsError(PositionErrorKind::Timeout)
    }));

    let model = session.render_model();
    assert_eq!(model.distance_label, "864 m");
    assert_eq!(model.bearing_label, "118° SO");
    assert_eq!(model.status_label, "GPS-Timeout");
}

#[test]
fn gated_compass_attaches_after_prompt() {
    let compass = steady_compass(45.0).with_permission(PermissionPolicy::Grant);
    let mut session = CompassSession::mount(
        Some(Box::new(ScriptedPosition { script: vec![] })),
        Some(Box::new(compass)),
        SessionOptions::default(),
    );

    assert_eq!(session.status(), SensorStatus::AwaitingOrientationPermission);
    assert!(session.render_model().show_permission_prompt);
    std::thread::sleep(Duration::from_millis(30));
    session.drain_events();
    assert_eq!(session.needle().raw_device_heading, 0.0);

    session.on_permission_prompt_accepted();
    assert_eq!(session.status(), SensorStatus::Active);
    assert!(!session.render_model().show_permission_prompt);

    assert!(settle(&mut session, |s| s.needle().raw_device_heading != 0.0));
    assert!((session.needle().raw_device_heading - 45.0).abs() < 1e-9);
    // No fix yet, so the needle only counters the heading.
    assert!((session.needle().raw_needle_rotation + 45.0).abs() < 1e-9);
}

#[test]
fn denied_compass_reports_status() {
    let compass = steady_compass(45.0).with_permission(PermissionPolicy::Deny);
    let mut session = CompassSession::mount(None, Some(Box::new(compass)), SessionOptions::default());

    session.on_permission_prompt_accepted();

    let model = session.render_model();
    assert_eq!(model.status_label, "Kompass-Zugriff verweigert");
    assert!(!model.show_permission_prompt);
}

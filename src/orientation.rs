//! Heading normalization for raw orientation events.
//!
//! Platforms disagree on what an orientation event means. Some report an
//! absolute frame (referenced to north), some only a rotation relative to
//! wherever the device was at startup, and some add a vendor field that is
//! already a compass heading. [`HEADING_RULES`] resolves this with an ordered
//! list; the first rule that produces a heading wins.

/// A raw orientation event as reported by the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrientationEvent {
    /// True when `alpha` is referenced to north rather than the startup pose.
    pub absolute: bool,
    /// Rotation about the vertical axis, degrees counter-clockwise.
    pub alpha: Option<f64>,
    /// Vendor-supplied heading, degrees clockwise from north.
    pub compass_heading: Option<f64>,
}

impl OrientationEvent {
    pub fn absolute(alpha: f64) -> Self {
        Self {
            absolute: true,
            alpha: Some(alpha),
            compass_heading: None,
        }
    }

    pub fn relative(alpha: f64) -> Self {
        Self {
            absolute: false,
            alpha: Some(alpha),
            compass_heading: None,
        }
    }

    pub fn vendor(compass_heading: f64) -> Self {
        Self {
            absolute: false,
            alpha: None,
            compass_heading: Some(compass_heading),
        }
    }
}

/// A device heading in compass convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadingSample {
    /// Degrees clockwise from north, in [0, 360).
    pub degrees: f64,
    pub is_absolute: bool,
}

/// One normalization rule; `None` means "not applicable, try the next one".
pub type HeadingRule = fn(&OrientationEvent) -> Option<HeadingSample>;

/// Rules in priority order.
pub const HEADING_RULES: [(&str, HeadingRule); 3] = [
    ("absolute-alpha", absolute_alpha),
    ("vendor-heading", vendor_heading),
    ("relative-alpha", relative_alpha),
];

/// Alpha runs counter-clockwise from device-forward; compass headings run
/// clockwise from north.
fn alpha_to_heading(alpha: f64) -> f64 {
    (360.0 - alpha).rem_euclid(360.0)
}

fn absolute_alpha(event: &OrientationEvent) -> Option<HeadingSample> {
    match (event.absolute, event.alpha) {
        (true, Some(alpha)) => Some(HeadingSample {
            degrees: alpha_to_heading(alpha),
            is_absolute: true,
        }),
        _ => None,
    }
}

fn vendor_heading(event: &OrientationEvent) -> Option<HeadingSample> {
    event.compass_heading.map(|heading| HeadingSample {
        degrees: heading.rem_euclid(360.0),
        is_absolute: true,
    })
}

fn relative_alpha(event: &OrientationEvent) -> Option<HeadingSample> {
    event.alpha.map(|alpha| HeadingSample {
        degrees: alpha_to_heading(alpha),
        is_absolute: false,
    })
}

/// Apply [`HEADING_RULES`] to an event. Events no rule understands are dropped.
pub fn normalize(event: &OrientationEvent) -> Option<HeadingSample> {
    for (name, rule) in HEADING_RULES {
        if let Some(sample) = rule(event) {
            log::trace!("heading {:.1}° via {}", sample.degrees, name);
            return Some(sample);
        }
    }
    log::debug!("dropping orientation event without usable heading: {:?}", event);
    None
}

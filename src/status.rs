//! Readiness state shown to the user.
//!
//! GPS and orientation report independently; whichever changed last decides
//! the status line. Nothing here retries: a failed permission request needs a
//! new tap, GPS recovery is left to the position source.

use crate::compass::Locale;
use crate::sensors::PositionErrorKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorStatus {
    Initializing,
    AwaitingOrientationPermission,
    PermissionDenied,
    OrientationPermissionFailed,
    GpsUnavailable,
    OrientationUnavailable,
    GpsActive,
    GpsError(PositionErrorKind),
    Active,
}

impl SensorStatus {
    pub fn label(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::De => match self {
                SensorStatus::Initializing => "Initialisiere...",
                SensorStatus::AwaitingOrientationPermission => "Tippe für Kompass-Zugriff",
                SensorStatus::PermissionDenied => "Kompass-Zugriff verweigert",
                SensorStatus::OrientationPermissionFailed => "Fehler beim Zugriff auf Kompass",
                SensorStatus::GpsUnavailable => "GPS nicht verfügbar",
                SensorStatus::OrientationUnavailable => "Kompass nicht verfügbar",
                SensorStatus::GpsActive => "GPS aktiv",
                SensorStatus::GpsError(PositionErrorKind::PermissionDenied) => {
                    "GPS-Zugriff verweigert"
                }
                SensorStatus::GpsError(PositionErrorKind::PositionUnavailable) => {
                    "Position nicht verfügbar"
                }
                SensorStatus::GpsError(PositionErrorKind::Timeout) => "GPS-Timeout",
                SensorStatus::Active => "Kompass aktiv",
            },
            Locale::En => match self {
                SensorStatus::Initializing => "Initializing...",
                SensorStatus::AwaitingOrientationPermission => "Tap to enable compass",
                SensorStatus::PermissionDenied => "Compass access denied",
                SensorStatus::OrientationPermissionFailed => "Could not access compass",
                SensorStatus::GpsUnavailable => "GPS not available",
                SensorStatus::OrientationUnavailable => "Compass not available",
                SensorStatus::GpsActive => "GPS active",
                SensorStatus::GpsError(PositionErrorKind::PermissionDenied) => {
                    "GPS access denied"
                }
                SensorStatus::GpsError(PositionErrorKind::PositionUnavailable) => {
                    "Position unavailable"
                }
                SensorStatus::GpsError(PositionErrorKind::Timeout) => "GPS timeout",
                SensorStatus::Active => "Compass active",
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SensorStatus::PermissionDenied
                | SensorStatus::OrientationPermissionFailed
                | SensorStatus::GpsUnavailable
                | SensorStatus::OrientationUnavailable
                | SensorStatus::GpsError(_)
        )
    }
}

/// Inputs to the status machine, raised by the sensor adapter and the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusEvent {
    PositionFix,
    PositionFailed(PositionErrorKind),
    GpsMissing,
    OrientationMissing,
    PermissionRequired,
    PromptAccepted,
    PermissionGranted,
    PermissionDenied,
    PermissionRequestFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusMachine {
    current: SensorStatus,
    show_permission_prompt: bool,
}

impl Default for StatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMachine {
    pub fn new() -> Self {
        Self {
            current: SensorStatus::Initializing,
            show_permission_prompt: false,
        }
    }

    pub fn current(&self) -> SensorStatus {
        self.current
    }

    pub fn show_permission_prompt(&self) -> bool {
        self.show_permission_prompt
    }

    /// Apply an event and return the resulting status.
    pub fn apply(&mut self, event: StatusEvent) -> SensorStatus {
        let next = match event {
            StatusEvent::PositionFix => Some(SensorStatus::GpsActive),
            StatusEvent::PositionFailed(kind) => Some(SensorStatus::GpsError(kind)),
            StatusEvent::GpsMissing => Some(SensorStatus::GpsUnavailable),
            StatusEvent::OrientationMissing => Some(SensorStatus::OrientationUnavailable),
            StatusEvent::PermissionRequired => {
                self.show_permission_prompt = true;
                Some(SensorStatus::AwaitingOrientationPermission)
            }
            StatusEvent::PromptAccepted => {
                self.show_permission_prompt = false;
                None
            }
            StatusEvent::PermissionGranted => Some(SensorStatus::Active),
            StatusEvent::PermissionDenied => Some(SensorStatus::PermissionDenied),
            StatusEvent::PermissionRequestFailed => Some(SensorStatus::OrientationPermissionFailed),
        };

        if let Some(next) = next
            && next != self.current
        {
            if next.is_error() {
                log::warn!("status: {:?} -> {:?}", self.current, next);
            } else {
                log::info!("status: {:?} -> {:?}", self.current, next);
            }
            self.current = next;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_initializing_without_prompt() {
        let machine = StatusMachine::new();
        assert_eq!(machine.current(), SensorStatus::Initializing);
        assert!(!machine.show_permission_prompt());
    }

    #[test]
    fn test_most_recent_event_wins() {
        let mut machine = StatusMachine::new();

        machine.apply(StatusEvent::PermissionRequired);
        assert_eq!(machine.current(), SensorStatus::AwaitingOrientationPermission);

        // A GPS fix does not wait for the compass.
        machine.apply(StatusEvent::PositionFix);
        assert_eq!(machine.current(), SensorStatus::GpsActive);

        machine.apply(StatusEvent::PositionFailed(PositionErrorKind::Timeout));
        assert_eq!(
            machine.current(),
            SensorStatus::GpsError(PositionErrorKind::Timeout)
        );

        machine.apply(StatusEvent::PositionFix);
        assert_eq!(machine.current(), SensorStatus::GpsActive);
    }

    #[test]
    fn test_prompt_visibility() {
        let mut machine = StatusMachine::new();

        machine.apply(StatusEvent::PermissionRequired);
        assert!(machine.show_permission_prompt());

        // Accepting hides the prompt but leaves the status alone until the
        // request resolves.
        let status = machine.apply(StatusEvent::PromptAccepted);
        assert!(!machine.show_permission_prompt());
        assert_eq!(status, SensorStatus::AwaitingOrientationPermission);

        assert_eq!(
            machine.apply(StatusEvent::PermissionDenied),
            SensorStatus::PermissionDenied
        );
        assert!(!machine.show_permission_prompt());
    }

    #[test]
    fn test_permission_outcomes() {
        let mut machine = StatusMachine::new();
        assert_eq!(
            machine.apply(StatusEvent::PermissionGranted),
            SensorStatus::Active
        );
        assert_eq!(
            machine.apply(StatusEvent::PermissionRequestFailed),
            SensorStatus::OrientationPermissionFailed
        );
    }

    #[test]
    fn test_missing_sensors() {
        let mut machine = StatusMachine::new();
        assert_eq!(
            machine.apply(StatusEvent::GpsMissing),
            SensorStatus::GpsUnavailable
        );
        assert_eq!(
            machine.apply(StatusEvent::OrientationMissing),
            SensorStatus::OrientationUnavailable
        );
    }

    #[test]
    fn test_german_labels() {
        assert_eq!(SensorStatus::GpsActive.label(Locale::De), "GPS aktiv");
        assert_eq!(
            SensorStatus::GpsError(PositionErrorKind::PermissionDenied).label(Locale::De),
            "GPS-Zugriff verweigert"
        );
        assert_eq!(
            SensorStatus::GpsError(PositionErrorKind::Timeout).label(Locale::De),
            "GPS-Timeout"
        );
        assert_eq!(
            SensorStatus::AwaitingOrientationPermission.label(Locale::De),
            "Tippe für Kompass-Zugriff"
        );
    }

    #[test]
    fn test_english_labels() {
        assert_eq!(SensorStatus::Active.label(Locale::En), "Compass active");
        assert_eq!(
            SensorStatus::GpsError(PositionErrorKind::PositionUnavailable).label(Locale::En),
            "Position unavailable"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(SensorStatus::GpsUnavailable.is_error());
        assert!(SensorStatus::GpsError(PositionErrorKind::Timeout).is_error());
        assert!(!SensorStatus::GpsActive.is_error());
        assert!(!SensorStatus::AwaitingOrientationPermission.is_error());
    }
}

//! Error types for the compass

use crate::sensors::PositionErrorKind;
use crate::status::StatusEvent;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompassError>;

/// Everything that can go wrong between the sensors and the needle.
///
/// The first six variants are the user-facing taxonomy; each of them maps to a
/// [`StatusEvent`]. The rest are infrastructure failures raised while
/// setting up hardware or reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum CompassError {
    #[error("Position access denied")]
    PositionPermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Position acquisition timed out")]
    PositionTimeout,

    #[error("Orientation sensor not supported")]
    OrientationUnsupported,

    #[error("Orientation access denied")]
    OrientationPermissionDenied,

    #[error("Orientation permission request failed: {0}")]
    OrientationPermissionRequestFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I2C bus error
    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    /// Sensor hardware answered, but not the way we expected
    #[error("Device error: {0}")]
    Device(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] basic_toml::Error),
}

impl From<PositionErrorKind> for CompassError {
    fn from(kind: PositionErrorKind) -> Self {
        match kind {
            PositionErrorKind::PermissionDenied => CompassError::PositionPermissionDenied,
            PositionErrorKind::PositionUnavailable => CompassError::PositionUnavailable,
            PositionErrorKind::Timeout => CompassError::PositionTimeout,
        }
    }
}

impl CompassError {
    /// Status event raised for this error, if it is part of the user-facing
    /// taxonomy.
    pub fn status_event(&self) -> Option<StatusEvent> {
        match self {
            CompassError::PositionPermissionDenied => Some(StatusEvent::PositionFailed(
                PositionErrorKind::PermissionDenied,
            )),
            CompassError::PositionUnavailable => Some(StatusEvent::PositionFailed(
                PositionErrorKind::PositionUnavailable,
            )),
            CompassError::PositionTimeout => {
                Some(StatusEvent::PositionFailed(PositionErrorKind::Timeout))
            }
            CompassError::OrientationUnsupported => Some(StatusEvent::OrientationMissing),
            CompassError::OrientationPermissionDenied => Some(StatusEvent::PermissionDenied),
            CompassError::OrientationPermissionRequestFailed(_) => {
                Some(StatusEvent::PermissionRequestFailed)
            }
            CompassError::Io(_)
            | CompassError::I2c(_)
            | CompassError::Device(_)
            | CompassError::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_errors_map_to_gps_failure() {
        for kind in [
            PositionErrorKind::PermissionDenied,
            PositionErrorKind::PositionUnavailable,
            PositionErrorKind::Timeout,
        ] {
            let err = CompassError::from(kind);
            assert_eq!(err.status_event(), Some(StatusEvent::PositionFailed(kind)));
        }
    }

    #[test]
    fn test_orientation_errors_map_to_status() {
        assert_eq!(
            CompassError::OrientationUnsupported.status_event(),
            Some(StatusEvent::OrientationMissing)
        );
        assert_eq!(
            CompassError::OrientationPermissionDenied.status_event(),
            Some(StatusEvent::PermissionDenied)
        );
        assert_eq!(
            CompassError::OrientationPermissionRequestFailed("boom".into()).status_event(),
            Some(StatusEvent::PermissionRequestFailed)
        );
    }

    #[test]
    fn test_infrastructure_errors_have_no_status() {
        let err = CompassError::Device("Wrong device ID".into());
        assert_eq!(err.status_event(), None);
        assert_eq!(err.to_string(), "Device error: Wrong device ID");
    }
}

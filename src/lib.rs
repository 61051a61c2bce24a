pub mod animation;
pub mod compass;
pub mod config;
pub mod error;
pub mod orientation;
pub mod position;
pub mod reconciler;
pub mod sensors;
pub mod session;
pub mod smoothing;
pub mod status;

// Re-export commonly used types
pub use compass::{Locale, compass_label, format_bearing, format_distance};
pub use config::{Config, DESTINATION};
pub use error::{CompassError, Result};
pub use position::{BearingReading, GeoPoint};
pub use session::{CompassSession, RenderModel, SessionOptions};
pub use status::SensorStatus;

#[cfg(test)]
pub(crate) mod mocks;

use std::fs;
use std::time::Duration;

use serde::Deserialize;

use crate::compass::Locale;
use crate::error::Result;
use crate::position::GeoPoint;
use crate::sensors::simulated::{HeadingFlavor, PermissionPolicy};

// ** DESTINATION ** //

/// Utopia, Katzenstraße 1A, Lüneburg. Not configurable at runtime.
pub const DESTINATION: GeoPoint = GeoPoint::new(53.2464, 10.4115);

// ** NEEDLE CONFIGURATION ** //

/// Per-frame interpolation weight. Lower = smoother/slower, higher = snappier.
pub const SMOOTHING_FACTOR: f64 = 0.12;
/// Roughly one display refresh at 60 Hz.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

// ** GPS CONFIGURATION ** //

pub const GPS_DEVICE: &str = "/dev/serial0";
/// Maximum time to wait for a fresh fix before reporting a timeout.
pub const GPS_TIMEOUT: Duration = Duration::from_millis(5000);
/// Fixes with a worse horizontal dilution of precision are rejected in
/// high-accuracy mode.
pub const MAX_HDOP: f32 = 5.0;

// ** MAGNETOMETER CONFIGURATION ** //

pub const LIS3MDL_ADDR: u16 = 0x1C;
// Hard iron correction: rotate board 360° and record min/max X,Y values
pub const X_OFFSET: f64 = -2776.0; // (X_min + X_max) / 2
pub const Y_OFFSET: f64 = 2556.0; // (Y_min + Y_max) / 2
pub const HEADING_OFFSET: f64 = 88.0; // Overall heading correction for this location
pub const MAGNETOMETER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Config files tried in order when no path is given on the command line.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["utopia-compass.toml", "/etc/utopia-compass.toml"];

/// Runtime settings read from TOML. Every section falls back to the
/// constants above.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub magnetometer: MagnetometerConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    /// Serial device delivering NMEA sentences
    pub device: String,
    pub high_accuracy: bool,
    pub timeout_ms: u64,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            device: GPS_DEVICE.to_string(),
            high_accuracy: true,
            timeout_ms: GPS_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MagnetometerConfig {
    pub x_offset: f64,
    pub y_offset: f64,
    pub heading_offset: f64,
    pub poll_interval_ms: u64,
}

impl Default for MagnetometerConfig {
    fn default() -> Self {
        Self {
            x_offset: X_OFFSET,
            y_offset: Y_OFFSET,
            heading_offset: HEADING_OFFSET,
            poll_interval_ms: MAGNETOMETER_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub frame_interval_ms: u64,
    /// Redraw the terminal readout every N frames
    pub render_every: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: FRAME_INTERVAL.as_millis() as u64,
            render_every: 6,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub start_latitude: f64,
    pub start_longitude: f64,
    /// Walking speed toward the destination
    pub speed_kmh: f64,
    /// Simulated seconds per real second
    pub time_scale: f64,
    pub fix_interval_ms: u64,
    pub heading_rate_deg_s: f64,
    pub heading_flavor: HeadingFlavor,
    pub permission: PermissionPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            // Lüneburg station
            start_latitude: 53.2494,
            start_longitude: 10.4200,
            speed_kmh: 5.0,
            time_scale: 20.0,
            fix_interval_ms: 1000,
            heading_rate_deg_s: 15.0,
            heading_flavor: HeadingFlavor::Absolute,
            permission: PermissionPolicy::NotRequired,
        }
    }
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(basic_toml::from_str(contents)?)
    }

    pub fn gps_timeout(&self) -> Duration {
        Duration::from_millis(self.gps.timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.display.frame_interval_ms.max(1))
    }

    pub fn simulation_start(&self) -> GeoPoint {
        GeoPoint::new(
            self.simulation.start_latitude,
            self.simulation.start_longitude,
        )
    }
}

/// Load configuration from `path`, or from the first default path that parses.
/// Unreadable or malformed files are logged and replaced by defaults.
pub fn load_config(path: Option<&str>) -> Config {
    match path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match Config::from_toml(&contents) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    log::warn!("Failed to parse config {}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config {}: {}", path, e);
                Config::default()
            }
        },
        None => {
            for path in DEFAULT_CONFIG_PATHS {
                if let Ok(contents) = fs::read_to_string(path)
                    && let Ok(cfg) = Config::from_toml(&contents)
                {
                    log::info!("Loaded config from {}", path);
                    return cfg;
                }
            }
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let cfg = Config::default();

        assert_eq!(cfg.locale, Locale::De);
        assert_eq!(cfg.gps.device, "/dev/serial0");
        assert!(cfg.gps.high_accuracy);
        assert_eq!(cfg.gps_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.magnetometer.heading_offset, HEADING_OFFSET);
        assert_eq!(cfg.frame_interval(), FRAME_INTERVAL);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<()> {
        let cfg = Config::from_toml(
            r#"
            locale = "en"

            [magnetometer]
            x_offset = -1200.0

            [simulation]
            heading_flavor = "vendor"
            permission = "deny"
            "#,
        )?;

        assert_eq!(cfg.locale, Locale::En);
        assert_eq!(cfg.magnetometer.x_offset, -1200.0);
        assert_eq!(cfg.magnetometer.y_offset, Y_OFFSET);
        assert_eq!(cfg.simulation.heading_flavor, HeadingFlavor::Vendor);
        assert_eq!(cfg.simulation.permission, PermissionPolicy::Deny);
        assert_eq!(cfg.gps.timeout_ms, 5000);
        Ok(())
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(Config::from_toml("locale = [").is_err());
        assert!(Config::from_toml(r#"locale = "fr""#).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = load_config(Some("/nonexistent/utopia-compass.toml"));
        assert_eq!(cfg.gps.device, GPS_DEVICE);
    }

    #[test]
    fn test_frame_interval_never_zero() -> Result<()> {
        let cfg = Config::from_toml("[display]\nframe_interval_ms = 0")?;
        assert_eq!(cfg.frame_interval(), Duration::from_millis(1));
        Ok(())
    }
}

use std::time::Duration;

use rppal::i2c::I2c;

use crate::config::{LIS3MDL_ADDR, MagnetometerConfig};
use crate::error::{CompassError, Result};
use crate::orientation::OrientationEvent;
use crate::sensors::{EventSink, OrientationSource, Permission, Subscription};

// LIS3MDL Register addresses
const WHO_AM_I: u8 = 0x0F;
const CTRL_REG1: u8 = 0x20;
const CTRL_REG2: u8 = 0x21;
const CTRL_REG3: u8 = 0x22;
const CTRL_REG4: u8 = 0x23;
const CTRL_REG5: u8 = 0x24;
const STATUS_REG: u8 = 0x27;
const OUT_X_L: u8 = 0x28;

const LIS3MDL_ID: u8 = 0x3D;
/// STATUS_REG: new X, Y and Z data available
const ZYXDA: u8 = 0x08;

/// Hard iron offsets plus a final heading correction for the mounting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub x_offset: f64,
    pub y_offset: f64,
    pub heading_offset: f64,
}

impl From<&MagnetometerConfig> for Calibration {
    fn from(cfg: &MagnetometerConfig) -> Self {
        Self {
            x_offset: cfg.x_offset,
            y_offset: cfg.y_offset,
            heading_offset: cfg.heading_offset,
        }
    }
}

impl Calibration {
    /// Heading in [0, 360) from raw X/Y field strength.
    pub fn heading(&self, x_raw: f64, y_raw: f64) -> f64 {
        // Apply hard iron calibration (center the readings)
        let x = x_raw - self.x_offset;
        let y = y_raw - self.y_offset;

        let raw_heading = y.atan2(x).to_degrees();

        (raw_heading + self.heading_offset).rem_euclid(360.0)
    }
}

/// LIS3MDL 3-axis magnetometer on the Raspberry Pi I2C bus.
pub struct Magnetometer {
    i2c: I2c,
    calibration: Calibration,
}

impl Magnetometer {
    pub fn open(calibration: Calibration) -> Result<Self> {
        let mut i2c = I2c::new()?;
        i2c.set_slave_address(LIS3MDL_ADDR)?;

        let who_am_i = i2c.smbus_read_byte(WHO_AM_I)?;
        if who_am_i != LIS3MDL_ID {
            return Err(CompassError::Device(format!(
                "Wrong device ID: 0x{:02X}, expected 0x{:02X}",
                who_am_i, LIS3MDL_ID
            )));
        }

        // CTRL_REG1: Temperature enabled, Ultra-high performance mode (X,Y), ODR = 80 Hz
        i2c.smbus_write_byte(CTRL_REG1, 0xFC)?;
        // CTRL_REG2: Full scale ±4 gauss
        i2c.smbus_write_byte(CTRL_REG2, 0x00)?;
        // CTRL_REG3: Continuous conversion mode
        i2c.smbus_write_byte(CTRL_REG3, 0x00)?;
        // CTRL_REG4: Ultra-high performance mode (Z-axis), little endian
        i2c.smbus_write_byte(CTRL_REG4, 0x0C)?;
        // CTRL_REG5: Block data update enabled
        i2c.smbus_write_byte(CTRL_REG5, 0x40)?;

        std::thread::sleep(Duration::from_millis(100));

        let status = i2c.smbus_read_byte(STATUS_REG)?;
        if status == 0 {
            return Err(CompassError::Device(
                "Magnetometer hardware not responding (no data ready)".into(),
            ));
        }

        log::info!("Compass (LIS3MDL) initialized");
        Ok(Self { i2c, calibration })
    }

    /// Raw X and Y field readings, or `None` if no new sample is ready yet.
    pub fn read_raw(&mut self) -> Result<Option<(f64, f64)>> {
        let status = self.i2c.smbus_read_byte(STATUS_REG)?;
        if status & ZYXDA == 0 {
            return Ok(None);
        }

        let mut data = [0u8; 4];
        for (i, item) in data.iter_mut().enumerate() {
            *item = self.i2c.smbus_read_byte(OUT_X_L + i as u8)?;
        }

        let x = i16::from_le_bytes([data[0], data[1]]) as f64;
        let y = i16::from_le_bytes([data[2], data[3]]) as f64;
        Ok(Some((x, y)))
    }

    /// Calibrated heading, clockwise from north.
    pub fn read_heading(&mut self) -> Result<Option<f64>> {
        Ok(self
            .read_raw()?
            .map(|(x, y)| self.calibration.heading(x, y)))
    }
}

/// The magnetometer as an absolute orientation source. It has no permission
/// gate.
pub struct MagnetometerSource {
    device: Option<Magnetometer>,
    poll_interval: Duration,
}

impl MagnetometerSource {
    /// Probe the bus. A missing or silent sensor yields an unsupported source.
    pub fn probe(config: &MagnetometerConfig) -> Self {
        let device = match Magnetometer::open(Calibration::from(config)) {
            Ok(device) => Some(device),
            Err(e) => {
                log::warn!("Magnetometer unavailable: {}", e);
                None
            }
        };
        Self {
            device,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

/// Expresses a compass heading as the platform-style event: alpha runs the
/// other way round, and the frame is absolute.
pub fn heading_event(heading: f64) -> OrientationEvent {
    OrientationEvent::absolute((360.0 - heading).rem_euclid(360.0))
}

impl OrientationSource for MagnetometerSource {
    fn name(&self) -> &str {
        "lis3mdl"
    }

    fn is_supported(&self) -> bool {
        self.device.is_some()
    }

    fn requires_explicit_permission(&self) -> bool {
        false
    }

    fn request_permission(&mut self) -> Result<Permission> {
        Ok(Permission::Granted)
    }

    fn subscribe(&mut self, sink: EventSink) -> Result<Subscription> {
        let mut device = self.device.take().ok_or(CompassError::OrientationUnsupported)?;
        let poll_interval = self.poll_interval;

        Subscription::spawn("lis3mdl", move |stop| {
            while stop.sleep(poll_interval) {
                match device.read_heading() {
                    Ok(Some(heading)) => {
                        if !sink.orientation(&heading_event(heading)) {
                            break;
                        }
                    }
                    Ok(None) => log::trace!("Magnetometer data not ready"),
                    Err(e) => log::warn!("Magnetometer read failed: {}", e),
                }
            }
        })
    }
}

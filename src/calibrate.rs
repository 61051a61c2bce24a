use std::thread;
use std::time::Duration;

use utopia_compass::config::MagnetometerConfig;
use utopia_compass::sensors::magnetometer::{Calibration, Magnetometer};

/// Running min/max of the horizontal field. The hard iron offset is the
/// centre of the circle the readings trace while the board turns.
#[derive(Debug)]
struct FieldRange {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    samples: u64,
}

impl FieldRange {
    fn new() -> Self {
        Self {
            x_min: f64::MAX,
            x_max: f64::MIN,
            y_min: f64::MAX,
            y_max: f64::MIN,
            samples: 0,
        }
    }

    fn add(&mut self, x: f64, y: f64) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
        self.samples += 1;
    }

    fn offsets(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Magnetometer calibration");
    println!("1. Keep the board LEVEL");
    println!("2. Slowly rotate it through a full 360° circle, at least 30 seconds");
    println!("3. Press Ctrl+C when done, then copy the offsets into the");
    println!("   [magnetometer] section of utopia-compass.toml\n");

    thread::sleep(Duration::from_secs(5));

    let mut magnetometer = Magnetometer::open(Calibration::from(&MagnetometerConfig::default()))?;
    let mut range = FieldRange::new();

    println!(
        "{:^8} | {:^20} | {:^20} | {:^20}",
        "Sample", "X Range", "Y Range", "Offsets"
    );
    println!("{:-<8}-+-{:-<20}-+-{:-<20}-+-{:-<20}", "", "", "", "");

    loop {
        match magnetometer.read_raw() {
            Ok(Some((x, y))) => {
                range.add(x, y);
                if range.samples % 10 == 0 {
                    let (x_offset, y_offset) = range.offsets();
                    println!(
                        "{:^8} | {:>7.0} to {:>7.0} | {:>7.0} to {:>7.0} | X: {:>7.0}  Y: {:>7.0}",
                        range.samples,
                        range.x_min,
                        range.x_max,
                        range.y_min,
                        range.y_max,
                        x_offset,
                        y_offset
                    );
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Read failed: {}", e),
        }

        thread::sleep(Duration::from_millis(100));
    }
}

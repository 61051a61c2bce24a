/// Combines the bearing to the destination with the device heading.
///
/// The result is how far the needle has to turn from the device's forward
/// axis to point at the destination. It is recomputed as soon as either input
/// changes and is left unnormalized; the smoother handles the wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeadingReconciler {
    target_bearing: f64,
    device_heading: f64,
}

impl HeadingReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_bearing(&self) -> f64 {
        self.target_bearing
    }

    pub fn device_heading(&self) -> f64 {
        self.device_heading
    }

    pub fn needle_rotation(&self) -> f64 {
        self.target_bearing - self.device_heading
    }

    /// Record a new target bearing and return the updated needle rotation.
    pub fn update_target_bearing(&mut self, degrees: f64) -> f64 {
        self.target_bearing = degrees;
        self.needle_rotation()
    }

    /// Record a new device heading and return the updated needle rotation.
    pub fn update_device_heading(&mut self, degrees: f64) -> f64 {
        self.device_heading = degrees;
        self.needle_rotation()
    }
}

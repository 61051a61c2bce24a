use crate::config::SMOOTHING_FACTOR;

/// Signed shortest rotation from `current` to `target`, in (-180, 180].
///
/// Going from 350° to 10° is +20°, never -340°.
pub fn shortest_delta(current: f64, target: f64) -> f64 {
    180.0 - (current - target + 540.0).rem_euclid(360.0)
}

/// Exponential tracking filter for a single angle.
///
/// Each step closes `factor` of the remaining shortest-path gap. The output is
/// kept in [0, 360).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngleFilter {
    current: f64,
    factor: f64,
}

impl Default for AngleFilter {
    fn default() -> Self {
        Self::new(SMOOTHING_FACTOR)
    }
}

impl AngleFilter {
    pub fn new(factor: f64) -> Self {
        Self {
            current: 0.0,
            factor: factor.clamp(0.0, 1.0),
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Advance one frame toward `target` and return the new value.
    pub fn step(&mut self, target: f64) -> f64 {
        let delta = shortest_delta(self.current, target);
        self.current = (self.current + delta * self.factor).rem_euclid(360.0);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_delta_wraps_through_north() {
        assert_close(shortest_delta(350.0, 10.0), 20.0);
        assert_close(shortest_delta(10.0, 350.0), -20.0);
    }

    #[test]
    fn test_delta_range() {
        assert_close(shortest_delta(0.0, 180.0), 180.0);
        assert_close(shortest_delta(180.0, 0.0), 180.0);
        assert_close(shortest_delta(0.0, 0.0), 0.0);
        assert_close(shortest_delta(90.0, 45.0), -45.0);
    }

    #[test]
    fn test_delta_accepts_unnormalized_targets() {
        // Raw needle rotations are never normalized.
        assert_close(shortest_delta(10.0, -340.0), 10.0);
        assert_close(shortest_delta(300.0, -700.0), 80.0);
        assert_close(shortest_delta(0.0, 725.0), 5.0);
    }

    #[test]
    fn test_filter_starts_at_zero() {
        let filter = AngleFilter::default();
        assert_eq!(filter.current(), 0.0);
        assert_eq!(filter.factor(), SMOOTHING_FACTOR);
    }

    #[test]
    fn test_step_moves_a_fraction_of_the_gap() {
        let mut filter = AngleFilter::default();
        assert_close(filter.step(100.0), 12.0);
        assert_close(filter.step(100.0), 12.0 + 88.0 * 0.12);
    }

    #[test]
    fn test_step_across_the_seam() {
        let mut filter = AngleFilter::default();
        // Target just west of north: go backwards through 0.
        assert_close(filter.step(350.0), 358.8);
        assert_close(filter.step(350.0), 358.8 - 8.8 * 0.12);
    }

    #[test]
    fn test_converges_on_target() {
        let mut filter = AngleFilter::default();
        for _ in 0..200 {
            filter.step(275.0);
        }
        assert!((filter.current() - 275.0).abs() < 1e-6);
    }

    #[test]
    fn test_factor_is_clamped() {
        let mut snappy = AngleFilter::new(3.0);
        assert_close(snappy.step(40.0), 40.0);
        assert_eq!(AngleFilter::new(-1.0).factor(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut filter = AngleFilter::default();
        filter.step(90.0);
        filter.reset();
        assert_eq!(filter.current(), 0.0);
    }
}

//! Zoom state for the viewer
//!
//! Stepped zoom with clamped bounds. Scale changes never move annotation
//! geometry: annotations live in document space and are projected at
//! display time.

/// Zoom factor state
#[derive(Clone, Copy, Debug)]
pub struct Zoom {
    factor: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl Zoom {
    /// Zoom step per increment
    pub const STEP: f32 = 0.2;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.5;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 3.0;

    #[must_use]
    pub fn new(factor: f32) -> Self {
        Self {
            factor: Self::clamp_factor(factor),
        }
    }

    /// Returns the current zoom factor
    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Zoom in by one step, returning whether the factor changed
    pub fn step_in(&mut self) -> bool {
        self.set(self.factor + Self::STEP)
    }

    /// Zoom out by one step, returning whether the factor changed
    pub fn step_out(&mut self) -> bool {
        self.set(self.factor - Self::STEP)
    }

    /// Set the factor, clamped; returns whether it changed
    pub fn set(&mut self, factor: f32) -> bool {
        let clamped = Self::clamp_factor(factor);
        if (self.factor - clamped).abs() > f32::EPSILON {
            self.factor = clamped;
            true
        } else {
            false
        }
    }

    /// Clamp factor to valid range, handling NaN/Inf
    #[must_use]
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_in_and_out() {
        let mut zoom = Zoom::default();
        assert!(zoom.step_in());
        assert!((zoom.factor() - 1.2).abs() < 1e-6);
        assert!(zoom.step_out());
        assert!((zoom.factor() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn clamps_at_bounds() {
        let mut zoom = Zoom::new(3.0);
        assert!(!zoom.step_in());
        assert_eq!(zoom.factor(), Zoom::MAX_SCALE);

        let mut zoom = Zoom::new(0.5);
        assert!(!zoom.step_out());
        assert_eq!(zoom.factor(), Zoom::MIN_SCALE);
    }

    #[test]
    fn non_finite_factor_resets_to_one() {
        assert_eq!(Zoom::clamp_factor(f32::NAN), 1.0);
        assert_eq!(Zoom::clamp_factor(f32::INFINITY), 1.0);
    }
}

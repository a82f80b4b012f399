//! Sampling probability control
//!
//! The provider applies sampling at the source, so a probability only takes
//! effect through a fresh subscription. `Sampling` separates the value the
//! user is dragging (`pending`) from the value in effect (`committed`); only
//! `commit` can change what the provider sees.

/// Committed and pending sampling probability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    /// In effect on the live subscription
    committed: f64,
    /// Being adjusted by the user, not yet applied
    pending: f64,
}

impl Sampling {
    /// Create with both facets at `initial` (clamped; NaN falls back to 1.0)
    pub fn new(initial: f64) -> Self {
        let value = clamp_probability(initial).unwrap_or(1.0);
        Self {
            committed: value,
            pending: value,
        }
    }

    /// Probability in effect
    #[inline]
    pub fn committed(&self) -> f64 {
        self.committed
    }

    /// Probability being adjusted
    #[inline]
    pub fn pending(&self) -> f64 {
        self.pending
    }

    /// True while the pending value differs from the committed one
    pub fn is_adjusting(&self) -> bool {
        differs(self.pending, self.committed)
    }

    /// Update the in-drag value
    ///
    /// Returns the clamped value that was stored, or `None` for NaN input
    /// (the pending value is left unchanged).
    pub fn set_pending(&mut self, value: f64) -> Option<f64> {
        let value = clamp_probability(value)?;
        self.pending = value;
        Some(value)
    }

    /// Apply the pending value
    ///
    /// Returns the new committed probability if it changed.
    pub fn commit(&mut self) -> Option<f64> {
        if !differs(self.pending, self.committed) {
            self.pending = self.committed;
            return None;
        }
        self.committed = self.pending;
        Some(self.committed)
    }
}

impl Default for Sampling {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Clamp a probability into [0, 1]; NaN is rejected
pub fn clamp_probability(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 1.0))
    }
}

/// Probability as a whole percentage, for display
pub fn as_percent(value: f64) -> u32 {
    (value * 100.0).round() as u32
}

#[inline]
fn differs(a: f64, b: f64) -> bool {
    (a - b).abs() > f64::EPSILON
}

#[cfg(test)]
#[path = "sampling_test.rs"]
mod tests;

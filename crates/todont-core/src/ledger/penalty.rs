//! Completion penalty policy.
//!
//! Marking a task done forfeits a fraction of its accrued points. Earlier
//! product iterations used 30% and 50%, so the fraction is configuration.

use serde::{Deserialize, Serialize};

/// Fraction of accrued points forfeited on completion.
///
/// Kept as parts-per-thousand so the split is exact integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyPolicy {
    per_mille: u16,
}

impl PenaltyPolicy {
    /// 30% forfeited.
    pub const LENIENT: Self = Self { per_mille: 300 };
    /// 50% forfeited.
    pub const STRICT: Self = Self { per_mille: 500 };

    /// Build from a fraction in `[0, 1]`. Returns `None` outside that range.
    pub fn from_fraction(fraction: f64) -> Option<Self> {
        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return None;
        }
        Some(Self {
            per_mille: (fraction * 1000.0).round() as u16,
        })
    }

    pub fn fraction(&self) -> f64 {
        f64::from(self.per_mille) / 1000.0
    }

    /// Split `points` into `(forfeited, credited)`; forfeited is floored.
    pub fn split(&self, points: u64) -> (u64, u64) {
        let forfeited = points.saturating_mul(u64::from(self.per_mille)) / 1000;
        (forfeited, points - forfeited)
    }
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self::STRICT
    }
}

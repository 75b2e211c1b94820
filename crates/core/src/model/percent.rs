use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole-number completion percentage in `0..=100`.
///
/// All rollups round half up, so `Percent::of(1, 8)` (12.5%) is `13`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const FULL: Percent = Percent(100);

    /// Returns `None` when `value` is above 100.
    #[must_use]
    pub fn new(value: u8) -> Option<Self> {
        (value <= 100).then_some(Self(value))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Share of `completed` children out of `total`.
    ///
    /// The denominator is `max(total, 1)`, so an empty parent is 0%.
    /// `completed` is clamped to `total`.
    #[must_use]
    pub fn of(completed: u32, total: u32) -> Self {
        let total = u64::from(total.max(1));
        let completed = u64::from(completed).min(total);
        Self::from_ratio(100 * completed, total)
    }

    /// Mean of `values` over `child_count` children.
    ///
    /// Children without a value contribute 0: the denominator is
    /// `child_count`, not `values.len()`. Zero children yields 0%.
    #[must_use]
    pub fn average(values: impl IntoIterator<Item = Percent>, child_count: usize) -> Self {
        if child_count == 0 {
            return Self::ZERO;
        }
        let sum: u64 = values.into_iter().map(|p| u64::from(p.0)).sum();
        Self::from_ratio(sum, child_count as u64)
    }

    fn from_ratio(numerator: u64, denominator: u64) -> Self {
        let rounded = (2 * numerator + denominator) / (2 * denominator);
        Self(u8::try_from(rounded.min(100)).unwrap_or(100))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

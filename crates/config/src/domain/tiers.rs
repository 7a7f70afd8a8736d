//! Threshold tables shared by the scoring sections
//!
//! Tables are evaluated top-down and the first matching row wins, so rows
//! must be ordered from the strictest threshold to the loosest.

use serde::{Deserialize, Serialize};

/// `value >= min` awards `points`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTier {
    pub min: u32,
    pub points: u32,
}

impl ThresholdTier {
    pub const fn new(min: u32, points: u32) -> Self {
        Self { min, points }
    }
}

/// Points for the first tier whose minimum is reached, else 0
pub fn tier_points(tiers: &[ThresholdTier], value: u32) -> u32 {
    tiers
        .iter()
        .find(|tier| value >= tier.min)
        .map(|tier| tier.points)
        .unwrap_or(0)
}

/// Same as [`ThresholdTier`] for fractional inputs (ratings, currency)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatTier {
    pub min: f64,
    pub points: u32,
}

impl FloatTier {
    pub const fn new(min: f64, points: u32) -> Self {
        Self { min, points }
    }
}

pub fn float_tier_points(tiers: &[FloatTier], value: f64) -> u32 {
    tiers
        .iter()
        .find(|tier| value >= tier.min)
        .map(|tier| tier.points)
        .unwrap_or(0)
}

/// Applies once `days > after_days`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeTier<T> {
    pub after_days: u32,
    pub value: T,
}

impl<T> AgeTier<T> {
    pub const fn new(after_days: u32, value: T) -> Self {
        Self { after_days, value }
    }
}

/// Value of the first tier strictly exceeded by `days`
pub fn age_tier_value<T: Copy>(tiers: &[AgeTier<T>], days: u32) -> Option<T> {
    tiers
        .iter()
        .find(|tier| days > tier.after_days)
        .map(|tier| tier.value)
}

/// True when every table is sorted strictest-first
pub(crate) fn is_descending<K: PartialOrd>(keys: impl IntoIterator<Item = K>) -> bool {
    let keys: Vec<K> = keys.into_iter().collect();
    keys.windows(2).all(|w| w[0] >= w[1])
}

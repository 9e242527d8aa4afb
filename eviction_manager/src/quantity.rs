//! Threshold/min-reclaim values: an absolute quantity or a percent of
//! capacity (`spec.md` §3).
//!
//! `Percent` mirrors this workspace's `utils::serde_percent::Percent`
//! newtype (see its use as `max_usage_pct: Percent` in
//! `disk_usage_eviction_task.rs`): a `u8` clamped to `0..=100`, serialized as
//! a plain integer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub fn new(value: u8) -> Option<Self> {
        if value <= 100 {
            Some(Percent(value))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Percent {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Percent::new(value).ok_or_else(|| format!("{value} is not a valid percentage (0..=100)"))
    }
}

impl From<Percent> for u8 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

/// An absolute quantity (bytes, inodes, or process slots depending on the
/// signal) or a percentage of that signal's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Absolute(u64),
    Percentage(Percent),
}

impl Quantity {
    /// Resolve against a capacity, which may be unavailable for derived
    /// signals (`spec.md` §3). A percentage quantity with no capacity
    /// resolves to `None`: the threshold simply cannot be evaluated this
    /// tick.
    pub fn resolve(self, capacity: Option<u64>) -> Option<u64> {
        match self {
            Quantity::Absolute(v) => Some(v),
            Quantity::Percentage(p) => {
                let capacity = capacity?;
                Some((capacity as u128 * p.get() as u128 / 100) as u64)
            }
        }
    }
}

//! Threshold records (`spec.md` §3) and `mergeThresholds` (§4.2).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;
use crate::signal::Signal;

/// `{signal, operator (< only), value, gracePeriod, minReclaim}`.
///
/// The operator is always `<`; the spec names it as a field for fidelity to
/// the source config schema, but there is only one legal value so we don't
/// bother modeling an enum with one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub signal: Signal,
    pub value: Quantity,
    #[serde(with = "humantime_serde", default)]
    pub grace_period: Duration,
    #[serde(default)]
    pub min_reclaim: Option<Quantity>,
}

impl Threshold {
    pub fn is_hard(&self) -> bool {
        self.grace_period == Duration::ZERO
    }

    pub fn is_soft(&self) -> bool {
        !self.is_hard()
    }

    /// Dedup key used by `merge_thresholds`.
    fn identity(&self) -> (Signal, Quantity, Duration) {
        (self.signal, self.value, self.grace_period)
    }
}

/// Union of two threshold lists, deduplicated by `(signal, value, gracePeriod)`.
pub fn merge_thresholds(a: &[Threshold], b: &[Threshold]) -> Vec<Threshold> {
    let mut merged: Vec<Threshold> = Vec::with_capacity(a.len() + b.len());
    for t in a.iter().chain(b.iter()) {
        if !merged.iter().any(|m| m.identity() == t.identity()) {
            merged.push(t.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Quantity;

    fn t(signal: Signal, value: u64, grace_secs: u64) -> Threshold {
        Threshold {
            signal,
            value: Quantity::Absolute(value),
            grace_period: Duration::from_secs(grace_secs),
            min_reclaim: None,
        }
    }

    #[test]
    fn hard_vs_soft() {
        assert!(t(Signal::MemoryAvailable, 100, 0).is_hard());
        assert!(t(Signal::MemoryAvailable, 100, 1).is_soft());
    }

    #[test]
    fn merge_dedups() {
        let a = vec![t(Signal::MemoryAvailable, 100, 0)];
        let b = vec![
            t(Signal::MemoryAvailable, 100, 0),
            t(Signal::NodefsAvailable, 1, 30),
        ];
        let merged = merge_thresholds(&a, &b);
        assert_eq!(merged.len(), 2);
    }
}

//! Crate-wide error taxonomy, matching `spec.md` §7.
//!
//! Transient, expected-to-retry failures get their own variant so call sites
//! can `log and skip this tick` without treating them as a bug; everything
//! else bubbles up through `anyhow` at the tick boundary only (see
//! `manager::Manager::synchronize`, which never returns an `Err`).

use thiserror::Error;

use crate::signal::Signal;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate threshold for {signal} at value {value:?} grace {grace_period:?}")]
    DuplicateThreshold {
        signal: Signal,
        value: crate::quantity::Quantity,
        grace_period: std::time::Duration,
    },
    #[error("{0} is a metrics-only pseudo-signal and cannot be configured as a threshold")]
    PseudoSignalConfigured(Signal),
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("fetching stats snapshot failed: {0}")]
    Fetch(#[source] anyhow::Error),
    #[error("dedicated image filesystem probe failed: {0}")]
    DedicatedImageFsProbe(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("no ranking function registered for signal {0}")]
    MissingComparator(Signal),
}

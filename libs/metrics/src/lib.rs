//! Thin wrapper around the `prometheus` crate.
//!
//! Mirrors the workspace convention of registering metrics once, as
//! process-wide lazy statics, rather than threading a registry handle through
//! every component that wants to record something.

pub use prometheus::{
    register_histogram_vec, register_int_counter_vec, Histogram, HistogramVec, IntCounter,
    IntCounterVec,
};

/// Register an [`IntCounterVec`] against the default global registry, panicking on
/// duplicate registration. Call sites are expected to stash the result in a
/// `once_cell::sync::Lazy` static, so this only ever runs once per process.
pub fn counter_vec(name: &str, help: &str, label_names: &[&str]) -> IntCounterVec {
    register_int_counter_vec!(name, help, label_names).expect("failed to register counter")
}

/// Register a [`HistogramVec`] against the default global registry.
pub fn histogram_vec(name: &str, help: &str, label_names: &[&str]) -> HistogramVec {
    register_histogram_vec!(name, help, label_names).expect("failed to register histogram")
}

//! Process-wide metrics (`spec.md` §6), registered once as lazy statics —
//! the same convention this workspace's `metrics` lib uses for its own
//! counters.

use ::metrics::{histogram_vec, counter_vec, HistogramVec, IntCounterVec};
use once_cell::sync::Lazy;

pub static EVICTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    counter_vec(
        "eviction_manager_evictions_total",
        "Number of pods evicted, labeled by the signal that triggered the eviction",
        &["signal"],
    )
});

pub static EVICTION_STATS_AGE_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    histogram_vec(
        "eviction_manager_eviction_stats_age_seconds",
        "Age of the stats snapshot used for a met threshold's decision",
        &["signal"],
    )
});

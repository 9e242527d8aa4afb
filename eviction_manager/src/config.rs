//! Configuration (`spec.md` §6), validated once at construction rather than
//! at tick time (`SPEC_FULL.md` §4.10) — mirrors the pattern in
//! `DiskUsageEvictionTaskConfig` of a plain `serde`-deserializable struct
//! with `humantime_serde` for durations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::executor::FeatureFlags;
use crate::threshold::Threshold;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionManagerConfig {
    pub thresholds: Vec<Threshold>,
    #[serde(with = "humantime_serde")]
    pub pressure_transition_period: Duration,
    pub max_pod_grace_period_seconds: u32,
    pub pod_cgroup_root: String,
    pub kernel_memcg_notification: bool,
    pub local_storage_capacity_isolation: bool,
    #[serde(with = "humantime_serde")]
    pub monitoring_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_notifier_refresh_interval")]
    pub notifier_refresh_interval: Duration,
    #[serde(with = "humantime_serde", default = "default_pod_cleanup_timeout")]
    pub pod_cleanup_timeout: Duration,
    /// Selector flag for the allocation scorer (`spec.md` §4.5): when
    /// false, containers with no declared request get the default floor.
    #[serde(default)]
    pub use_requested: bool,
    /// Priority at or above which a pod counts as critical regardless of
    /// annotation (`spec.md` glossary: "Critical workload").
    pub system_critical_priority: i32,
    #[serde(default)]
    pub features: FeatureFlags,
}

fn default_notifier_refresh_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_pod_cleanup_timeout() -> Duration {
    Duration::from_secs(30)
}

impl EvictionManagerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for t in &self.thresholds {
            if t.signal.is_pseudo() {
                return Err(ConfigError::PseudoSignalConfigured(t.signal));
            }
        }

        for (i, a) in self.thresholds.iter().enumerate() {
            for b in &self.thresholds[..i] {
                if a.signal == b.signal && a.value == b.value && a.grace_period == b.grace_period {
                    return Err(ConfigError::DuplicateThreshold {
                        signal: a.signal,
                        value: a.value,
                        grace_period: a.grace_period,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Quantity;
    use crate::signal::Signal;

    fn base_config(thresholds: Vec<Threshold>) -> EvictionManagerConfig {
        EvictionManagerConfig {
            thresholds,
            pressure_transition_period: Duration::from_secs(60),
            max_pod_grace_period_seconds: 90,
            pod_cgroup_root: "/kubepods".into(),
            kernel_memcg_notification: false,
            local_storage_capacity_isolation: true,
            monitoring_interval: Duration::from_secs(10),
            notifier_refresh_interval: default_notifier_refresh_interval(),
            pod_cleanup_timeout: default_pod_cleanup_timeout(),
            use_requested: true,
            system_critical_priority: 2_000_000_000,
            features: FeatureFlags::default(),
        }
    }

    #[test]
    fn rejects_pseudo_signal_threshold() {
        let config = base_config(vec![Threshold {
            signal: Signal::EmptyDirFsLimit,
            value: Quantity::Absolute(1),
            grace_period: Duration::ZERO,
            min_reclaim: None,
        }]);
        assert!(matches!(config.validate(), Err(ConfigError::PseudoSignalConfigured(_))));
    }

    #[test]
    fn rejects_duplicate_thresholds() {
        let t = Threshold {
            signal: Signal::MemoryAvailable,
            value: Quantity::Absolute(100),
            grace_period: Duration::ZERO,
            min_reclaim: None,
        };
        let config = base_config(vec![t.clone(), t]);
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateThreshold { .. })));
    }
}

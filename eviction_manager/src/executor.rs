//! Eviction executor (`spec.md` §4.6, component G): protects critical
//! workloads, invokes the kill primitive, emits events and metrics.

use std::time::Duration;

use tracing::{info, warn};

use crate::events::{EventRecorder, EventType};
use crate::kill::{DisruptionTargetCondition, KillPod, PodStatusUpdate, TERMINATION_BY_KUBELET_REASON};
use crate::pods::Pod;
use crate::signal::{NodeCondition, Signal};

pub const EVICTED_REASON: &str = "Evicted";

/// A configuration capability, not a global lookup (`spec.md` §9): whether
/// the `PodDisruptionConditions` feature is enabled is passed in by the
/// caller rather than queried from a process-wide registry, so the executor
/// stays unit-testable.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct FeatureFlags {
    pub pod_disruption_conditions: bool,
}

pub struct Executor<'a> {
    pub kill_pod: &'a dyn KillPod,
    pub event_recorder: &'a dyn EventRecorder,
    pub features: FeatureFlags,
    pub system_critical_priority: i32,
}

/// Hard thresholds force a zero grace period; soft thresholds use the
/// configured cap (`spec.md` §4.6).
pub fn grace_period_override(is_hard: bool, max_pod_grace_period_seconds: u32) -> Duration {
    if is_hard {
        Duration::ZERO
    } else {
        Duration::from_secs(max_pod_grace_period_seconds as u64)
    }
}

impl<'a> Executor<'a> {
    /// Evict `pod`, returning `true` iff the kill primitive reported
    /// success. Refuses to evict a pod that is critical at the moment of the
    /// call (§8 invariant 5), even if it was ranked as a candidate earlier in
    /// the tick.
    pub async fn evict(
        &self,
        pod: &Pod,
        grace_period_override: Duration,
        message: String,
        signal: Signal,
        condition: Option<NodeCondition>,
    ) -> bool {
        if pod.is_critical(self.system_critical_priority) {
            warn!(pod = %pod.uid, "refusing to evict critical pod");
            return false;
        }

        self.event_recorder.eventf(&pod.uid, EventType::Warning, EVICTED_REASON, message.clone());

        let disruption_target = self.features.pod_disruption_conditions.then_some(DisruptionTargetCondition {
            reason: TERMINATION_BY_KUBELET_REASON,
        });

        let status = PodStatusUpdate {
            reason: EVICTED_REASON.to_string(),
            message,
            disruption_target,
        };

        let result = self
            .kill_pod
            .kill_pod(pod, true, Some(grace_period_override), status)
            .await;

        match result {
            Ok(()) => {
                info!(pod = %pod.uid, %signal, ?condition, "evicted pod");
                crate::metrics::EVICTIONS.with_label_values(&[&signal.to_string()]).inc();
                true
            }
            Err(e) => {
                warn!(pod = %pod.uid, "failed to kill pod: {e:#}");
                false
            }
        }
    }
}

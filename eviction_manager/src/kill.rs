//! Pod lifecycle collaborators (`spec.md` §6): `ActivePodsFunc`,
//! `PodCleanedUpFunc`, `KillPodFunc`, `MirrorPodFunc`. All out of scope per
//! §1 — only their interface lives in this crate.

use std::time::Duration;

use async_trait::async_trait;

use crate::pods::Pod;

/// The condition attached to a killed pod's status when
/// `PodDisruptionConditions` is enabled (`spec.md` §4.6, §9).
#[derive(Debug, Clone)]
pub struct DisruptionTargetCondition {
    pub reason: &'static str,
}

pub const TERMINATION_BY_KUBELET_REASON: &str = "TerminationByKubelet";

/// Mutations the kill primitive applies to the pod's status on its way down
/// (`spec.md` §4.6).
#[derive(Debug, Clone)]
pub struct PodStatusUpdate {
    pub reason: String,
    pub message: String,
    pub disruption_target: Option<DisruptionTargetCondition>,
}

#[async_trait]
pub trait KillPod: Send + Sync {
    async fn kill_pod(
        &self,
        pod: &Pod,
        is_evicted: bool,
        grace_period_override: Option<Duration>,
        status: PodStatusUpdate,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ActivePods: Send + Sync {
    async fn active_pods(&self) -> Vec<Pod>;
}

#[async_trait]
pub trait PodCleanedUp: Send + Sync {
    async fn pod_cleaned_up(&self, pod: &Pod) -> bool;
}

pub trait MirrorPod: Send + Sync {
    fn mirror_pod(&self, static_pod: &Pod) -> Option<Pod>;
}

//! Minimal workload model: just enough surface for ranking (§4.3), the
//! allocation scorer (§4.5), and the executor (§4.6) to operate on. Nothing
//! beyond what those sections name is modeled — the full pod spec belongs to
//! the (out-of-scope) scheduler and API server.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type PodUid = String;

/// `BestEffort` (no requests/limits), `Burstable` (some), `Guaranteed`
/// (requests = limits for all resources). Ordered so that
/// `BestEffort < Burstable < Guaranteed`, matching the ranking key order in
/// `spec.md` §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QosClass {
    BestEffort,
    Burstable,
    Guaranteed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    pub cpu_millis: Option<u64>,
    pub memory_bytes: Option<u64>,
    pub ephemeral_storage_bytes: Option<u64>,
}

impl ResourceList {
    pub fn is_empty(&self) -> bool {
        self.cpu_millis.is_none() && self.memory_bytes.is_none() && self.ephemeral_storage_bytes.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedResources(pub HashMap<String, u64>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub is_init: bool,
    pub requests: ResourceList,
    pub limits: ResourceList,
    pub extended_requests: ExtendedResources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyDirMedium {
    Default,
    /// Backed by tmpfs: counts toward local-ephemeral usage the same as
    /// on-disk storage (`spec.md` §4.3).
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyDirVolume {
    pub name: String,
    pub size_limit: Option<u64>,
    pub medium: EmptyDirMedium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Volume {
    EmptyDir(EmptyDirVolume),
    Other { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TolerationEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toleration {
    pub key: String,
    pub value: Option<String>,
    pub effect: Option<TolerationEffect>,
}

/// `node.kubernetes.io/memory-pressure` — the taint the admission gate
/// checks tolerations against (`spec.md` §4.8).
pub const MEMORY_PRESSURE_TAINT_KEY: &str = "node.kubernetes.io/memory-pressure";

impl Toleration {
    pub fn tolerates_no_schedule(&self, key: &str) -> bool {
        self.key == key
            && matches!(
                self.effect,
                None | Some(TolerationEffect::NoSchedule)
            )
    }
}

/// A co-scheduled group of containers with shared lifecycle — the thing that
/// gets evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub uid: PodUid,
    pub namespace: String,
    pub name: String,
    pub qos_class: QosClass,
    pub priority: i32,
    /// System threshold above which a pod's priority alone makes it critical
    /// (`spec.md` glossary: "Critical workload"). Compared against at
    /// ranking/executor time via [`Pod::is_critical`].
    pub critical_by_annotation: bool,
    /// Static/mirror pods are file-provided and mirrored into cluster state;
    /// treated as critical (`spec.md` glossary).
    pub is_static_or_mirror: bool,
    pub containers: Vec<Container>,
    pub volumes: Vec<Volume>,
    pub tolerations: Vec<Toleration>,
    pub overhead: ResourceList,
}

impl Pod {
    pub fn is_critical(&self, system_critical_priority: i32) -> bool {
        self.is_static_or_mirror || self.critical_by_annotation || self.priority >= system_critical_priority
    }

    pub fn pid_request(&self) -> u64 {
        // Process-count requests are not part of the resource model
        // upstream Kubernetes exposes, so a pod with no explicit override is
        // treated as requesting zero (`spec.md` §4.3, "Usage-above-request"
        // override for PID signals).
        0
    }
}

//! External stats collaborators (`spec.md` §6: `SummaryProvider`,
//! `DiskInfoProvider`) and the snapshot types they hand back.
//!
//! These are out of scope per §1 ("the stats source that returns node/pod
//! usage snapshots"); only their interface lives in this crate.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::pods::PodUid;

#[derive(Debug, Clone, Copy, Default)]
pub struct FsStats {
    pub available_bytes: u64,
    pub capacity_bytes: u64,
    pub inodes_free: u64,
    pub inodes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NodeMemoryStats {
    /// Reported directly by the stats source when present; otherwise derived
    /// as `capacity - working_set` (`spec.md` §4.1).
    pub available_bytes: Option<u64>,
    pub capacity_bytes: u64,
    pub working_set_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerStats {
    pub logs_used_bytes: u64,
    pub logs_used_inodes: u64,
    /// Writable-layer ("rootfs") usage; only counted toward local-ephemeral
    /// usage when the node has no dedicated image filesystem (§4.3, §4.5.3).
    pub rootfs_used_bytes: u64,
    pub rootfs_used_inodes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PodStats {
    pub memory_working_set_bytes: u64,
    pub ephemeral_storage_used_bytes: u64,
    pub running_processes: u64,
    pub containers: HashMap<String, ContainerStats>,
    /// Volume name -> observed used bytes, for `emptyDir` volumes.
    pub volume_used_bytes: HashMap<String, u64>,
    /// Volume name -> observed used inodes, for `emptyDir` volumes (ranking
    /// key override for inode signals, `spec.md` §4.3).
    pub volume_used_inodes: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct NodeStats {
    pub memory: NodeMemoryStats,
    /// Allocatable capacity for the "in the allocatable cgroup" scope
    /// (`spec.md` §4.1); `None` when the node has no separate allocatable
    /// accounting.
    pub allocatable_capacity_bytes: Option<u64>,
    pub nodefs: FsStats,
    /// Absent when the node reports no separate image filesystem
    /// (`spec.md` §4.1).
    pub imagefs: Option<FsStats>,
    pub max_pids: Option<u64>,
    pub running_processes: Option<u64>,
}

/// A full usage snapshot: node-level stats plus per-pod stats, all stamped
/// with the time the underlying source collected them (`spec.md` §3:
/// "Timestamps come from the stats snapshot, not from the local clock").
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub timestamp: SystemTime,
    pub node: NodeStats,
    pub pods: HashMap<PodUid, PodStats>,
    /// Pods whose resource scope counts toward the allocatable cgroup
    /// (`spec.md` §4.1, §9 open question on `allocatableMemory.available`).
    pub in_allocatable_scope: Vec<PodUid>,
}

impl Summary {
    /// The pure function `statsFor(pod) -> (podStats, ok)` from §4.1,
    /// expressed as `Option` instead of a `(value, bool)` pair.
    pub fn stats_for(&self, uid: &str) -> Option<&PodStats> {
        self.pods.get(uid)
    }
}

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn get(&self, update_stats: bool) -> anyhow::Result<Summary>;
}

#[async_trait]
pub trait DiskInfoProvider: Send + Sync {
    async fn has_dedicated_image_fs(&self) -> anyhow::Result<bool>;
}

//! Threshold notifier abstraction (`spec.md` §6, §9): the second-level file
//! descriptor mechanism that wakes the manager on kernel cgroup memory
//! events is abstracted here as a "threshold notifier". Out of scope per
//! §1 — only the interface lives in this crate.

use std::sync::Arc;

use async_trait::async_trait;

use crate::stats::Summary;
use crate::threshold::Threshold;

/// An edge-triggered notification source for a single memory threshold. Its
/// `watch` future resolves once, when the kernel-side trigger fires; callers
/// re-arm by calling `watch` again after handling the event.
#[async_trait]
pub trait CgroupNotifier: Send + Sync {
    /// Block until the kernel reports the watched cgroup crossed its
    /// trigger level.
    async fn watch(&self) -> anyhow::Result<()>;

    /// Re-derive and push down the kernel-side trigger level from a fresh
    /// stats summary, so it tracks capacity changes (`spec.md` §4.7,
    /// `notifierRefreshInterval`).
    async fn update_threshold(&self, summary: &Summary) -> anyhow::Result<()>;
}

pub trait CgroupNotifierFactory: Send + Sync {
    fn new_cgroup_notifier(
        &self,
        pod_cgroup_root: &str,
        threshold: &Threshold,
    ) -> anyhow::Result<Arc<dyn CgroupNotifier>>;
}

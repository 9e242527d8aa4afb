//! Event recording (`spec.md` §6): out of scope, interface only.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

pub trait EventRecorder: Send + Sync {
    fn eventf(&self, object_ref: &str, event_type: EventType, reason: &str, message: String);
}

/// Object ref the manager records node-level events against; this crate has
/// no `Node` type of its own (`spec.md` §1), so it's a fixed string rather
/// than a field threaded through from the stats source.
pub const NODE_OBJECT_REF: &str = "node";

/// Reason for the node-level event fired once a threshold is selected for
/// action (`spec.md` §6), alongside the workload-level `Evicted` reason in
/// `executor.rs`.
pub const THRESHOLD_MET_REASON: &str = "EvictionThresholdMet";

//! Observation engine (`spec.md` §4.1, component B): turns a usage snapshot
//! into per-signal observations.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::signal::Signal;
use crate::stats::Summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub available: u64,
    /// Absent for derived signals that have no natural capacity (`spec.md`
    /// §3).
    pub capacity: Option<u64>,
    pub timestamp: SystemTime,
}

pub type Observations = HashMap<Signal, Observation>;

/// Derive observations for every signal the snapshot has data for
/// (`spec.md` §4.1). A signal absent from the snapshot (e.g. `imagefs.*`
/// on a node with no dedicated image filesystem) is simply absent from the
/// result, never a zeroed-out entry.
pub fn observe(summary: &Summary) -> Observations {
    let mut out = Observations::new();
    let ts = summary.timestamp;
    let node = &summary.node;

    let memory_available = node
        .memory
        .available_bytes
        .unwrap_or_else(|| node.memory.capacity_bytes.saturating_sub(node.memory.working_set_bytes));
    out.insert(
        Signal::MemoryAvailable,
        Observation {
            available: memory_available,
            capacity: Some(node.memory.capacity_bytes),
            timestamp: ts,
        },
    );

    if let Some(allocatable_capacity) = node.allocatable_capacity_bytes {
        let used_in_allocatable: u64 = summary
            .in_allocatable_scope
            .iter()
            .filter_map(|uid| summary.pods.get(uid))
            .map(|p| p.memory_working_set_bytes)
            .sum();
        out.insert(
            Signal::AllocatableMemoryAvailable,
            Observation {
                available: allocatable_capacity.saturating_sub(used_in_allocatable),
                capacity: Some(allocatable_capacity),
                timestamp: ts,
            },
        );
    }

    out.insert(
        Signal::NodefsAvailable,
        Observation {
            available: node.nodefs.available_bytes,
            capacity: Some(node.nodefs.capacity_bytes),
            timestamp: ts,
        },
    );
    out.insert(
        Signal::NodefsInodesFree,
        Observation {
            available: node.nodefs.inodes_free,
            capacity: Some(node.nodefs.inodes),
            timestamp: ts,
        },
    );

    if let Some(imagefs) = node.imagefs {
        out.insert(
            Signal::ImagefsAvailable,
            Observation {
                available: imagefs.available_bytes,
                capacity: Some(imagefs.capacity_bytes),
                timestamp: ts,
            },
        );
        out.insert(
            Signal::ImagefsInodesFree,
            Observation {
                available: imagefs.inodes_free,
                capacity: Some(imagefs.inodes),
                timestamp: ts,
            },
        );
    }

    if let (Some(max_pids), Some(running)) = (node.max_pids, node.running_processes) {
        out.insert(
            Signal::PidAvailable,
            Observation {
                available: max_pids.saturating_sub(running),
                capacity: Some(max_pids),
                timestamp: ts,
            },
        );
    }

    out
}

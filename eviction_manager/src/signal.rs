//! Signal & threshold naming (`spec.md` §3, component A).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A monitored quantity. The three `*fs.limit` variants never appear as a
/// configured threshold (`spec.md` §9); they exist only to label metrics
/// emitted by the local-storage enforcer (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "memory.available")]
    MemoryAvailable,
    #[serde(rename = "allocatableMemory.available")]
    AllocatableMemoryAvailable,
    #[serde(rename = "nodefs.available")]
    NodefsAvailable,
    #[serde(rename = "nodefs.inodesFree")]
    NodefsInodesFree,
    #[serde(rename = "imagefs.available")]
    ImagefsAvailable,
    #[serde(rename = "imagefs.inodesFree")]
    ImagefsInodesFree,
    #[serde(rename = "pid.available")]
    PidAvailable,
    #[serde(rename = "ephemeralcontainerfs.limit")]
    EphemeralContainerFsLimit,
    #[serde(rename = "ephemeralpodfs.limit")]
    EphemeralPodFsLimit,
    #[serde(rename = "emptydirfs.limit")]
    EmptyDirFsLimit,
}

impl Signal {
    /// The three pseudo-signals used only for metrics labeling in §4.5; these
    /// must never be accepted in a configured threshold list.
    pub fn is_pseudo(self) -> bool {
        matches!(
            self,
            Signal::EphemeralContainerFsLimit | Signal::EphemeralPodFsLimit | Signal::EmptyDirFsLimit
        )
    }

    /// Fixed mapping from signal to the coarse node condition it contributes
    /// to (`spec.md` §4.2). Pseudo-signals map to nothing: they never reach
    /// the threshold evaluator.
    pub fn node_condition(self) -> Option<NodeCondition> {
        use Signal::*;
        match self {
            MemoryAvailable | AllocatableMemoryAvailable => Some(NodeCondition::MemoryPressure),
            NodefsAvailable | NodefsInodesFree | ImagefsAvailable | ImagefsInodesFree => {
                Some(NodeCondition::DiskPressure)
            }
            PidAvailable => Some(NodeCondition::PidPressure),
            EphemeralContainerFsLimit | EphemeralPodFsLimit | EmptyDirFsLimit => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::MemoryAvailable => "memory.available",
            Signal::AllocatableMemoryAvailable => "allocatableMemory.available",
            Signal::NodefsAvailable => "nodefs.available",
            Signal::NodefsInodesFree => "nodefs.inodesFree",
            Signal::ImagefsAvailable => "imagefs.available",
            Signal::ImagefsInodesFree => "imagefs.inodesFree",
            Signal::PidAvailable => "pid.available",
            Signal::EphemeralContainerFsLimit => "ephemeralcontainerfs.limit",
            Signal::EphemeralPodFsLimit => "ephemeralpodfs.limit",
            Signal::EmptyDirFsLimit => "emptydirfs.limit",
        };
        f.write_str(s)
    }
}

/// Coarse node condition summary (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCondition {
    MemoryPressure,
    DiskPressure,
    PidPressure,
}

impl fmt::Display for NodeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeCondition::MemoryPressure => "MemoryPressure",
            NodeCondition::DiskPressure => "DiskPressure",
            NodeCondition::PidPressure => "PIDPressure",
        };
        f.write_str(s)
    }
}

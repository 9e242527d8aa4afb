//! Node-level reclaim (`spec.md` §4.4, component E): invokes image/container
//! GC before falling back to evicting a workload.

use tracing::warn;

use crate::gc::{ContainerGc, ImageGc};
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimAction {
    DeleteUnusedContainers,
    DeleteUnusedImages,
}

/// `signalToReclaimFuncs[signal]` (`spec.md` §3, §4.4). Inode signals reuse
/// their byte-availability counterpart's action list: deleting unused
/// images/containers frees inodes along with bytes, and the spec gives no
/// separate list for them (decision recorded in `DESIGN.md`).
pub fn reclaim_actions_for(signal: Signal, dedicated_image_fs: bool) -> Vec<ReclaimAction> {
    use Signal::*;
    match signal {
        ImagefsAvailable | ImagefsInodesFree => {
            vec![ReclaimAction::DeleteUnusedContainers, ReclaimAction::DeleteUnusedImages]
        }
        NodefsAvailable | NodefsInodesFree if !dedicated_image_fs => {
            vec![ReclaimAction::DeleteUnusedContainers, ReclaimAction::DeleteUnusedImages]
        }
        _ => vec![],
    }
}

/// Runs each action in order; a failing action is logged and does not abort
/// the remaining ones (`spec.md` §4.4, §7).
pub async fn run_reclaim(actions: &[ReclaimAction], image_gc: &dyn ImageGc, container_gc: &dyn ContainerGc) {
    for action in actions {
        let result = match action {
            ReclaimAction::DeleteUnusedContainers => container_gc.delete_all_unused_containers().await,
            ReclaimAction::DeleteUnusedImages => image_gc.delete_unused_images().await,
        };
        if let Err(e) = result {
            warn!(?action, "node-level reclaim action failed: {e:#}");
        }
    }
}

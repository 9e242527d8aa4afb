//! Ranking library (`spec.md` §4.3, component D): per-signal comparators
//! over workloads, totally ordering a candidate list toward "evict first".

use std::cmp::Reverse;

use crate::allocation::{calculate_pod_resource_request, ResourceDimension};
use crate::error::RankingError;
use crate::pods::{EmptyDirMedium, Pod, Volume};
use crate::signal::Signal;
use crate::stats::PodStats;

pub struct Candidate<'a> {
    pub pod: &'a Pod,
    pub stats: &'a PodStats,
}

/// Bytes of local-ephemeral-storage usage attributable to a pod: container
/// logs, plus container rootfs when the node has no dedicated image
/// filesystem, plus `emptyDir` volumes — except volumes on a `memory` medium,
/// which are backed by tmpfs and counted as memory usage, not disk
/// (`spec.md` §4.3; resolved as a `DESIGN.md` decision since the wording is
/// ambiguous on this point).
pub fn local_ephemeral_usage_bytes(pod: &Pod, stats: &PodStats, dedicated_image_fs: bool) -> u64 {
    let container_bytes: u64 = pod
        .containers
        .iter()
        .filter_map(|c| stats.containers.get(&c.name))
        .map(|cs| cs.logs_used_bytes + if dedicated_image_fs { 0 } else { cs.rootfs_used_bytes })
        .sum();
    let volume_bytes: u64 = pod
        .volumes
        .iter()
        .filter_map(|v| match v {
            Volume::EmptyDir(e) if !matches!(e.medium, EmptyDirMedium::Memory) => {
                stats.volume_used_bytes.get(&e.name).copied()
            }
            _ => None,
        })
        .sum();
    container_bytes + volume_bytes
}

pub fn local_ephemeral_usage_inodes(pod: &Pod, stats: &PodStats, dedicated_image_fs: bool) -> u64 {
    let container_inodes: u64 = pod
        .containers
        .iter()
        .filter_map(|c| stats.containers.get(&c.name))
        .map(|cs| cs.logs_used_inodes + if dedicated_image_fs { 0 } else { cs.rootfs_used_inodes })
        .sum();
    let volume_inodes: u64 = pod
        .volumes
        .iter()
        .filter_map(|v| match v {
            Volume::EmptyDir(e) if !matches!(e.medium, EmptyDirMedium::Memory) => {
                stats.volume_used_inodes.get(&e.name).copied()
            }
            _ => None,
        })
        .sum();
    container_inodes + volume_inodes
}

/// Key 4 of the ranking order: "usage above request on the pressured
/// resource", signed so that usage below request sorts correctly against
/// other under-request candidates. Shares `calculate_pod_resource_request`
/// with the allocation scorer (`spec.md` §4.5) so a pod's cost — overhead
/// included, default-floor applied per `use_requested` — is computed the
/// same way in both places.
fn usage_excess(signal: Signal, pod: &Pod, stats: &PodStats, dedicated_image_fs: bool, use_requested: bool) -> i128 {
    match signal {
        Signal::MemoryAvailable | Signal::AllocatableMemoryAvailable => {
            let request = calculate_pod_resource_request(pod, ResourceDimension::Memory, use_requested);
            stats.memory_working_set_bytes as i128 - request as i128
        }
        Signal::NodefsAvailable | Signal::ImagefsAvailable => {
            let usage = local_ephemeral_usage_bytes(pod, stats, dedicated_image_fs);
            let request = calculate_pod_resource_request(pod, ResourceDimension::EphemeralStorage, use_requested);
            usage as i128 - request as i128
        }
        Signal::NodefsInodesFree | Signal::ImagefsInodesFree => {
            local_ephemeral_usage_inodes(pod, stats, dedicated_image_fs) as i128
        }
        Signal::PidAvailable => stats.running_processes as i128 - pod.pid_request() as i128,
        Signal::EphemeralContainerFsLimit | Signal::EphemeralPodFsLimit | Signal::EmptyDirFsLimit => 0,
    }
}

/// Sort `candidates` in place into eviction order for `signal`
/// (`spec.md` §4.3). Callers are expected to have already filtered out
/// exempt workloads (critical / static / mirror) — ranking only orders, it
/// never excludes.
pub fn rank(signal: Signal, candidates: &mut [Candidate<'_>], dedicated_image_fs: bool, use_requested: bool) -> Result<(), RankingError> {
    if !matches!(
        signal,
        Signal::MemoryAvailable
            | Signal::AllocatableMemoryAvailable
            | Signal::NodefsAvailable
            | Signal::NodefsInodesFree
            | Signal::ImagefsAvailable
            | Signal::ImagefsInodesFree
            | Signal::PidAvailable
    ) {
        return Err(RankingError::MissingComparator(signal));
    }

    candidates.sort_by_key(|c| {
        (
            c.pod.qos_class,
            c.pod.priority,
            Reverse(usage_excess(signal, c.pod, c.stats, dedicated_image_fs, use_requested)),
        )
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pods::{Container, ExtendedResources, Pod, QosClass, ResourceList};
    use crate::stats::PodStats;
    use std::collections::HashMap;

    fn pod(uid: &str, qos: QosClass, priority: i32, mem_request: u64) -> Pod {
        Pod {
            uid: uid.into(),
            namespace: "default".into(),
            name: uid.into(),
            qos_class: qos,
            priority,
            critical_by_annotation: false,
            is_static_or_mirror: false,
            containers: vec![Container {
                name: "c".into(),
                is_init: false,
                requests: ResourceList {
                    cpu_millis: None,
                    memory_bytes: Some(mem_request),
                    ephemeral_storage_bytes: None,
                },
                limits: ResourceList::default(),
                extended_requests: ExtendedResources::default(),
            }],
            volumes: vec![],
            tolerations: vec![],
            overhead: ResourceList::default(),
        }
    }

    fn stats(working_set: u64) -> PodStats {
        PodStats {
            memory_working_set_bytes: working_set,
            ephemeral_storage_used_bytes: 0,
            running_processes: 0,
            containers: HashMap::new(),
            volume_used_bytes: HashMap::new(),
            volume_used_inodes: HashMap::new(),
        }
    }

    #[test]
    fn best_effort_evicted_before_guaranteed() {
        let be = pod("be", QosClass::BestEffort, 0, 0);
        let gt = pod("gt", QosClass::Guaranteed, 0, 100);
        let be_stats = stats(10);
        let gt_stats = stats(1_000_000);
        let mut candidates = vec![
            Candidate { pod: &gt, stats: &gt_stats },
            Candidate { pod: &be, stats: &be_stats },
        ];
        rank(Signal::MemoryAvailable, &mut candidates, true, true).unwrap();
        assert_eq!(candidates[0].pod.uid, "be");
    }

    #[test]
    fn within_qos_highest_excess_first() {
        let a = pod("a", QosClass::BestEffort, 0, 100);
        let b = pod("b", QosClass::BestEffort, 0, 100);
        let a_stats = stats(1000);
        let b_stats = stats(5000);
        let mut candidates = vec![
            Candidate { pod: &a, stats: &a_stats },
            Candidate { pod: &b, stats: &b_stats },
        ];
        rank(Signal::MemoryAvailable, &mut candidates, true, true).unwrap();
        assert_eq!(candidates[0].pod.uid, "b");
    }

    #[test]
    fn unknown_signal_is_an_error() {
        let mut candidates: Vec<Candidate<'_>> = vec![];
        let err = rank(Signal::EmptyDirFsLimit, &mut candidates, true, true).unwrap_err();
        assert!(matches!(err, RankingError::MissingComparator(_)));
    }
}

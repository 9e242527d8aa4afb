//! Local-storage enforcer (`spec.md` §4.5, component F): an independent
//! path, run before threshold-based eviction when local-storage capacity
//! isolation is enabled, that checks per-workload ephemeral/`emptyDir`
//! limits.

use crate::pods::{Pod, Volume};
use crate::signal::Signal;
use crate::stats::PodStats;

#[derive(Debug, Clone)]
pub struct LocalStorageViolation {
    pub pod_uid: String,
    pub message: String,
    /// Metrics label only — never a configured threshold (`spec.md` §9).
    pub signal: Signal,
}

/// Runs the three checks from `spec.md` §4.5 over every active workload, in
/// iteration order. The first violation for a pod wins; later checks for
/// that same pod are skipped. Unlike threshold eviction (one victim per
/// tick), every violating workload found in this pass is reported.
pub fn find_violations(pods: &[Pod], stats_by_uid: &std::collections::HashMap<String, PodStats>, dedicated_image_fs: bool) -> Vec<LocalStorageViolation> {
    let mut violations = Vec::new();

    for pod in pods {
        let Some(stats) = stats_by_uid.get(&pod.uid) else {
            continue;
        };

        if let Some(v) = check_empty_dir(pod, stats) {
            violations.push(v);
            continue;
        }
        if let Some(v) = check_pod_ephemeral(pod, stats) {
            violations.push(v);
            continue;
        }
        if let Some(v) = check_container_ephemeral(pod, stats, dedicated_image_fs) {
            violations.push(v);
        }
    }

    violations
}

fn check_empty_dir(pod: &Pod, stats: &PodStats) -> Option<LocalStorageViolation> {
    for volume in &pod.volumes {
        let Volume::EmptyDir(e) = volume else { continue };
        let Some(limit) = e.size_limit.filter(|&l| l > 0) else {
            continue;
        };
        let used = stats.volume_used_bytes.get(&e.name).copied().unwrap_or(0);
        if used > limit {
            return Some(LocalStorageViolation {
                pod_uid: pod.uid.clone(),
                message: format!(
                    "pod exceeded emptyDir volume {} size limit {limit} (used {used})",
                    e.name
                ),
                signal: Signal::EmptyDirFsLimit,
            });
        }
    }
    None
}

/// "the sum of container limits (plus overhead if present)" (`spec.md`
/// §4.5 point 2) — a plain sum across every container, unlike the
/// allocation scorer's max(regular sum, init max) shape in §4.5's request
/// formula, which this check does not reuse.
fn declared_pod_ephemeral_limit(pod: &Pod) -> u64 {
    let sum: u64 = pod
        .containers
        .iter()
        .map(|c| c.limits.ephemeral_storage_bytes.unwrap_or(0))
        .sum();
    sum + pod.overhead.ephemeral_storage_bytes.unwrap_or(0)
}

fn check_pod_ephemeral(pod: &Pod, stats: &PodStats) -> Option<LocalStorageViolation> {
    let limit = declared_pod_ephemeral_limit(pod);
    if limit == 0 {
        return None;
    }
    if stats.ephemeral_storage_used_bytes > limit {
        return Some(LocalStorageViolation {
            pod_uid: pod.uid.clone(),
            message: format!(
                "pod ephemeral-storage usage {} exceeds limit {limit}",
                stats.ephemeral_storage_used_bytes
            ),
            signal: Signal::EphemeralPodFsLimit,
        });
    }
    None
}

fn check_container_ephemeral(pod: &Pod, stats: &PodStats, dedicated_image_fs: bool) -> Option<LocalStorageViolation> {
    for container in &pod.containers {
        let Some(limit) = container.limits.ephemeral_storage_bytes.filter(|&l| l > 0) else {
            continue;
        };
        let Some(cs) = stats.containers.get(&container.name) else {
            continue;
        };
        let usage = cs.logs_used_bytes + if dedicated_image_fs { 0 } else { cs.rootfs_used_bytes };
        if usage > limit {
            return Some(LocalStorageViolation {
                pod_uid: pod.uid.clone(),
                message: format!(
                    "container {} ephemeral-storage usage {usage} exceeds limit {limit}",
                    container.name
                ),
                signal: Signal::EphemeralContainerFsLimit,
            });
        }
    }
    None
}

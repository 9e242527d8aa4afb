//! Allocation scorer (`spec.md` §4.5, component J): the resource-request
//! aggregation shared with the pod scheduling score.

use crate::pods::{Container, Pod};

/// Default floor applied to a container that declares no CPU/memory request
/// when `use_requested` is false (`spec.md` §4.5).
pub const DEFAULT_MILLICPU_REQUEST: u64 = 100;
pub const DEFAULT_MEMORY_REQUEST_BYTES: u64 = 200 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDimension {
    Cpu,
    Memory,
    EphemeralStorage,
}

fn container_request(container: &Container, dim: ResourceDimension, use_requested: bool) -> u64 {
    let requested = match dim {
        ResourceDimension::Cpu => container.requests.cpu_millis,
        ResourceDimension::Memory => container.requests.memory_bytes,
        ResourceDimension::EphemeralStorage => container.requests.ephemeral_storage_bytes,
    };
    match requested {
        Some(v) => v,
        None if use_requested => 0,
        None => match dim {
            ResourceDimension::Cpu => DEFAULT_MILLICPU_REQUEST,
            ResourceDimension::Memory => DEFAULT_MEMORY_REQUEST_BYTES,
            ResourceDimension::EphemeralStorage => 0,
        },
    }
}

fn overhead_for(pod: &Pod, dim: ResourceDimension) -> u64 {
    match dim {
        ResourceDimension::Cpu => pod.overhead.cpu_millis.unwrap_or(0),
        ResourceDimension::Memory => pod.overhead.memory_bytes.unwrap_or(0),
        ResourceDimension::EphemeralStorage => pod.overhead.ephemeral_storage_bytes.unwrap_or(0),
    }
}

/// `podRequest(r) = max(sum(regular containers' request(r)), max(init
/// containers' request(r))) + overhead(r)` (`spec.md` §4.5).
pub fn calculate_pod_resource_request(pod: &Pod, dim: ResourceDimension, use_requested: bool) -> u64 {
    let regular_sum: u64 = pod
        .containers
        .iter()
        .filter(|c| !c.is_init)
        .map(|c| container_request(c, dim, use_requested))
        .sum();
    let init_max: u64 = pod
        .containers
        .iter()
        .filter(|c| c.is_init)
        .map(|c| container_request(c, dim, use_requested))
        .max()
        .unwrap_or(0);

    regular_sum.max(init_max) + overhead_for(pod, dim)
}

/// Extended (scalar) resource request for `resource_name`. Returns `None`
/// when the pod requests zero of that resource, in which case scoring
/// should skip the dimension entirely (`spec.md` §4.5: "the allocatable
/// pair is suppressed").
pub fn calculate_pod_extended_resource_request(pod: &Pod, resource_name: &str) -> Option<u64> {
    let regular_sum: u64 = pod
        .containers
        .iter()
        .filter(|c| !c.is_init)
        .filter_map(|c| c.extended_requests.0.get(resource_name))
        .sum();
    let init_max: u64 = pod
        .containers
        .iter()
        .filter(|c| c.is_init)
        .filter_map(|c| c.extended_requests.0.get(resource_name))
        .max()
        .copied()
        .unwrap_or(0);

    let total = regular_sum.max(init_max);
    if total == 0 {
        None
    } else {
        Some(total)
    }
}

//! End-to-end coverage of [`Manager::synchronize`] through its trait seams,
//! exercising the concrete scenarios from `spec.md` §8 with fake
//! collaborators instead of real stats/kill/GC sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;

use eviction_manager::admission::AdmissionResult;
use eviction_manager::clock::SystemClock;
use eviction_manager::config::EvictionManagerConfig;
use eviction_manager::events::{EventRecorder, EventType};
use eviction_manager::executor::FeatureFlags;
use eviction_manager::gc::{ContainerGc, ImageGc};
use eviction_manager::kill::{ActivePods, KillPod, PodCleanedUp, PodStatusUpdate};
use eviction_manager::manager::{Manager, ManagerDeps};
use eviction_manager::pods::{
    Container, EmptyDirMedium, EmptyDirVolume, ExtendedResources, Pod, QosClass, ResourceList, Volume,
};
use eviction_manager::quantity::Quantity;
use eviction_manager::signal::Signal;
use eviction_manager::stats::{DiskInfoProvider, FsStats, NodeMemoryStats, NodeStats, PodStats, Summary, SummaryProvider};
use eviction_manager::threshold::Threshold;

struct FakeSummaryProvider(Mutex<Vec<Summary>>);

impl FakeSummaryProvider {
    fn queue(summaries: Vec<Summary>) -> Self {
        let mut summaries = summaries;
        summaries.reverse();
        Self(Mutex::new(summaries))
    }
}

#[async_trait]
impl SummaryProvider for FakeSummaryProvider {
    async fn get(&self, _update_stats: bool) -> anyhow::Result<Summary> {
        let mut queued = self.0.lock();
        Ok(queued.pop().expect("test queued fewer summaries than synchronize() fetched"))
    }
}

struct FakeDiskInfoProvider(bool);

#[async_trait]
impl DiskInfoProvider for FakeDiskInfoProvider {
    async fn has_dedicated_image_fs(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

struct FakeActivePods(Vec<Pod>);

#[async_trait]
impl ActivePods for FakeActivePods {
    async fn active_pods(&self) -> Vec<Pod> {
        self.0.clone()
    }
}

struct AlwaysCleanedUp;

#[async_trait]
impl PodCleanedUp for AlwaysCleanedUp {
    async fn pod_cleaned_up(&self, _pod: &Pod) -> bool {
        true
    }
}

#[derive(Default)]
struct RecordingKillPod {
    killed: Mutex<Vec<String>>,
}

#[async_trait]
impl KillPod for RecordingKillPod {
    async fn kill_pod(&self, pod: &Pod, _is_evicted: bool, _grace: Option<Duration>, _status: PodStatusUpdate) -> anyhow::Result<()> {
        self.killed.lock().push(pod.uid.clone());
        Ok(())
    }
}

struct NoopEventRecorder;

impl EventRecorder for NoopEventRecorder {
    fn eventf(&self, _object_ref: &str, _event_type: EventType, _reason: &str, _message: String) {}
}

#[derive(Default)]
struct CountingImageGc(AtomicU32);

#[async_trait]
impl ImageGc for CountingImageGc {
    async fn delete_unused_images(&self) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct CountingContainerGc(AtomicU32);

#[async_trait]
impl ContainerGc for CountingContainerGc {
    async fn delete_all_unused_containers(&self) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn healthy_node_stats() -> NodeStats {
    NodeStats {
        memory: NodeMemoryStats {
            available_bytes: Some(900 * MIB),
            capacity_bytes: 1000 * MIB,
            working_set_bytes: 100 * MIB,
        },
        allocatable_capacity_bytes: None,
        nodefs: FsStats {
            available_bytes: 900 * MIB,
            capacity_bytes: 1000 * MIB,
            inodes_free: 900_000,
            inodes: 1_000_000,
        },
        imagefs: Some(FsStats {
            available_bytes: 900 * MIB,
            capacity_bytes: 1000 * MIB,
            inodes_free: 900_000,
            inodes: 1_000_000,
        }),
        max_pids: Some(1000),
        running_processes: Some(50),
    }
}

const MIB: u64 = 1024 * 1024;

fn pod(uid: &str, qos: QosClass, mem_request: u64) -> Pod {
    Pod {
        uid: uid.to_string(),
        namespace: "default".into(),
        name: uid.to_string(),
        qos_class: qos,
        priority: 0,
        critical_by_annotation: false,
        is_static_or_mirror: false,
        containers: vec![Container {
            name: "main".into(),
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

fn pod_stats(working_set: u64) -> PodStats {
    PodStats {
        memory_working_set_bytes: working_set,
        ephemeral_storage_used_bytes: 0,
        running_processes: 0,
        containers: HashMap::new(),
        volume_used_bytes: HashMap::new(),
        volume_used_inodes: HashMap::new(),
    }
}

fn base_config(thresholds: Vec<Threshold>, local_storage_capacity_isolation: bool) -> EvictionManagerConfig {
    EvictionManagerConfig {
        thresholds,
        pressure_transition_period: Duration::from_secs(60),
        max_pod_grace_period_seconds: 90,
        pod_cgroup_root: "/kubepods".into(),
        kernel_memcg_notification: false,
        local_storage_capacity_isolation,
        monitoring_interval: Duration::from_secs(10),
        notifier_refresh_interval: Duration::from_secs(10),
        pod_cleanup_timeout: Duration::from_secs(30),
        use_requested: true,
        system_critical_priority: 2_000_000_000,
        features: FeatureFlags::default(),
    }
}

// Scenario A from spec.md §8: hard memory threshold, two BestEffort
// workloads plus one Guaranteed; the BestEffort with the highest working
// set above its request is evicted.
#[tokio::test]
async fn hard_memory_threshold_evicts_highest_excess_best_effort() {
    let threshold = Threshold {
        signal: Signal::MemoryAvailable,
        value: Quantity::Absolute(100 * MIB),
        grace_period: Duration::ZERO,
        min_reclaim: None,
    };

    let mut node = healthy_node_stats();
    node.memory.available_bytes = Some(80 * MIB);

    let be_small = pod("be-small", QosClass::BestEffort, 0);
    let be_big = pod("be-big", QosClass::BestEffort, 0);
    let guaranteed = pod("gt", QosClass::Guaranteed, 100 * MIB);

    let mut pods_stats = HashMap::new();
    pods_stats.insert(be_small.uid.clone(), pod_stats(10 * MIB));
    pods_stats.insert(be_big.uid.clone(), pod_stats(500 * MIB));
    pods_stats.insert(guaranteed.uid.clone(), pod_stats(100 * MIB));

    let summary = Summary {
        timestamp: SystemTime::UNIX_EPOCH,
        node,
        pods: pods_stats,
        in_allocatable_scope: vec![],
    };

    let kill_pod = Arc::new(RecordingKillPod::default());
    let config = base_config(vec![threshold], false);
    let deps = ManagerDeps {
        summary_provider: Arc::new(FakeSummaryProvider::queue(vec![summary])),
        disk_info_provider: Arc::new(FakeDiskInfoProvider(true)),
        active_pods: Arc::new(FakeActivePods(vec![be_small, be_big, guaranteed])),
        pod_cleaned_up: Arc::new(AlwaysCleanedUp),
        kill_pod: kill_pod.clone(),
        event_recorder: Arc::new(NoopEventRecorder),
        image_gc: Arc::new(CountingImageGc::default()),
        container_gc: Arc::new(CountingContainerGc::default()),
        notifier_factory: None,
    };
    let manager = Manager::new(config, deps, Arc::new(SystemClock)).unwrap();

    let evicted = manager.synchronize().await;
    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].uid, "be-big");
    assert_eq!(kill_pod.killed.lock().as_slice(), &["be-big".to_string()]);
    assert!(manager.is_under_memory_pressure());
}

// Scenario D from spec.md §8: emptyDir usage past its size limit evicts
// ahead of any threshold-based eviction, with every violator in the pass
// attempted.
#[tokio::test]
async fn empty_dir_violation_is_evicted_before_threshold_path() {
    let mut violator = pod("scratch-heavy", QosClass::BestEffort, 0);
    violator.volumes.push(Volume::EmptyDir(EmptyDirVolume {
        name: "scratch".into(),
        size_limit: Some(1024 * MIB),
        medium: EmptyDirMedium::Default,
    }));

    let mut stats = pod_stats(10 * MIB);
    stats.volume_used_bytes.insert("scratch".into(), (1.5 * 1024.0 * MIB as f64) as u64);

    let mut pods_stats = HashMap::new();
    pods_stats.insert(violator.uid.clone(), stats);

    let summary = Summary {
        timestamp: SystemTime::UNIX_EPOCH,
        node: healthy_node_stats(),
        pods: pods_stats,
        in_allocatable_scope: vec![],
    };

    let kill_pod = Arc::new(RecordingKillPod::default());
    let before = eviction_manager::metrics::EVICTIONS
        .with_label_values(&[&Signal::EmptyDirFsLimit.to_string()])
        .get();

    let config = base_config(vec![], true);
    let deps = ManagerDeps {
        summary_provider: Arc::new(FakeSummaryProvider::queue(vec![summary])),
        disk_info_provider: Arc::new(FakeDiskInfoProvider(true)),
        active_pods: Arc::new(FakeActivePods(vec![violator])),
        pod_cleaned_up: Arc::new(AlwaysCleanedUp),
        kill_pod: kill_pod.clone(),
        event_recorder: Arc::new(NoopEventRecorder),
        image_gc: Arc::new(CountingImageGc::default()),
        container_gc: Arc::new(CountingContainerGc::default()),
        notifier_factory: None,
    };
    let manager = Manager::new(config, deps, Arc::new(SystemClock)).unwrap();

    let evicted = manager.synchronize().await;
    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].uid, "scratch-heavy");

    let after = eviction_manager::metrics::EVICTIONS
        .with_label_values(&[&Signal::EmptyDirFsLimit.to_string()])
        .get();
    assert_eq!(after, before + 1);
}

// Scenario C from spec.md §8: node-level reclaim relieves image-FS
// pressure, so the tick returns with nothing evicted and DiskPressure still
// reported for the transition window.
#[tokio::test]
async fn reclaim_relieving_pressure_skips_eviction() {
    let threshold = Threshold {
        signal: Signal::ImagefsAvailable,
        value: Quantity::Absolute(500 * MIB),
        grace_period: Duration::ZERO,
        min_reclaim: Some(Quantity::Absolute(100 * MIB)),
    };

    let mut low = healthy_node_stats();
    low.imagefs.as_mut().unwrap().available_bytes = 100 * MIB;
    let mut recovered = healthy_node_stats();
    recovered.imagefs.as_mut().unwrap().available_bytes = 900 * MIB;

    let summary_low = Summary {
        timestamp: SystemTime::UNIX_EPOCH,
        node: low,
        pods: HashMap::new(),
        in_allocatable_scope: vec![],
    };
    let summary_recovered = Summary {
        timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(1),
        node: recovered,
        pods: HashMap::new(),
        in_allocatable_scope: vec![],
    };

    let image_gc = Arc::new(CountingImageGc::default());
    let container_gc = Arc::new(CountingContainerGc::default());
    let kill_pod = Arc::new(RecordingKillPod::default());

    let config = base_config(vec![threshold], false);
    let deps = ManagerDeps {
        summary_provider: Arc::new(FakeSummaryProvider::queue(vec![summary_low, summary_recovered])),
        disk_info_provider: Arc::new(FakeDiskInfoProvider(true)),
        active_pods: Arc::new(FakeActivePods(vec![])),
        pod_cleaned_up: Arc::new(AlwaysCleanedUp),
        kill_pod: kill_pod.clone(),
        event_recorder: Arc::new(NoopEventRecorder),
        image_gc: image_gc.clone(),
        container_gc: container_gc.clone(),
        notifier_factory: None,
    };
    let manager = Manager::new(config, deps, Arc::new(SystemClock)).unwrap();

    let evicted = manager.synchronize().await;
    assert!(evicted.is_empty());
    assert!(kill_pod.killed.lock().is_empty());
    assert_eq!(image_gc.0.load(Ordering::SeqCst), 1);
    assert_eq!(container_gc.0.load(Ordering::SeqCst), 1);
    assert!(manager.is_under_disk_pressure());
}

// Scenario F from spec.md §8: once DiskPressure is active, the admission
// gate rejects every non-critical workload and admits critical ones.
#[tokio::test]
async fn admission_rejects_under_disk_pressure_except_critical() {
    let threshold = Threshold {
        signal: Signal::NodefsAvailable,
        value: Quantity::Absolute(500 * MIB),
        grace_period: Duration::ZERO,
        min_reclaim: None,
    };

    let mut node = healthy_node_stats();
    node.nodefs.available_bytes = 10 * MIB;

    let summary = Summary {
        timestamp: SystemTime::UNIX_EPOCH,
        node,
        pods: HashMap::new(),
        in_allocatable_scope: vec![],
    };

    let config = base_config(vec![threshold], false);
    let deps = ManagerDeps {
        summary_provider: Arc::new(FakeSummaryProvider::queue(vec![summary.clone(), summary])),
        disk_info_provider: Arc::new(FakeDiskInfoProvider(true)),
        active_pods: Arc::new(FakeActivePods(vec![])),
        pod_cleaned_up: Arc::new(AlwaysCleanedUp),
        kill_pod: Arc::new(RecordingKillPod::default()),
        event_recorder: Arc::new(NoopEventRecorder),
        image_gc: Arc::new(CountingImageGc::default()),
        container_gc: Arc::new(CountingContainerGc::default()),
        notifier_factory: None,
    };
    let manager = Manager::new(config, deps, Arc::new(SystemClock)).unwrap();
    manager.synchronize().await;
    assert!(manager.is_under_disk_pressure());

    let handle = manager.admission_handle();
    let newcomer = pod("newcomer", QosClass::Guaranteed, 10 * MIB);
    assert!(matches!(handle.admit(&newcomer), AdmissionResult::Reject { .. }));

    let mut critical = pod("critical", QosClass::BestEffort, 0);
    critical.critical_by_annotation = true;
    assert!(matches!(handle.admit(&critical), AdmissionResult::Admit));
}

//! Control loop and bookkeeping (`spec.md` §4.7, component H): the piece
//! that wires every other module together under the single readers-writer
//! barrier named in §5. Modeled on the iteration/sleep-with-cancellation
//! shape of `disk_usage_eviction_task`, generalized to fuse periodic ticks
//! with edge-triggered notifier callbacks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

use crate::admission::AdmissionHandle;
use crate::clock::Clock;
use crate::config::EvictionManagerConfig;
use crate::evaluator::Evaluator;
use crate::events::EventRecorder;
use crate::executor::{grace_period_override, Executor};
use crate::gc::{ContainerGc, ImageGc};
use crate::kill::{ActivePods, KillPod, PodCleanedUp};
use crate::local_storage::find_violations;
use crate::notifier::{CgroupNotifier, CgroupNotifierFactory};
use crate::observation::observe;
use crate::pods::Pod;
use crate::ranking::{rank, Candidate};
use crate::signal::{NodeCondition, Signal};
use crate::stats::{DiskInfoProvider, PodStats, Summary, SummaryProvider};
use crate::threshold::Threshold;

/// Everything mutated only by [`Manager::synchronize`], behind the single
/// readers–writer barrier. Reads by `is_under_*_pressure` and by the
/// admission gate take the read side and never block writers observably
/// beyond one critical section (`spec.md` §5).
pub struct ManagerState {
    pub(crate) evaluator: Evaluator,
    pub(crate) conditions: HashSet<NodeCondition>,
    pub(crate) dedicated_image_fs: Option<bool>,
}

impl Default for ManagerState {
    fn default() -> Self {
        Self {
            evaluator: Evaluator::new(),
            conditions: HashSet::new(),
            dedicated_image_fs: None,
        }
    }
}

/// External collaborators the manager is built from — every trait named
/// out of scope in `spec.md` §1/§6.
pub struct ManagerDeps {
    pub summary_provider: Arc<dyn SummaryProvider>,
    pub disk_info_provider: Arc<dyn DiskInfoProvider>,
    pub active_pods: Arc<dyn ActivePods>,
    pub pod_cleaned_up: Arc<dyn PodCleanedUp>,
    pub kill_pod: Arc<dyn KillPod>,
    pub event_recorder: Arc<dyn EventRecorder>,
    pub image_gc: Arc<dyn ImageGc>,
    pub container_gc: Arc<dyn ContainerGc>,
    /// Absent when kernel cgroup memory notification isn't wired up; the
    /// manager then falls back to periodic polling alone.
    pub notifier_factory: Option<Arc<dyn CgroupNotifierFactory>>,
}

pub struct Manager {
    config: EvictionManagerConfig,
    deps: ManagerDeps,
    clock: Arc<dyn Clock>,
    state: Arc<RwLock<ManagerState>>,
    notifiers: RwLock<HashMap<Signal, Arc<dyn CgroupNotifier>>>,
}

impl Manager {
    /// Validates `config` (`SPEC_FULL.md` §4.10) before constructing the
    /// manager, so a misconfigured threshold list is rejected at startup
    /// rather than silently misbehaving at tick time.
    pub fn new(config: EvictionManagerConfig, deps: ManagerDeps, clock: Arc<dyn Clock>) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            deps,
            clock,
            state: Arc::new(RwLock::new(ManagerState::default())),
            notifiers: RwLock::new(HashMap::new()),
        })
    }

    /// Resolves the cyclic-wiring note in `spec.md` §9: the admission gate
    /// gets a read-only capability surface rather than a back-reference to
    /// the manager.
    pub fn admission_handle(&self) -> AdmissionHandle {
        AdmissionHandle::new(self.state.clone(), self.config.system_critical_priority)
    }

    pub fn is_under_memory_pressure(&self) -> bool {
        self.state.read().conditions.contains(&NodeCondition::MemoryPressure)
    }

    pub fn is_under_disk_pressure(&self) -> bool {
        self.state.read().conditions.contains(&NodeCondition::DiskPressure)
    }

    pub fn is_under_pid_pressure(&self) -> bool {
        self.state.read().conditions.contains(&NodeCondition::PidPressure)
    }

    /// The control loop (`spec.md` §4.7). Spawns the notifier-refresh and
    /// per-notifier watch tasks, then runs the tick/sleep loop itself until
    /// `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        self.ensure_notifiers().await;
        for (signal, notifier) in self.notifiers.read().iter() {
            let manager = self.clone();
            let notifier = notifier.clone();
            let signal = *signal;
            let cancel = cancel.clone();
            tokio::spawn(async move {
                manager.run_notifier_watch(signal, notifier, cancel).await;
            });
        }

        {
            let manager = self.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                manager.run_notifier_refresh(cancel).await;
            });
        }

        let mut iteration_no: u64 = 0;
        loop {
            iteration_no += 1;
            let start = Instant::now();

            let evicted = self
                .synchronize()
                .instrument(info_span!("synchronize", iteration_no))
                .await;

            if !evicted.is_empty() {
                self.wait_for_cleanup(&evicted, &cancel).await;
            } else {
                let sleep_until = start + self.config.monitoring_interval;
                if tokio::time::timeout_at(sleep_until, cancel.cancelled()).await.is_ok() {
                    info!("eviction manager control loop shutting down");
                    return;
                }
            }
        }
    }

    async fn run_notifier_watch(&self, signal: Signal, notifier: Arc<dyn CgroupNotifier>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                res = notifier.watch() => {
                    match res {
                        Ok(()) => {
                            debug!(%signal, "cgroup notifier fired, re-synchronizing");
                            self.synchronize().await;
                        }
                        Err(e) => {
                            warn!(%signal, "cgroup notifier watch failed: {e:#}");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn run_notifier_refresh(&self, cancel: CancellationToken) {
        loop {
            let sleep_until = Instant::now() + self.config.notifier_refresh_interval;
            if tokio::time::timeout_at(sleep_until, cancel.cancelled()).await.is_ok() {
                return;
            }
            let summary = match self.deps.summary_provider.get(false).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("notifier refresh: failed to fetch stats summary: {e:#}");
                    continue;
                }
            };
            let notifiers = self.notifiers.read();
            for (signal, notifier) in notifiers.iter() {
                if let Err(e) = notifier.update_threshold(&summary).await {
                    warn!(%signal, "failed to refresh notifier threshold: {e:#}");
                }
            }
        }
    }

    /// Creates one notifier per configured memory threshold, if kernel
    /// cgroup memory notification is enabled and a factory was supplied.
    /// Failure to create a notifier for one threshold is logged and the
    /// manager proceeds without async notification for it (`spec.md` §7).
    async fn ensure_notifiers(&self) {
        if !self.config.kernel_memcg_notification {
            return;
        }
        let Some(factory) = &self.deps.notifier_factory else {
            return;
        };
        let memory_thresholds: Vec<_> = self
            .config
            .thresholds
            .iter()
            .filter(|t| matches!(t.signal, Signal::MemoryAvailable | Signal::AllocatableMemoryAvailable))
            .collect();

        let mut notifiers = self.notifiers.write();
        for threshold in memory_thresholds {
            if notifiers.contains_key(&threshold.signal) {
                continue;
            }
            match factory.new_cgroup_notifier(&self.config.pod_cgroup_root, threshold) {
                Ok(n) => {
                    notifiers.insert(threshold.signal, n);
                }
                Err(e) => {
                    warn!(signal = %threshold.signal, "failed to create cgroup notifier: {e:#}");
                }
            }
        }
    }

    /// One tick: sample, evaluate, mutate state, act (`spec.md` §5, §4.7).
    /// Acting happens outside the write barrier so kills cannot deadlock
    /// with admission queries. Never propagates an error; a failure at any
    /// stage is logged and the tick returns no evicted pods.
    #[instrument(skip(self))]
    pub async fn synchronize(&self) -> Vec<Pod> {
        let now = self.clock.now();

        let summary = match self.deps.summary_provider.get(true).await {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to fetch stats summary: {e:#}");
                return vec![];
            }
        };
        let dedicated_image_fs = self.dedicated_image_fs(&summary).await;
        let observations = observe(&summary);
        let active_pods = self.deps.active_pods.active_pods().await;

        let actionable = {
            let mut state = self.state.write();
            let result = state.evaluator.evaluate(
                &self.config.thresholds,
                &observations,
                now,
                self.config.pressure_transition_period,
            );
            state.conditions = result.conditions;
            result.actionable
        };

        for t in &actionable {
            if let Some(obs) = observations.get(&t.signal) {
                let age = crate::clock::elapsed_since(now, obs.timestamp);
                crate::metrics::EVICTION_STATS_AGE_SECONDS
                    .with_label_values(&[&t.signal.to_string()])
                    .observe(age.as_secs_f64());
            }
        }

        if self.config.local_storage_capacity_isolation {
            let stats_by_uid: HashMap<String, PodStats> = active_pods
                .iter()
                .filter_map(|p| summary.stats_for(&p.uid).map(|s| (p.uid.clone(), s.clone())))
                .collect();
            let violations = find_violations(&active_pods, &stats_by_uid, dedicated_image_fs);
            if !violations.is_empty() {
                return self.evict_local_storage_violators(&active_pods, violations).await;
            }
        }

        // Highest-priority unsatisfied threshold: signals are declared in a
        // fixed precedence order (memory, allocatable memory, disk/image
        // bytes, disk/image inodes, pid) and `Signal`'s derived `Ord`
        // matches that order, so the smallest signal wins (decision
        // recorded in DESIGN.md — the spec names the concept but not the
        // tie-break).
        let Some(threshold) = actionable.iter().min_by_key(|t| t.signal).cloned() else {
            return vec![];
        };

        self.deps.event_recorder.eventf(
            crate::events::NODE_OBJECT_REF,
            crate::events::EventType::Warning,
            crate::events::THRESHOLD_MET_REASON,
            format!(
                "Attempting to reclaim resources to relieve {} pressure on signal {}",
                threshold.signal.node_condition().map_or("unknown".to_string(), |c| format!("{c:?}")),
                threshold.signal
            ),
        );

        crate::reclaim::run_reclaim(
            &crate::reclaim::reclaim_actions_for(threshold.signal, dedicated_image_fs),
            self.deps.image_gc.as_ref(),
            self.deps.container_gc.as_ref(),
        )
        .await;

        let summary2 = match self.deps.summary_provider.get(true).await {
            Ok(s) => s,
            Err(e) => {
                warn!("failed to re-fetch stats summary after reclaim: {e:#}");
                return vec![];
            }
        };
        let observations2 = observe(&summary2);
        if crate::evaluator::met(std::slice::from_ref(&threshold), &observations2, true).is_empty() {
            debug!(signal = %threshold.signal, "reclaim relieved pressure, no eviction needed this tick");
            return vec![];
        }

        self.evict_for_threshold(&threshold, &active_pods, &summary2, dedicated_image_fs).await
    }

    async fn dedicated_image_fs(&self, _summary: &Summary) -> bool {
        if let Some(v) = self.state.read().dedicated_image_fs {
            return v;
        }
        match self.deps.disk_info_provider.has_dedicated_image_fs().await {
            Ok(v) => {
                self.state.write().dedicated_image_fs = Some(v);
                v
            }
            Err(e) => {
                warn!("dedicated image filesystem probe failed: {e:#}");
                false
            }
        }
    }

    fn executor(&self) -> Executor<'_> {
        Executor {
            kill_pod: self.deps.kill_pod.as_ref(),
            event_recorder: self.deps.event_recorder.as_ref(),
            features: self.config.features,
            system_critical_priority: self.config.system_critical_priority,
        }
    }

    /// Threshold eviction path (D then G on exactly one victim, `spec.md`
    /// §4.3/§4.6). Ranks the non-exempt pods and evicts only the top
    /// candidate; a kill failure ends the tick without trying the next one
    /// (`spec.md` §7 — that retry-next-candidate behavior is reserved for
    /// the local-storage path). Takes the specific `Threshold` that became
    /// actionable rather than just its signal, so hardness/grace period
    /// come from the threshold that actually fired — not from whichever
    /// configured threshold for this signal happens to be hard, which would
    /// be wrong when a signal has both a hard and a soft threshold
    /// configured and only the soft one is met.
    async fn evict_for_threshold(&self, threshold: &Threshold, pods: &[Pod], summary: &Summary, dedicated_image_fs: bool) -> Vec<Pod> {
        let signal = &threshold.signal;
        let condition = signal.node_condition();
        let candidates_stats: Vec<(&Pod, &PodStats)> = pods
            .iter()
            .filter(|p| !p.is_critical(self.config.system_critical_priority))
            .filter_map(|p| summary.stats_for(&p.uid).map(|s| (p, s)))
            .collect();
        let mut candidates: Vec<Candidate<'_>> = candidates_stats
            .iter()
            .map(|(pod, stats)| Candidate { pod, stats })
            .collect();

        if let Err(e) = rank(*signal, &mut candidates, dedicated_image_fs, self.config.use_requested) {
            warn!(%signal, "no ranking comparator for signal: {e:#}");
            return vec![];
        }

        let Some(victim) = candidates.first() else {
            debug!(%signal, "no evictable candidates for this signal");
            return vec![];
        };

        let grace_period = grace_period_override(threshold.is_hard(), self.config.max_pod_grace_period_seconds);
        let message = format!("The node had condition {condition:?} from signal {signal}, evicting pod to reclaim resources.");

        let pod: Pod = victim.pod.clone();
        if self.executor().evict(&pod, grace_period, message, *signal, condition).await {
            vec![pod]
        } else {
            vec![]
        }
    }

    /// Local-storage path (F + G, `spec.md` §4.5): every violating workload
    /// from this pass is attempted; a kill failure for one does not stop
    /// the rest.
    async fn evict_local_storage_violators(
        &self,
        pods: &[Pod],
        violations: Vec<crate::local_storage::LocalStorageViolation>,
    ) -> Vec<Pod> {
        let by_uid: HashMap<&str, &Pod> = pods.iter().map(|p| (p.uid.as_str(), p)).collect();
        let mut evicted = Vec::new();

        for violation in violations {
            let Some(&pod) = by_uid.get(violation.pod_uid.as_str()) else {
                continue;
            };
            if pod.is_critical(self.config.system_critical_priority) {
                continue;
            }
            let grace_period = Duration::from_secs(self.config.max_pod_grace_period_seconds as u64);
            if self
                .executor()
                .evict(pod, grace_period, violation.message, violation.signal, None)
                .await
            {
                evicted.push(pod.clone());
            }
        }

        evicted
    }

    /// `waitForCleanup(evicted, timeout=30s, poll=1s)` (`spec.md` §4.7).
    async fn wait_for_cleanup(&self, evicted: &[Pod], cancel: &CancellationToken) {
        let deadline = Instant::now() + self.config.pod_cleanup_timeout;
        loop {
            let mut all_gone = true;
            for pod in evicted {
                if !self.deps.pod_cleaned_up.pod_cleaned_up(pod).await {
                    all_gone = false;
                    break;
                }
            }
            if all_gone {
                return;
            }
            if Instant::now() >= deadline {
                warn!(count = evicted.len(), "timed out waiting for evicted pods to clean up");
                return;
            }
            if tokio::time::timeout_at(Instant::now() + Duration::from_secs(1), cancel.cancelled())
                .await
                .is_ok()
            {
                return;
            }
        }
    }
}

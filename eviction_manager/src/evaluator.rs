//! Threshold evaluator (`spec.md` §4.2, component C): applies eviction
//! thresholds, grace periods, min-reclaim, and the node-condition transition
//! window; produces the active node conditions and the grace-period-passed
//! threshold set that downstream components act on.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, SystemTime};

use crate::clock::elapsed_since;
use crate::observation::Observations;
use crate::signal::{NodeCondition, Signal};
use crate::threshold::{merge_thresholds, Threshold};

/// `met(T, O, enforceMinReclaim)` from `spec.md` §4.2.
pub fn met(thresholds: &[Threshold], observations: &Observations, enforce_min_reclaim: bool) -> Vec<Threshold> {
    thresholds
        .iter()
        .filter(|t| {
            let Some(obs) = observations.get(&t.signal) else {
                return false;
            };
            let Some(value) = t.value.resolve(obs.capacity) else {
                return false;
            };
            let slack = if enforce_min_reclaim {
                t.min_reclaim.and_then(|q| q.resolve(obs.capacity)).unwrap_or(0)
            } else {
                0
            };
            obs.available < value.saturating_sub(slack)
        })
        .cloned()
        .collect()
}

/// `thresholdsUpdatedStats(T, O, Olast)` from `spec.md` §4.2: keeps only
/// thresholds whose observation timestamp strictly advanced since the last
/// tick, so a stale (re-delivered) snapshot can't be acted on twice.
pub fn thresholds_updated_stats(
    thresholds: &[Threshold],
    observations: &Observations,
    last_observations: &Observations,
) -> Vec<Threshold> {
    thresholds
        .iter()
        .filter(|t| {
            let Some(now_obs) = observations.get(&t.signal) else {
                return false;
            };
            match last_observations.get(&t.signal) {
                Some(last) => now_obs.timestamp > last.timestamp,
                None => true,
            }
        })
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
pub struct Evaluator {
    first_observed_at: HashMap<Signal, SystemTime>,
    last_observed_condition_at: HashMap<NodeCondition, SystemTime>,
    /// Thresholds that passed their grace period on some prior tick and have
    /// not yet been resolved by min-reclaim headroom.
    currently_met: Vec<Threshold>,
    last_observations: Observations,
}

#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Thresholds that have passed their grace period and are eligible to
    /// drive node-level reclaim / eviction this tick.
    pub actionable: Vec<Threshold>,
    /// Node conditions to report right now, including the transition-window
    /// hold-over (`spec.md` §4.2, §8 invariant 2).
    pub conditions: HashSet<NodeCondition>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick of the evaluator (`spec.md` §4.2). `thresholds` is the
    /// full configured threshold list; `observations` is this tick's
    /// snapshot-derived data.
    pub fn evaluate(
        &mut self,
        thresholds: &[Threshold],
        observations: &Observations,
        now: SystemTime,
        transition_period: Duration,
    ) -> EvaluationResult {
        let newly_met = met(thresholds, observations, false);

        let combined = if self.currently_met.is_empty() {
            newly_met
        } else {
            let not_yet_resolved = met(&self.currently_met, observations, true);
            merge_thresholds(&newly_met, &not_yet_resolved)
        };

        let stats_current = thresholds_updated_stats(&combined, observations, &self.last_observations);

        // Node conditions react immediately on breach, independent of grace
        // period: this is what lets the scheduler/admission path see
        // pressure right away even while a soft threshold is still counting
        // down (decision recorded in DESIGN.md).
        let conditions_now: HashSet<NodeCondition> = stats_current
            .iter()
            .filter_map(|t| t.signal.node_condition())
            .collect();
        for c in &conditions_now {
            self.last_observed_condition_at.insert(*c, now);
        }
        let conditions = self
            .last_observed_condition_at
            .iter()
            .filter(|(_, at)| elapsed_since(now, **at) < transition_period)
            .map(|(c, _)| *c)
            .collect();

        // firstObservedAt bookkeeping: set on first continuous observation,
        // cleared the instant a signal drops out of the met set (§3
        // invariant).
        let stats_current_signals: HashSet<Signal> = stats_current.iter().map(|t| t.signal).collect();
        self.first_observed_at
            .retain(|signal, _| stats_current_signals.contains(signal));
        for t in &stats_current {
            self.first_observed_at.entry(t.signal).or_insert(now);
        }

        let actionable: Vec<Threshold> = stats_current
            .into_iter()
            .filter(|t| {
                t.is_hard()
                    || self
                        .first_observed_at
                        .get(&t.signal)
                        .is_some_and(|first| elapsed_since(now, *first) >= t.grace_period)
            })
            .collect();

        self.currently_met = actionable.clone();
        self.last_observations = observations.clone();

        EvaluationResult { actionable, conditions }
    }

    #[cfg(test)]
    pub fn first_observed_at(&self, signal: Signal) -> Option<SystemTime> {
        self.first_observed_at.get(&signal).copied()
    }
}

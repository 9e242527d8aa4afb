//! Admission gate (`spec.md` §4.8, component I). Read-only: never mutates
//! manager state, only reads the currently active node conditions.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::manager::ManagerState;
use crate::pods::{Pod, MEMORY_PRESSURE_TAINT_KEY};
use crate::signal::NodeCondition;

#[derive(Debug, Clone)]
pub enum AdmissionResult {
    Admit,
    Reject { reason: String, message: String },
}

/// A read-only capability surface on the manager, handed to the admission
/// subsystem instead of a back-reference to the manager itself — resolves
/// the cyclic-wiring note in `spec.md` §9. Shares the manager's single
/// readers-writer barrier rather than owning a copy of its state.
#[derive(Clone)]
pub struct AdmissionHandle {
    pub(crate) state: Arc<RwLock<ManagerState>>,
    pub(crate) system_critical_priority: i32,
}

impl AdmissionHandle {
    pub(crate) fn new(state: Arc<RwLock<ManagerState>>, system_critical_priority: i32) -> Self {
        Self { state, system_critical_priority }
    }

    pub fn admit(&self, pod: &Pod) -> AdmissionResult {
        let guard = self.state.read();
        let conditions = &guard.conditions;

        if conditions.is_empty() {
            return AdmissionResult::Admit;
        }
        if pod.is_critical(self.system_critical_priority) {
            return AdmissionResult::Admit;
        }

        if conditions.len() == 1 && conditions.contains(&NodeCondition::MemoryPressure) {
            if pod.qos_class != crate::pods::QosClass::BestEffort {
                return AdmissionResult::Admit;
            }
            if pod
                .tolerations
                .iter()
                .any(|t| t.tolerates_no_schedule(MEMORY_PRESSURE_TAINT_KEY))
            {
                return AdmissionResult::Admit;
            }
            return AdmissionResult::Reject {
                reason: "MemoryPressure".to_string(),
                message: "node has memory pressure and pod does not tolerate it".to_string(),
            };
        }

        let names: Vec<&str> = conditions
            .iter()
            .map(|c| match c {
                NodeCondition::MemoryPressure => "MemoryPressure",
                NodeCondition::DiskPressure => "DiskPressure",
                NodeCondition::PidPressure => "PIDPressure",
            })
            .collect();
        AdmissionResult::Reject {
            reason: "NodePressure".to_string(),
            message: format!("node has active conditions: {}", names.join(", ")),
        }
    }
}

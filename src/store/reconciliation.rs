//! Order-insensitive diffing of stored versus device-reported rules.

use crate::model::flow_rule::{FlowId, FlowRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Discrepancies found while reconciling a device's reported rules against
/// the store. Detection only: re-applying missing rules or force-removing
/// extraneous ones is deployment policy layered above the core.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReconciliation {
    /// Confirmed (`Added`) rules the device no longer reports. Candidates
    /// for re-push; never auto-deleted, the device may not have converged.
    pub missing: Vec<FlowRule>,
    /// Rules the device reports that the controller never authorized.
    /// Flagged for provider-initiated removal, not silently adopted.
    pub extraneous: Vec<FlowRule>,
}

impl FlowReconciliation {
    pub fn is_converged(&self) -> bool {
        self.missing.is_empty() && self.extraneous.is_empty()
    }
}

/// Symmetric difference of two rule sequences keyed by identity.
pub(crate) struct FlowDiff {
    /// Device-reported instances whose identity the store knows.
    pub(crate) known: Vec<FlowRule>,
    /// Stored snapshots the device did not report.
    pub(crate) unreported: Vec<FlowRule>,
    /// Device-reported instances unknown to the store.
    pub(crate) extraneous: Vec<FlowRule>,
}

pub(crate) fn diff_by_identity(stored: &[FlowRule], observed: Vec<FlowRule>) -> FlowDiff {
    let stored_ids: HashSet<FlowId> = stored.iter().map(FlowRule::id).collect();
    let observed_ids: HashSet<FlowId> = observed.iter().map(FlowRule::id).collect();

    let (known, extraneous) = observed
        .into_iter()
        .partition(|rule| stored_ids.contains(&rule.id()));
    let unreported = stored
        .iter()
        .filter(|rule| !observed_ids.contains(&rule.id()))
        .cloned()
        .collect();

    FlowDiff {
        known,
        unreported,
        extraneous,
    }
}

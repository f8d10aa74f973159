//! Authoritative per-device flow-rule tables and their state transitions.

use crate::model::flow_rule::{FlowId, FlowRule, FlowRuleState};
use crate::model::ids::DeviceId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outcome of a north-facing store request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StoreResult {
    /// The rule was unknown and is now recorded as `PendingAdd`.
    Inserted,
    /// A rule of the same identity already existed; counters were merged.
    /// `updated` reports whether any observed field actually changed.
    Refreshed { updated: bool },
}

/// Outcome of a north-facing removal request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RemoveResult {
    /// The entry exists and is now `PendingRemove`.
    Marked,
    /// No entry of this identity is known; removal is a no-op.
    NotFound,
}

/// Concrete transition taken when a device-reported rule is merged in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlowTransition {
    /// First confirmation the device carries this rule; entry is now `Added`.
    Confirmed,
    /// The entry was already `Added`; counters were merged.
    Refreshed { changed: bool },
    /// A stale south add arrived for a `PendingRemove` entry; the device's
    /// explicit confirmation wins and the entry returns to `Added`.
    Restored,
}

struct StoredEntry {
    ordinal: u64,
    rule: FlowRule,
}

#[derive(Default)]
struct DeviceTable {
    entries: HashMap<FlowId, StoredEntry>,
    next_ordinal: u64,
}

type DeviceTables = Mutex<HashMap<DeviceId, Arc<Mutex<DeviceTable>>>>;

/// Per-device flow-rule state, keyed by rule identity.
///
/// The outer map lock is held only long enough to resolve a device's table;
/// all mutation happens under that device's own lock, so operations on
/// different devices never contend. The manager reads through this store
/// for every decision and holds no copy of its own.
pub(crate) struct FlowRuleStore {
    devices: DeviceTables,
}

impl FlowRuleStore {
    pub(crate) fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
        }
    }

    async fn device_table(&self, device: &DeviceId) -> Arc<Mutex<DeviceTable>> {
        let mut devices = self.devices.lock().await;
        devices
            .entry(device.clone())
            .or_insert_with(|| Arc::new(Mutex::new(DeviceTable::default())))
            .clone()
    }

    async fn existing_table(&self, device: &DeviceId) -> Option<Arc<Mutex<DeviceTable>>> {
        self.devices.lock().await.get(device).cloned()
    }

    /// Current known rules for a device, in insertion order. Empty when the
    /// device is unknown.
    pub(crate) async fn flow_entries(&self, device: &DeviceId) -> Vec<FlowRule> {
        let Some(table) = self.existing_table(device).await else {
            return Vec::new();
        };
        let table = table.lock().await;
        let mut entries: Vec<_> = table.entries.values().collect();
        entries.sort_by_key(|entry| entry.ordinal);
        entries.iter().map(|entry| entry.rule.clone()).collect()
    }

    /// Records northbound intent to add a rule. An existing entry of the
    /// same identity is refreshed rather than duplicated.
    pub(crate) async fn store_flow_rule(&self, rule: FlowRule) -> StoreResult {
        let table = self.device_table(rule.device()).await;
        let mut table = table.lock().await;

        if let Some(entry) = table.entries.get_mut(&rule.id()) {
            let updated = entry.rule.merge_counters(&rule);
            return StoreResult::Refreshed { updated };
        }

        let ordinal = table.next_ordinal;
        table.next_ordinal += 1;
        table.entries.insert(
            rule.id(),
            StoredEntry {
                ordinal,
                rule: rule.with_state(FlowRuleState::PendingAdd),
            },
        );
        StoreResult::Inserted
    }

    /// Records northbound intent to remove a rule. The entry stays in the
    /// store as `PendingRemove` until the south confirms eviction.
    pub(crate) async fn delete_flow_rule(&self, rule: &FlowRule) -> RemoveResult {
        let Some(table) = self.existing_table(rule.device()).await else {
            return RemoveResult::NotFound;
        };
        let mut table = table.lock().await;

        match table.entries.get_mut(&rule.id()) {
            Some(entry) => {
                entry.rule.set_state(FlowRuleState::PendingRemove);
                RemoveResult::Marked
            }
            None => RemoveResult::NotFound,
        }
    }

    /// Merges a device-reported rule. Unknown rules are adopted directly as
    /// `Added`: the device is authoritative for confirmed state.
    pub(crate) async fn add_or_update_flow_rule(&self, rule: FlowRule) -> FlowTransition {
        let table = self.device_table(rule.device()).await;
        let mut table = table.lock().await;

        if let Some(entry) = table.entries.get_mut(&rule.id()) {
            let changed = entry.rule.merge_counters(&rule);
            return match entry.rule.state() {
                FlowRuleState::Added => FlowTransition::Refreshed { changed },
                FlowRuleState::PendingRemove => {
                    entry.rule.set_state(FlowRuleState::Added);
                    FlowTransition::Restored
                }
                _ => {
                    entry.rule.set_state(FlowRuleState::Added);
                    FlowTransition::Confirmed
                }
            };
        }

        let ordinal = table.next_ordinal;
        table.next_ordinal += 1;
        table.entries.insert(
            rule.id(),
            StoredEntry {
                ordinal,
                rule: rule.with_state(FlowRuleState::Added),
            },
        );
        FlowTransition::Confirmed
    }

    /// Evicts a rule on device-confirmed removal. Returns the final
    /// `Removed` snapshot, or `None` when the identity was never known —
    /// out-of-band and repeated south removals are no-ops.
    pub(crate) async fn remove_flow_rule(&self, rule: &FlowRule) -> Option<FlowRule> {
        let table = self.existing_table(rule.device()).await?;
        let mut table = table.lock().await;
        table.entries.remove(&rule.id()).map(|entry| {
            let mut removed = entry.rule;
            removed.set_state(FlowRuleState::Removed);
            removed
        })
    }

    /// Marks a rule as failed on a southbound error report. Only pending
    /// operations can fail: a confirmed `Added` entry is left untouched, the
    /// device has already accepted it.
    pub(crate) async fn mark_rule_failed(&self, rule: &FlowRule) -> bool {
        let Some(table) = self.existing_table(rule.device()).await else {
            return false;
        };
        let mut table = table.lock().await;
        match table.entries.get_mut(&rule.id()) {
            Some(entry) => match entry.rule.state() {
                FlowRuleState::PendingAdd | FlowRuleState::PendingRemove => {
                    entry.rule.set_state(FlowRuleState::Failed);
                    true
                }
                _ => false,
            },
            None => false,
        }
    }
}

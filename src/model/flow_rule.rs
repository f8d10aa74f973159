//! Flow-rule data model and the identity tuple that defines deduplication.

use crate::model::ids::{ApplicationId, DeviceId};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Match criteria of a flow rule. Equality is order-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrafficSelector {
    criteria: BTreeSet<String>,
}

impl TrafficSelector {
    pub fn matching<I, S>(criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            criteria: criteria.into_iter().map(Into::into).collect(),
        }
    }

    pub fn criteria(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(String::as_str)
    }
}

/// Action set of a flow rule. Instruction order is significant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrafficTreatment {
    instructions: Vec<String>,
}

impl TrafficTreatment {
    pub fn acting<I, S>(instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instructions: instructions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn instructions(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().map(String::as_str)
    }
}

/// Lifecycle state of a flow rule.
///
/// `PendingAdd`/`PendingRemove` record northbound intent; `Added` and
/// `Removed` are asserted only on southbound confirmation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowRuleState {
    Created,
    PendingAdd,
    Added,
    PendingRemove,
    Removed,
    Failed,
}

/// Stable 64-bit key derived from a rule's identity fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(u64);

impl Display for FlowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A match-action forwarding directive on one device.
///
/// Identity (and therefore equality and hashing) covers device, selector,
/// treatment, priority, and owning application. State and counters are
/// observed data and never participate in identity: two rules with equal
/// identity fields are the same rule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowRule {
    id: FlowId,
    device: DeviceId,
    selector: TrafficSelector,
    treatment: TrafficTreatment,
    priority: u16,
    app_id: ApplicationId,
    state: FlowRuleState,
    packets: u64,
    bytes: u64,
    life_secs: u64,
}

impl FlowRule {
    pub fn new(
        device: DeviceId,
        selector: TrafficSelector,
        treatment: TrafficTreatment,
        priority: u16,
        app_id: ApplicationId,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        device.hash(&mut hasher);
        selector.hash(&mut hasher);
        treatment.hash(&mut hasher);
        priority.hash(&mut hasher);
        app_id.hash(&mut hasher);

        Self {
            id: FlowId(hasher.finish()),
            device,
            selector,
            treatment,
            priority,
            app_id,
            state: FlowRuleState::Created,
            packets: 0,
            bytes: 0,
            life_secs: 0,
        }
    }

    pub fn with_state(mut self, state: FlowRuleState) -> Self {
        self.state = state;
        self
    }

    pub fn with_counters(mut self, packets: u64, bytes: u64, life_secs: u64) -> Self {
        self.packets = packets;
        self.bytes = bytes;
        self.life_secs = life_secs;
        self
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn selector(&self) -> &TrafficSelector {
        &self.selector
    }

    pub fn treatment(&self) -> &TrafficTreatment {
        &self.treatment
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn app_id(&self) -> &ApplicationId {
        &self.app_id
    }

    pub fn state(&self) -> FlowRuleState {
        self.state
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn life_secs(&self) -> u64 {
        self.life_secs
    }

    pub(crate) fn set_state(&mut self, state: FlowRuleState) {
        self.state = state;
    }

    /// Copies device-observed counters from a reported rule of the same
    /// identity. Returns whether any counter changed.
    pub(crate) fn merge_counters(&mut self, reported: &FlowRule) -> bool {
        let changed = self.packets != reported.packets
            || self.bytes != reported.bytes
            || self.life_secs != reported.life_secs;
        self.packets = reported.packets;
        self.bytes = reported.bytes;
        self.life_secs = reported.life_secs;
        changed
    }
}

impl PartialEq for FlowRule {
    fn eq(&self, other: &Self) -> bool {
        self.device == other.device
            && self.selector == other.selector
            && self.treatment == other.treatment
            && self.priority == other.priority
            && self.app_id == other.app_id
    }
}

impl Eq for FlowRule {}

impl Hash for FlowRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.device.hash(state);
        self.selector.hash(state);
        self.treatment.hash(state);
        self.priority.hash(state);
        self.app_id.hash(state);
    }
}

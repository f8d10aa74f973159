//! Flow-rule event records published to listeners.

use crate::model::flow_rule::FlowRule;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowRuleEventType {
    RuleAdded,
    RuleUpdated,
    RuleRemoved,
}

/// Immutable record of one committed flow-rule state transition.
///
/// Events are produced only by the manager, never by the store, and carry
/// a snapshot of the subject rule rather than a reference into store state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRuleEvent {
    event_type: FlowRuleEventType,
    subject: FlowRule,
}

impl FlowRuleEvent {
    pub(crate) fn new(event_type: FlowRuleEventType, subject: FlowRule) -> Self {
        Self {
            event_type,
            subject,
        }
    }

    pub fn event_type(&self) -> FlowRuleEventType {
        self.event_type
    }

    pub fn subject(&self) -> &FlowRule {
        &self.subject
    }
}

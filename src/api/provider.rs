//! Southbound driver capability set.

use crate::error::FlowRuleError;
use crate::model::flow_rule::FlowRule;
use crate::model::ids::{ApplicationId, ProviderId};
use async_trait::async_trait;

/// A southbound driver translating abstract flow-rule operations into a
/// device protocol.
///
/// Implementations are registered with the manager exactly once per
/// [`ProviderId`]. Calls arrive from a dedicated dispatch worker and are
/// fire-and-forget from the manager's perspective: the driver confirms
/// convergence later through its provider service handle.
#[async_trait]
pub trait FlowRuleProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn apply_flow_rule(&self, rules: &[FlowRule]) -> Result<(), FlowRuleError>;

    async fn remove_flow_rule(&self, rules: &[FlowRule]) -> Result<(), FlowRuleError>;

    async fn remove_rules_by_id(
        &self,
        app_id: &ApplicationId,
        rules: &[FlowRule],
    ) -> Result<(), FlowRuleError>;
}

//! Private callback handle through which a registered provider reports
//! device-observed flow events back into the core.

use crate::error::FlowRuleError;
use crate::manager::ManagerCore;
use crate::model::flow_rule::FlowRule;
use crate::model::ids::{DeviceId, ProviderId};
use crate::observability::events;
use crate::southbound::registry::RegistrationToken;
use crate::store::reconciliation::FlowReconciliation;
use std::sync::Arc;
use tracing::warn;

const COMPONENT: &str = "provider_service";

/// South-facing service handle bound to one provider registration.
///
/// Valid only while the owning provider remains registered: once the
/// provider is unregistered every call is rejected with
/// [`FlowRuleError::StaleProviderService`] before any store mutation.
pub struct FlowRuleProviderService {
    core: Arc<ManagerCore>,
    provider_id: ProviderId,
    token: RegistrationToken,
}

impl FlowRuleProviderService {
    pub(crate) fn new(
        core: Arc<ManagerCore>,
        provider_id: ProviderId,
        token: RegistrationToken,
    ) -> Self {
        Self {
            core,
            provider_id,
            token,
        }
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    fn ensure_registered(&self) -> Result<(), FlowRuleError> {
        if self.token.is_valid() {
            return Ok(());
        }
        warn!(
            event = events::STALE_PROVIDER_SERVICE,
            component = COMPONENT,
            provider = %self.provider_id,
            "rejecting call on stale provider service"
        );
        Err(FlowRuleError::StaleProviderService(self.provider_id.clone()))
    }

    /// Reports a rule the device carries. First confirmation emits
    /// `RuleAdded`; later reports of the same rule emit `RuleUpdated`.
    pub async fn flow_added(&self, rule: FlowRule) -> Result<(), FlowRuleError> {
        self.ensure_registered()?;
        self.core.handle_flow_added(rule).await
    }

    /// Reports device-confirmed removal. Unknown and already-removed rules
    /// are no-ops, tolerating at-least-once southbound delivery.
    pub async fn flow_removed(&self, rule: FlowRule) -> Result<(), FlowRuleError> {
        self.ensure_registered()?;
        self.core.handle_flow_removed(rule).await
    }

    /// Reports that the device rejected a pending operation; the entry is
    /// marked `Failed`.
    pub async fn flow_failed(&self, rule: FlowRule) -> Result<(), FlowRuleError> {
        self.ensure_registered()?;
        self.core.handle_flow_failed(rule).await
    }

    /// Reconciles a device's full reported rule set against the store and
    /// returns the discrepancies for higher-level policy.
    pub async fn push_flow_metrics(
        &self,
        device: DeviceId,
        observed: Vec<FlowRule>,
    ) -> Result<FlowReconciliation, FlowRuleError> {
        self.ensure_registered()?;
        self.core.handle_flow_metrics(device, observed).await
    }
}

//! Southbound command queue drained per provider by a dedicated worker.

use crate::api::provider::FlowRuleProvider;
use crate::model::flow_rule::FlowRule;
use crate::model::ids::{ApplicationId, ProviderId};
use crate::observability::events;
use crate::southbound::registry::RegistrationToken;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, warn};

const COMPONENT: &str = "southbound_dispatch";

/// Manager-initiated operation bound for one provider, batched per device.
#[derive(Clone, Debug)]
pub(crate) enum SouthboundCommand {
    Apply(Vec<FlowRule>),
    Remove(Vec<FlowRule>),
    RemoveByApp(ApplicationId, Vec<FlowRule>),
}

/// Drains a provider's command queue. Fire-and-forget from the manager's
/// perspective: per-command driver failures are logged per device and the
/// loop keeps going. The registration token is re-checked per command so
/// commands queued before unregistration never reach the provider.
pub(crate) async fn dispatch_loop(
    loop_id: String,
    provider_id: ProviderId,
    provider: Arc<dyn FlowRuleProvider>,
    mut receiver: Receiver<SouthboundCommand>,
    token: RegistrationToken,
) {
    while let Some(command) = receiver.recv().await {
        if !token.is_valid() {
            debug!(
                component = COMPONENT,
                loop_id = %loop_id,
                provider = %provider_id,
                "dropping queued commands: provider unregistered"
            );
            break;
        }

        let result = match &command {
            SouthboundCommand::Apply(rules) => provider.apply_flow_rule(rules).await,
            SouthboundCommand::Remove(rules) => provider.remove_flow_rule(rules).await,
            SouthboundCommand::RemoveByApp(app_id, rules) => {
                provider.remove_rules_by_id(app_id, rules).await
            }
        };

        if let Err(err) = result {
            warn!(
                event = events::PROVIDER_CALL_FAILED,
                component = COMPONENT,
                loop_id = %loop_id,
                provider = %provider_id,
                err = %err,
                "southbound call rejected by provider"
            );
        }
    }
    debug!(
        component = COMPONENT,
        loop_id = %loop_id,
        provider = %provider_id,
        "dispatch loop ended"
    );
}

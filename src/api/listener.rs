//! Application-facing event listener capability.

use crate::model::event::FlowRuleEvent;
use async_trait::async_trait;

/// Receives every event the manager emits after registration, in emission
/// order, until removed.
///
/// Delivery happens on the dispatcher worker, off the manager's calling
/// thread; a slow listener delays later deliveries but never the manager.
#[async_trait]
pub trait FlowRuleListener: Send + Sync {
    async fn event(&self, event: FlowRuleEvent);
}

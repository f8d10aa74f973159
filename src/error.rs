//! Error taxonomy for the flow-rule control plane.

use crate::model::ids::{DeviceId, ProviderId};
use thiserror::Error;

/// Failures surfaced by the manager, registry, and provider services.
///
/// Repeated removals, repeated identical applies, and duplicate south
/// callbacks are deliberately not represented here: they are defined as
/// no-ops to tolerate at-least-once southbound delivery.
#[derive(Debug, Error)]
pub enum FlowRuleError {
    /// A provider with this identity is already registered; the existing
    /// registration is left untouched.
    #[error("provider {0} is already registered")]
    DuplicateProvider(ProviderId),

    /// Southbound dispatch targeted a device with no resolvable owning
    /// provider. The operation is dropped and logged, not retried.
    #[error("no registered provider owns device {0}")]
    UnknownDevice(DeviceId),

    /// A provider-service handle was used after its provider was
    /// unregistered. The call is rejected before any store mutation.
    #[error("provider service for {0} is stale: provider was unregistered")]
    StaleProviderService(ProviderId),

    /// The event dispatcher worker has shut down and can accept no events.
    #[error("event dispatcher is closed")]
    DispatcherClosed,

    /// A southbound driver rejected a dispatched operation. Reported per
    /// device by the dispatch worker, never process-fatal.
    #[error("southbound dispatch failed: {0}")]
    Southbound(String),
}

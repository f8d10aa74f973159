//! Structured logging helpers: event-name constants and field formatters.
//!
//! The crate emits `tracing` events and never installs a global subscriber;
//! binaries and tests own one-time subscriber initialization.

/// Event names carried in the `event` field of emitted log records.
pub mod events {
    pub const APPLY_REQUEST: &str = "apply_request";
    pub const REMOVE_REQUEST: &str = "remove_request";
    pub const REMOVE_BY_APP_REQUEST: &str = "remove_by_app_request";
    pub const SOUTH_FLOW_ADDED: &str = "south_flow_added";
    pub const SOUTH_FLOW_REMOVED: &str = "south_flow_removed";
    pub const SOUTH_FLOW_FAILED: &str = "south_flow_failed";
    pub const SOUTH_FLOW_METRICS: &str = "south_flow_metrics";
    pub const RECONCILE_MISSING: &str = "reconcile_missing_rule";
    pub const RECONCILE_EXTRANEOUS: &str = "reconcile_extraneous_rule";
    pub const DISPATCH_DROPPED: &str = "southbound_dispatch_dropped";
    pub const PROVIDER_REGISTERED: &str = "provider_registered";
    pub const PROVIDER_UNREGISTERED: &str = "provider_unregistered";
    pub const PROVIDER_CALL_FAILED: &str = "provider_call_failed";
    pub const STALE_PROVIDER_SERVICE: &str = "stale_provider_service";
}

/// Formatters for log fields that lack a useful `Display` of their own.
pub mod fields {
    use crate::model::flow_rule::FlowRule;

    pub fn format_rule(rule: &FlowRule) -> String {
        format!(
            "{}@{} prio={} app={} state={:?}",
            rule.id(),
            rule.device(),
            rule.priority(),
            rule.app_id(),
            rule.state()
        )
    }
}

//! API facade layer.
//!
//! Trait seams crossed at the crate boundary: southbound drivers implement
//! [`provider::FlowRuleProvider`], applications implement
//! [`listener::FlowRuleListener`], and the deployment supplies a
//! [`device::DeviceService`]. The manager in [`crate::manager`] is the only
//! component that calls across these seams.

pub mod device;
pub mod listener;
pub mod provider;

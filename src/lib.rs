/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # flowplane
//!
//! `flowplane` is a flow-rule lifecycle control plane: applications declare
//! match-action rules for network devices through [`FlowRuleManager`],
//! southbound device drivers implement [`FlowRuleProvider`] to program those
//! devices, and [`FlowRuleListener`]s observe the resulting lifecycle events.
//!
//! Typical usage is API-first and remains centered on [`FlowRuleManager`].
//! Internal modules are organized by domain layer to keep behavior ownership
//! explicit.
//!
//! ## Lifecycle model
//!
//! Northbound calls record intent only: `apply_flow_rules` stages rules as
//! `PendingAdd` and `remove_flow_rules` stages them as `PendingRemove`, in
//! both cases without emitting any event. Confirmed states (`Added`,
//! `Removed`) and every [`FlowRuleEvent`] originate from the south, reported
//! through the [`FlowRuleProviderService`] handle a driver receives when it
//! registers.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use flowplane::{
//!     ApplicationRegistry, Device, DeviceId, DeviceKind, DeviceService, FlowRule,
//!     FlowRuleManager, FlowRuleState, MastershipRole, TrafficSelector, TrafficTreatment,
//! };
//!
//! struct AllMaster;
//!
//! #[async_trait]
//! impl DeviceService for AllMaster {
//!     async fn get_device(&self, id: &DeviceId) -> Option<Device> {
//!         Some(Device { id: id.clone(), kind: DeviceKind::Switch })
//!     }
//!     async fn is_available(&self, _id: &DeviceId) -> bool {
//!         true
//!     }
//!     async fn get_role(&self, _id: &DeviceId) -> MastershipRole {
//!         MastershipRole::Master
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let manager = FlowRuleManager::new(
//!     "quick-start",
//!     16,
//!     Arc::new(AllMaster),
//!     ApplicationRegistry::new(),
//! );
//! let app = manager.register_application("fwd");
//!
//! let device = DeviceId::new("of:0000000000000001");
//! let rule = FlowRule::new(
//!     device.clone(),
//!     TrafficSelector::matching(["in_port=1"]),
//!     TrafficTreatment::acting(["output=2"]),
//!     40000,
//!     app,
//! );
//!
//! manager.apply_flow_rules([rule.clone()]).await;
//!
//! let entries = manager.get_flow_entries(&device).await;
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].state(), FlowRuleState::PendingAdd);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API seams: `FlowRuleProvider`, `FlowRuleListener`, `DeviceService` traits
//! - Model: flow-rule identity, lifecycle states, events
//! - Store: authoritative per-device rule tables and state transitions
//! - Events: bounded async dispatch to registered listeners
//! - Southbound: provider registry, per-provider command queues, service handles
//! - Manager: the facade tying the layers together
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events. Library code emits events/spans
//! and does not unconditionally initialize a global subscriber. Binaries and
//! tests are responsible for one-time `tracing_subscriber` initialization at
//! process boundaries.

mod api;
pub use api::device::{Device, DeviceKind, DeviceService, MastershipRole};
pub use api::listener::FlowRuleListener;
pub use api::provider::FlowRuleProvider;

mod error;
pub use error::FlowRuleError;

mod model;
pub use model::{
    ApplicationId, ApplicationRegistry, DeviceId, FlowId, FlowRule, FlowRuleEvent,
    FlowRuleEventType, FlowRuleState, ProviderId, TrafficSelector, TrafficTreatment,
};

mod store;
pub use store::FlowReconciliation;

mod events;

#[doc(hidden)]
pub mod observability;
mod runtime;

mod southbound;
pub use southbound::FlowRuleProviderService;

mod manager;
pub use manager::FlowRuleManager;

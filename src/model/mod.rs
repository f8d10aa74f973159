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

//! Data-model layer.
//!
//! Owns the flow-rule identity model and the immutable records exchanged at
//! the crate boundary. Identity fields (device, selector, treatment,
//! priority, owning application) define equality and deduplication; state
//! and counters are observed data merged in place by the store.

pub(crate) mod event;
pub(crate) mod flow_rule;
pub(crate) mod ids;

pub use event::{FlowRuleEvent, FlowRuleEventType};
pub use flow_rule::{FlowId, FlowRule, FlowRuleState, TrafficSelector, TrafficTreatment};
pub use ids::{ApplicationId, ApplicationRegistry, DeviceId, ProviderId};

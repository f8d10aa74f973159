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

//! Southbound layer.
//!
//! Multiplexes registered device drivers: each registration owns a bounded
//! command queue drained by a dedicated dispatch worker, and a private
//! provider-service handle for reporting device-observed state back into
//! the core. A shared registration token ties the three together so a
//! stale handle or a queued command can never reach an unregistered
//! provider.

pub(crate) mod dispatch;
pub(crate) mod registry;
pub(crate) mod service;

pub use service::FlowRuleProviderService;

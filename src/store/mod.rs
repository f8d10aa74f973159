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

//! Store layer.
//!
//! Owns the authoritative per-device flow-rule state and the diff
//! computation behind metrics reconciliation. At most one live entry exists
//! per identity tuple per device; all mutation of one device's table is
//! serialized behind that device's own lock while other devices proceed
//! concurrently. The store records transitions and reports them to the
//! manager; it never emits events itself.

pub(crate) mod flow_store;
pub(crate) mod reconciliation;

pub use reconciliation::FlowReconciliation;

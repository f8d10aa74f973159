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

//! Event layer.
//!
//! Decouples event production from listener notification: the manager posts
//! into a bounded queue and a dedicated delivery worker fans events out to
//! the registered listeners. Per-listener ordering follows the global post
//! order; nothing is promised across listeners relative to each other.

pub(crate) mod dispatcher;
pub(crate) mod roster;

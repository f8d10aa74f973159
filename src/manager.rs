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

//! Flow-rule manager facade: north-facing service, provider registry
//! surface, and the sole decider of which events get emitted.

use crate::api::device::{DeviceService, MastershipRole};
use crate::api::listener::FlowRuleListener;
use crate::api::provider::FlowRuleProvider;
use crate::error::FlowRuleError;
use crate::events::dispatcher::EventDispatcher;
use crate::model::event::{FlowRuleEvent, FlowRuleEventType};
use crate::model::flow_rule::{FlowRule, FlowRuleState};
use crate::model::ids::{ApplicationId, ApplicationRegistry, DeviceId, ProviderId};
use crate::observability::{events, fields};
use crate::southbound::dispatch::SouthboundCommand;
use crate::southbound::registry::ProviderRegistry;
use crate::southbound::service::FlowRuleProviderService;
use crate::store::flow_store::{FlowRuleStore, FlowTransition, RemoveResult, StoreResult};
use crate::store::reconciliation::{diff_by_identity, FlowReconciliation};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const COMPONENT: &str = "flow_rule_manager";

/// Shared internals behind both the manager facade and every
/// provider-service handle. The store is the only holder of flow-rule
/// state; everything here reads through it.
pub(crate) struct ManagerCore {
    name: String,
    store: FlowRuleStore,
    registry: ProviderRegistry,
    dispatcher: EventDispatcher,
    devices: Arc<dyn DeviceService>,
    applications: ApplicationRegistry,
    /// Per-device south-report ordering locks. Store commit and event
    /// enqueue for one device happen under this lock, so event sequence
    /// numbers follow the order transitions were committed per identity.
    south_order: Mutex<HashMap<DeviceId, Arc<Mutex<()>>>>,
}

impl ManagerCore {
    async fn south_order_lock(&self, device: &DeviceId) -> Arc<Mutex<()>> {
        let mut locks = self.south_order.lock().await;
        locks
            .entry(device.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
    async fn post(
        &self,
        event_type: FlowRuleEventType,
        subject: FlowRule,
    ) -> Result<(), FlowRuleError> {
        self.dispatcher
            .post(FlowRuleEvent::new(event_type, subject))
            .await
    }

    /// Merges one device-reported rule and emits the matching event.
    ///
    /// Policy: a repeated report for an already-`Added` rule emits
    /// `RuleUpdated` even when counters are unchanged, so applications see
    /// every device refresh exactly once per report.
    async fn merge_south_report(&self, rule: FlowRule) -> Result<(), FlowRuleError> {
        let order = self.south_order_lock(rule.device()).await;
        let _commit_order = order.lock().await;
        let transition = self.store.add_or_update_flow_rule(rule.clone()).await;
        let subject = rule.with_state(FlowRuleState::Added);
        match transition {
            FlowTransition::Confirmed => self.post(FlowRuleEventType::RuleAdded, subject).await,
            FlowTransition::Refreshed { .. } | FlowTransition::Restored => {
                self.post(FlowRuleEventType::RuleUpdated, subject).await
            }
        }
    }

    pub(crate) async fn handle_flow_added(&self, rule: FlowRule) -> Result<(), FlowRuleError> {
        debug!(
            event = events::SOUTH_FLOW_ADDED,
            component = COMPONENT,
            manager = %self.name,
            rule = %fields::format_rule(&rule),
            "south reported rule present"
        );
        self.merge_south_report(rule).await
    }

    pub(crate) async fn handle_flow_removed(&self, rule: FlowRule) -> Result<(), FlowRuleError> {
        let order = self.south_order_lock(rule.device()).await;
        let _commit_order = order.lock().await;
        match self.store.remove_flow_rule(&rule).await {
            Some(removed) => {
                debug!(
                    event = events::SOUTH_FLOW_REMOVED,
                    component = COMPONENT,
                    manager = %self.name,
                    rule = %fields::format_rule(&removed),
                    "south confirmed removal"
                );
                self.post(FlowRuleEventType::RuleRemoved, removed).await
            }
            None => {
                debug!(
                    event = events::SOUTH_FLOW_REMOVED,
                    component = COMPONENT,
                    manager = %self.name,
                    rule = %fields::format_rule(&rule),
                    "removal of unknown rule is a no-op"
                );
                Ok(())
            }
        }
    }

    pub(crate) async fn handle_flow_failed(&self, rule: FlowRule) -> Result<(), FlowRuleError> {
        if self.store.mark_rule_failed(&rule).await {
            warn!(
                event = events::SOUTH_FLOW_FAILED,
                component = COMPONENT,
                manager = %self.name,
                rule = %fields::format_rule(&rule),
                "device rejected pending operation"
            );
        }
        Ok(())
    }

    pub(crate) async fn handle_flow_metrics(
        &self,
        device: DeviceId,
        observed: Vec<FlowRule>,
    ) -> Result<FlowReconciliation, FlowRuleError> {
        let stored = self.store.flow_entries(&device).await;
        debug!(
            event = events::SOUTH_FLOW_METRICS,
            component = COMPONENT,
            manager = %self.name,
            device = %device,
            stored = stored.len(),
            observed = observed.len(),
            "reconciling device-reported rules"
        );
        let diff = diff_by_identity(&stored, observed);

        for rule in diff.known {
            self.merge_south_report(rule).await?;
        }

        let mut report = FlowReconciliation::default();
        for rule in diff.unreported {
            match rule.state() {
                FlowRuleState::PendingRemove => {
                    let order = self.south_order_lock(rule.device()).await;
                    let _commit_order = order.lock().await;
                    if let Some(removed) = self.store.remove_flow_rule(&rule).await {
                        self.post(FlowRuleEventType::RuleRemoved, removed).await?;
                    }
                }
                FlowRuleState::Added => {
                    warn!(
                        event = events::RECONCILE_MISSING,
                        component = COMPONENT,
                        manager = %self.name,
                        rule = %fields::format_rule(&rule),
                        "confirmed rule missing from device report"
                    );
                    report.missing.push(rule);
                }
                // Pending adds may simply not have converged yet.
                _ => {}
            }
        }

        for rule in diff.extraneous {
            warn!(
                event = events::RECONCILE_EXTRANEOUS,
                component = COMPONENT,
                manager = %self.name,
                rule = %fields::format_rule(&rule),
                "device reports rule the controller never authorized"
            );
            report.extraneous.push(rule);
        }

        Ok(report)
    }

    /// Routes one batched command to the device's owning provider, gated on
    /// device inventory, availability, and mastership. Gate failures drop
    /// the dispatch; recorded intent stays in the store.
    async fn dispatch_southbound(
        &self,
        device: &DeviceId,
        command: SouthboundCommand,
    ) -> Result<(), FlowRuleError> {
        if self.devices.get_device(device).await.is_none() {
            warn!(
                event = events::DISPATCH_DROPPED,
                component = COMPONENT,
                manager = %self.name,
                device = %device,
                reason = "device_not_in_inventory",
                "dropping southbound dispatch"
            );
            return Ok(());
        }
        if !self.devices.is_available(device).await {
            warn!(
                event = events::DISPATCH_DROPPED,
                component = COMPONENT,
                manager = %self.name,
                device = %device,
                reason = "device_unavailable",
                "dropping southbound dispatch"
            );
            return Ok(());
        }
        if self.devices.get_role(device).await == MastershipRole::Standby {
            warn!(
                event = events::DISPATCH_DROPPED,
                component = COMPONENT,
                manager = %self.name,
                device = %device,
                reason = "standby_mastership",
                "dropping southbound dispatch"
            );
            return Ok(());
        }

        let Some(sender) = self.registry.sender_for(device).await else {
            return Err(FlowRuleError::UnknownDevice(device.clone()));
        };
        sender
            .send(command)
            .await
            .map_err(|_| FlowRuleError::Southbound(format!("dispatch queue for {device} closed")))
    }
}

/// The flow-rule service: applications apply and remove rules through it,
/// southbound drivers register with it, and it alone decides which
/// [`FlowRuleEvent`]s are published.
///
/// North calls record intent (`PendingAdd`/`PendingRemove`) and emit no
/// events; confirmed states and every event originate from south reports
/// arriving through a provider-service handle.
pub struct FlowRuleManager {
    core: Arc<ManagerCore>,
}

impl FlowRuleManager {
    /// Creates a manager with bounded event and southbound queues of
    /// `queue_size`. The application registry's lifecycle is tied to the
    /// manager from here on.
    pub fn new(
        name: &str,
        queue_size: u16,
        devices: Arc<dyn DeviceService>,
        applications: ApplicationRegistry,
    ) -> Self {
        let core = Arc::new(ManagerCore {
            name: name.to_string(),
            store: FlowRuleStore::new(),
            registry: ProviderRegistry::new(queue_size as usize),
            dispatcher: EventDispatcher::new(name, queue_size as usize),
            devices,
            applications,
            south_order: Mutex::new(HashMap::new()),
        });
        debug!(
            component = COMPONENT,
            manager = name,
            queue_size,
            "flow rule manager created"
        );
        Self { core }
    }

    pub fn register_application(&self, name: &str) -> ApplicationId {
        self.core.applications.register(name)
    }

    /// Records the given rules as `PendingAdd` and fans them out
    /// southbound, one batched call per affected device. Rules already
    /// known by identity are treated as refreshes and not re-dispatched.
    pub async fn apply_flow_rules(&self, rules: impl IntoIterator<Item = FlowRule>) {
        let mut fresh: HashMap<DeviceId, Vec<FlowRule>> = HashMap::new();
        for rule in rules {
            match self.core.store.store_flow_rule(rule.clone()).await {
                StoreResult::Inserted => {
                    fresh.entry(rule.device().clone()).or_default().push(rule);
                }
                StoreResult::Refreshed { updated } => {
                    debug!(
                        event = events::APPLY_REQUEST,
                        component = COMPONENT,
                        manager = %self.core.name,
                        rule = %fields::format_rule(&rule),
                        updated,
                        "identical apply refreshed existing entry"
                    );
                }
            }
        }

        for (device, batch) in fresh {
            debug!(
                event = events::APPLY_REQUEST,
                component = COMPONENT,
                manager = %self.core.name,
                device = %device,
                rules = batch.len(),
                "dispatching apply"
            );
            if let Err(err) = self
                .core
                .dispatch_southbound(&device, SouthboundCommand::Apply(batch))
                .await
            {
                warn!(
                    event = events::DISPATCH_DROPPED,
                    component = COMPONENT,
                    manager = %self.core.name,
                    device = %device,
                    err = %err,
                    "apply dispatch failed"
                );
            }
        }
    }

    /// Marks the given rules `PendingRemove` and dispatches removal per
    /// affected device. Unknown identities are no-ops; repeating the call
    /// is idempotent. No event is emitted until the south confirms.
    pub async fn remove_flow_rules(&self, rules: impl IntoIterator<Item = FlowRule>) {
        let mut marked: HashMap<DeviceId, Vec<FlowRule>> = HashMap::new();
        for rule in rules {
            match self.core.store.delete_flow_rule(&rule).await {
                RemoveResult::Marked => {
                    marked.entry(rule.device().clone()).or_default().push(rule);
                }
                RemoveResult::NotFound => {
                    debug!(
                        event = events::REMOVE_REQUEST,
                        component = COMPONENT,
                        manager = %self.core.name,
                        rule = %fields::format_rule(&rule),
                        "removal of unknown rule is a no-op"
                    );
                }
            }
        }

        for (device, batch) in marked {
            debug!(
                event = events::REMOVE_REQUEST,
                component = COMPONENT,
                manager = %self.core.name,
                device = %device,
                rules = batch.len(),
                "dispatching removal"
            );
            if let Err(err) = self
                .core
                .dispatch_southbound(&device, SouthboundCommand::Remove(batch))
                .await
            {
                warn!(
                    event = events::DISPATCH_DROPPED,
                    component = COMPONENT,
                    manager = %self.core.name,
                    device = %device,
                    err = %err,
                    "removal dispatch failed"
                );
            }
        }
    }

    /// Removes rules on behalf of one owning application, dispatched
    /// southbound through the `remove_rules_by_id` provider capability.
    pub async fn remove_rules_by_id(
        &self,
        app_id: &ApplicationId,
        rules: impl IntoIterator<Item = FlowRule>,
    ) {
        let mut marked: HashMap<DeviceId, Vec<FlowRule>> = HashMap::new();
        for rule in rules {
            if rule.app_id() != app_id {
                debug!(
                    event = events::REMOVE_BY_APP_REQUEST,
                    component = COMPONENT,
                    manager = %self.core.name,
                    rule = %fields::format_rule(&rule),
                    app = %app_id,
                    "skipping rule owned by another application"
                );
                continue;
            }
            if self.core.store.delete_flow_rule(&rule).await == RemoveResult::Marked {
                marked.entry(rule.device().clone()).or_default().push(rule);
            }
        }

        for (device, batch) in marked {
            if let Err(err) = self
                .core
                .dispatch_southbound(
                    &device,
                    SouthboundCommand::RemoveByApp(app_id.clone(), batch),
                )
                .await
            {
                warn!(
                    event = events::DISPATCH_DROPPED,
                    component = COMPONENT,
                    manager = %self.core.name,
                    device = %device,
                    err = %err,
                    "remove-by-app dispatch failed"
                );
            }
        }
    }

    /// Read-through to the store: current known rules for a device in
    /// stable insertion order, empty when none.
    pub async fn get_flow_entries(&self, device: &DeviceId) -> Vec<FlowRule> {
        self.core.store.flow_entries(device).await
    }

    pub fn add_listener(&self, listener: Arc<dyn FlowRuleListener>) {
        self.core.dispatcher.add_listener(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn FlowRuleListener>) {
        self.core.dispatcher.remove_listener(listener);
    }

    /// Waits until every event posted so far has been delivered. Gives
    /// callers and tests a deterministic quiescence point over the
    /// asynchronous dispatch path.
    pub async fn flush_events(&self) -> Result<(), FlowRuleError> {
        self.core.dispatcher.flush().await
    }

    /// Registers a southbound driver and hands back its private callback
    /// service. Fails on duplicate [`ProviderId`] with the existing
    /// registration untouched.
    pub async fn register_provider(
        &self,
        provider: Arc<dyn FlowRuleProvider>,
    ) -> Result<FlowRuleProviderService, FlowRuleError> {
        let provider_id = provider.id();
        let token = self.core.registry.register(provider).await?;
        Ok(FlowRuleProviderService::new(
            self.core.clone(),
            provider_id,
            token,
        ))
    }

    /// Unregisters a provider, invalidating its service handle and
    /// stopping delivery of queued southbound commands. Idempotent.
    pub async fn unregister_provider(&self, provider_id: &ProviderId) {
        self.core.registry.unregister(provider_id).await;
    }

    pub async fn providers(&self) -> HashSet<ProviderId> {
        self.core.registry.providers().await
    }
}

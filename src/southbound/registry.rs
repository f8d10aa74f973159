//! Provider registration and device-to-provider routing.

use crate::api::provider::FlowRuleProvider;
use crate::error::FlowRuleError;
use crate::model::ids::{DeviceId, ProviderId};
use crate::observability::events;
use crate::runtime::worker::spawn_worker_loop;
use crate::southbound::dispatch::{dispatch_loop, SouthboundCommand};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

const COMPONENT: &str = "provider_registry";

/// Validity stamp shared between a registration, its dispatch worker, and
/// the provider-service handle. Unregistration flips it exactly once;
/// everything holding the token fails closed afterwards.
#[derive(Clone, Debug)]
pub(crate) struct RegistrationToken(Arc<AtomicBool>);

impl RegistrationToken {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn invalidate(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct ProviderEntry {
    id: ProviderId,
    sender: Sender<SouthboundCommand>,
    token: RegistrationToken,
}

/// Registered southbound drivers, in registration order.
///
/// The registry only routes: a device is owned by the first registered
/// provider whose scheme matches the device-id scheme. It never interprets
/// the commands it queues.
pub(crate) struct ProviderRegistry {
    queue_size: usize,
    providers: Mutex<Vec<ProviderEntry>>,
}

impl ProviderRegistry {
    pub(crate) fn new(queue_size: usize) -> Self {
        Self {
            queue_size: queue_size.max(1),
            providers: Mutex::new(Vec::new()),
        }
    }

    /// Records a provider and starts its dispatch worker. Fails without
    /// side effects when the identity is already registered.
    pub(crate) async fn register(
        &self,
        provider: Arc<dyn FlowRuleProvider>,
    ) -> Result<RegistrationToken, FlowRuleError> {
        let provider_id = provider.id();
        let mut providers = self.providers.lock().await;

        if providers.iter().any(|entry| entry.id == provider_id) {
            return Err(FlowRuleError::DuplicateProvider(provider_id));
        }

        let (sender, receiver) = tokio::sync::mpsc::channel(self.queue_size);
        let token = RegistrationToken::new();
        let loop_id = Uuid::new_v4().to_string();
        spawn_worker_loop(
            &format!("flowplane-sb-{}", provider_id.scheme()),
            dispatch_loop(
                loop_id,
                provider_id.clone(),
                provider,
                receiver,
                token.clone(),
            ),
        );

        info!(
            event = events::PROVIDER_REGISTERED,
            component = COMPONENT,
            provider = %provider_id,
            "provider registered"
        );
        providers.push(ProviderEntry {
            id: provider_id,
            sender,
            token: token.clone(),
        });
        Ok(token)
    }

    /// Removes a provider and invalidates its token. Idempotent: absent
    /// identities are ignored.
    pub(crate) async fn unregister(&self, provider_id: &ProviderId) {
        let mut providers = self.providers.lock().await;
        let before = providers.len();
        providers.retain(|entry| {
            if entry.id == *provider_id {
                entry.token.invalidate();
                false
            } else {
                true
            }
        });

        if providers.len() < before {
            info!(
                event = events::PROVIDER_UNREGISTERED,
                component = COMPONENT,
                provider = %provider_id,
                "provider unregistered"
            );
        }
    }

    pub(crate) async fn providers(&self) -> HashSet<ProviderId> {
        self.providers
            .lock()
            .await
            .iter()
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Command queue of the provider owning `device`, by scheme match.
    pub(crate) async fn sender_for(&self, device: &DeviceId) -> Option<Sender<SouthboundCommand>> {
        self.providers
            .lock()
            .await
            .iter()
            .find(|entry| entry.id.scheme() == device.scheme())
            .map(|entry| entry.sender.clone())
    }
}

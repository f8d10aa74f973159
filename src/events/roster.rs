//! Listener roster keyed by listener object identity.

use crate::api::listener::FlowRuleListener;
use arc_swap::ArcSwap;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Wraps a listener so roster membership is decided by `Arc` pointer
/// identity rather than by anything the listener implements.
#[derive(Clone)]
pub(crate) struct ComparableListener {
    listener: Arc<dyn FlowRuleListener>,
}

impl ComparableListener {
    pub(crate) fn new(listener: Arc<dyn FlowRuleListener>) -> Self {
        Self { listener }
    }

    pub(crate) fn inner(&self) -> &Arc<dyn FlowRuleListener> {
        &self.listener
    }
}

impl Hash for ComparableListener {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.listener).hash(state);
    }
}

impl PartialEq for ComparableListener {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.listener, &other.listener)
    }
}

impl Eq for ComparableListener {}

impl Debug for ComparableListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparableListener").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub(crate) struct RegisteredListener {
    pub(crate) listener: ComparableListener,
    /// Dispatcher sequence at registration time. Events posted at or before
    /// this point are never delivered to the listener (no replay).
    pub(crate) joined_seq: u64,
}

/// Read-mostly listener set: the delivery loop loads a snapshot per event,
/// registration swaps in a new vector.
pub(crate) struct ListenerRoster {
    listeners: ArcSwap<Vec<RegisteredListener>>,
}

impl ListenerRoster {
    pub(crate) fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Adds a listener unless the same instance is already registered.
    pub(crate) fn add(&self, listener: Arc<dyn FlowRuleListener>, joined_seq: u64) {
        let added = ComparableListener::new(listener);
        self.listeners.rcu(|current| {
            let mut next = (**current).clone();
            if !next.iter().any(|entry| entry.listener == added) {
                next.push(RegisteredListener {
                    listener: added.clone(),
                    joined_seq,
                });
            }
            next
        });
    }

    pub(crate) fn remove(&self, listener: &Arc<dyn FlowRuleListener>) {
        let removed = ComparableListener::new(listener.clone());
        self.listeners.rcu(|current| {
            current
                .iter()
                .filter(|entry| entry.listener != removed)
                .cloned()
                .collect::<Vec<_>>()
        });
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<RegisteredListener>> {
        self.listeners.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::ListenerRoster;
    use crate::api::listener::FlowRuleListener;
    use crate::model::event::FlowRuleEvent;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopListener;

    #[async_trait]
    impl FlowRuleListener for NoopListener {
        async fn event(&self, _event: FlowRuleEvent) {}
    }

    #[test]
    fn roster_keys_membership_by_instance() {
        let roster = ListenerRoster::new();
        let first: Arc<dyn FlowRuleListener> = Arc::new(NoopListener);
        let second: Arc<dyn FlowRuleListener> = Arc::new(NoopListener);

        roster.add(first.clone(), 0);
        roster.add(first.clone(), 0);
        roster.add(second.clone(), 3);
        assert_eq!(roster.snapshot().len(), 2);

        roster.remove(&first);
        let remaining = roster.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].joined_seq, 3);

        roster.remove(&first);
        assert_eq!(roster.snapshot().len(), 1);
    }
}

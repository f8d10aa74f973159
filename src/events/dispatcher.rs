//! Asynchronous flow-rule event delivery, decoupled from the manager.

use crate::api::listener::FlowRuleListener;
use crate::error::FlowRuleError;
use crate::events::roster::ListenerRoster;
use crate::model::event::FlowRuleEvent;
use crate::runtime::worker::spawn_worker_loop;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tracing::{debug, trace};
use uuid::Uuid;

const COMPONENT: &str = "event_dispatcher";

struct SequencedEvent {
    seq: u64,
    event: FlowRuleEvent,
}

/// Bounded FIFO event queue drained by a dedicated worker thread.
///
/// `post` awaits queue space rather than dropping events, so producers see
/// back-pressure under a slow listener but no event is ever lost. Each
/// listener observes the global post order; listeners added after an event
/// was posted never receive it.
pub(crate) struct EventDispatcher {
    sender: Sender<SequencedEvent>,
    roster: Arc<ListenerRoster>,
    posted: AtomicU64,
    delivered: watch::Receiver<u64>,
}

impl EventDispatcher {
    pub(crate) fn new(name: &str, queue_size: usize) -> Self {
        let (sender, receiver) = tokio::sync::mpsc::channel(queue_size.max(1));
        let (delivered_tx, delivered_rx) = watch::channel(0u64);
        let roster = Arc::new(ListenerRoster::new());

        let loop_id = Uuid::new_v4().to_string();
        spawn_worker_loop(
            &format!("{name}-events"),
            delivery_loop(loop_id, roster.clone(), receiver, delivered_tx),
        );

        Self {
            sender,
            roster,
            posted: AtomicU64::new(0),
            delivered: delivered_rx,
        }
    }

    /// Enqueues one event for delivery. Blocks only on queue space, never
    /// on listener execution.
    pub(crate) async fn post(&self, event: FlowRuleEvent) -> Result<(), FlowRuleError> {
        let seq = self.posted.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .sender
            .send(SequencedEvent { seq, event })
            .await
            .is_err()
        {
            self.posted.fetch_sub(1, Ordering::SeqCst);
            return Err(FlowRuleError::DispatcherClosed);
        }
        Ok(())
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn FlowRuleListener>) {
        let joined_seq = self.posted.load(Ordering::SeqCst);
        self.roster.add(listener, joined_seq);
    }

    pub(crate) fn remove_listener(&self, listener: &Arc<dyn FlowRuleListener>) {
        self.roster.remove(listener);
    }

    /// Waits until everything posted so far has been delivered to every
    /// eligible listener.
    pub(crate) async fn flush(&self) -> Result<(), FlowRuleError> {
        let target = self.posted.load(Ordering::SeqCst);
        let mut delivered = self.delivered.clone();
        delivered
            .wait_for(|count| *count >= target)
            .await
            .map(|_| ())
            .map_err(|_| FlowRuleError::DispatcherClosed)
    }
}

async fn delivery_loop(
    loop_id: String,
    roster: Arc<ListenerRoster>,
    mut receiver: Receiver<SequencedEvent>,
    delivered: watch::Sender<u64>,
) {
    let mut processed = 0u64;
    while let Some(SequencedEvent { seq, event }) = receiver.recv().await {
        let snapshot = roster.snapshot();
        for registered in snapshot.iter() {
            if seq > registered.joined_seq {
                registered.listener.inner().event(event.clone()).await;
            }
        }
        processed += 1;
        let _ = delivered.send(processed);
        trace!(
            component = COMPONENT,
            loop_id = %loop_id,
            seq,
            listeners = snapshot.len(),
            "delivered event"
        );
    }
    debug!(component = COMPONENT, loop_id = %loop_id, "delivery loop ended");
}

//! Session event bus.
//!
//! Per-session publish/subscribe for fragment lifecycle events. The worker
//! is the only publisher; each client transport holds one subscription.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use voxflow_core::{ChunkEvent, SessionId};

/// Identifies one subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving half of a session subscription.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub session_id: SessionId,
    pub receiver: mpsc::UnboundedReceiver<ChunkEvent>,
}

#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<ChunkEvent>,
}

#[derive(Debug, Default)]
pub struct SessionEventBus {
    subscribers: Mutex<HashMap<SessionId, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl SessionEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<SessionId, Vec<Subscriber>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, session_id: &SessionId) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        self.subscribers()
            .entry(session_id.clone())
            .or_default()
            .push(Subscriber { id, sender });

        Subscription {
            id,
            session_id: session_id.clone(),
            receiver,
        }
    }

    /// Remove a subscription. Returns whether it was registered.
    pub fn unsubscribe(&self, session_id: &SessionId, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers();
        let Some(list) = subscribers.get_mut(session_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != id);
        let removed = list.len() < before;
        if list.is_empty() {
            subscribers.remove(session_id);
        }
        removed
    }

    /// Deliver an event to every subscriber of its session.
    ///
    /// Returns the number of deliveries. Events for sessions without
    /// subscribers (already torn down) are dropped.
    pub fn publish(&self, event: ChunkEvent) -> usize {
        let session_id = event.session_id().clone();
        let mut subscribers = self.subscribers();

        let Some(list) = subscribers.get_mut(&session_id) else {
            tracing::debug!(
                target: "voxflow.bus",
                session_id = %session_id,
                event = event.event_name(),
                "No subscribers for session, dropping event"
            );
            return 0;
        };

        list.retain(|s| !s.sender.is_closed());
        let delivered = list
            .iter()
            .filter(|s| s.sender.send(event.clone()).is_ok())
            .count();
        if list.is_empty() {
            subscribers.remove(&session_id);
        }
        delivered
    }

    pub fn subscriber_count(&self, session_id: &SessionId) -> usize {
        self.subscribers().get(session_id).map_or(0, Vec::len)
    }
}

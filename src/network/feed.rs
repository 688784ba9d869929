//! In-process change feed fanning row changes out to subscribers.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::common::FeedEvent;
use crate::error::Result;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Proof of an acknowledged subscription.
///
/// Not `Clone`: handing it back to [`ChangeStream::unsubscribe`] consumes it,
/// so a subscription is released at most once.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Push source of insert/delete notifications for the messages table.
pub trait ChangeStream: Send + Sync {
    fn subscribe(&self, sink: mpsc::Sender<FeedEvent>) -> Result<SubscriptionHandle>;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Broadcast hub. Subscribers whose buffer is full or whose receiver is
/// gone are dropped on the next publish.
pub struct ChangeFeed {
    subscribers: RwLock<HashMap<SubscriptionId, mpsc::Sender<FeedEvent>>>,
    next_id: AtomicU64,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Deliver `event` to every live subscriber. Returns how many got it.
    pub fn publish(&self, event: &FeedEvent) -> usize {
        let mut delivered = 0;
        let mut to_remove = Vec::new();

        {
            let subscribers = self.subscribers.read();
            for (id, sink) in subscribers.iter() {
                match sink.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        log::warn!("Dropping subscription {} (buffer full)", id.0);
                        to_remove.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => to_remove.push(*id),
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in to_remove {
                subscribers.remove(&id);
            }
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeStream for ChangeFeed {
    fn subscribe(&self, sink: mpsc::Sender<FeedEvent>) -> Result<SubscriptionHandle> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers.write().insert(id, sink);
        log::debug!("Subscription {} opened", id.0);
        Ok(SubscriptionHandle { id })
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscribers.write().remove(&handle.id).is_some() {
            log::debug!("Subscription {} closed", handle.id.0);
        }
    }
}

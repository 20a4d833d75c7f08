use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;

// a subscriber that cannot take a frame within this window is treated as dead
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);
// closing a dead connection may block on the same write that failed
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
#[error("subscriber send failed: {0}")]
pub struct SendError(pub String);

/// One live connection the hub can push serialized snapshots to.
#[async_trait]
pub trait Subscriber: Send + Sync {
    async fn send_text(&self, text: String) -> Result<(), SendError>;

    /// Releases the underlying connection. Must be safe to call twice.
    async fn close(&self);
}

pub type SubscriberId = u64;

/// Set of currently connected subscribers.
///
/// The lock guards membership only. Pushing happens on a copy of the member
/// list taken under the lock, so a slow subscriber never blocks join/leave.
pub struct BroadcastHub {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<SubscriberId, Arc<dyn Subscriber>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    pub fn join(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.insert(id, subscriber);
        tracing::debug!("subscriber joined: id={} live={}", id, subs.len());
        id
    }

    /// Removes a subscriber and closes its connection. Returns false if it was
    /// already gone.
    pub async fn leave(&self, id: SubscriberId) -> bool {
        let removed = self.remove(&[id]);
        if removed.is_empty() {
            return false;
        }

        close_all_bounded(removed).await;
        tracing::debug!("subscriber left: id={}", id);
        true
    }

    /// Disconnects every subscriber. Used on shutdown.
    pub async fn close_all(&self) {
        let drained: Vec<(SubscriberId, Arc<dyn Subscriber>)> = {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            subs.drain().collect()
        };

        close_all_bounded(drained).await;
    }

    // Membership changes take effect here, before any close is awaited.
    fn remove(&self, ids: &[SubscriberId]) -> Vec<(SubscriberId, Arc<dyn Subscriber>)> {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        ids.iter()
            .filter_map(|id| subs.remove(id).map(|s| (*id, s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&id)
    }

    /// Pushes `value` to every current subscriber and prunes those whose push
    /// failed. Returns the number of successful deliveries.
    pub async fn broadcast<T: Serialize>(&self, value: &T) -> usize {
        let text = match serde_json::to_string(value) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("broadcast: serialize failed: {}", e);
                return 0;
            }
        };

        let members: Vec<(SubscriberId, Arc<dyn Subscriber>)> = {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            subs.iter().map(|(id, s)| (*id, Arc::clone(s))).collect()
        };

        if members.is_empty() {
            return 0;
        }

        let results = join_all(members.into_iter().map(|(id, sub)| {
            let text = text.clone();
            async move { (id, push(sub.as_ref(), text).await) }
        }))
        .await;

        let mut delivered = 0;
        let mut failed: Vec<SubscriberId> = vec![];
        for (id, res) in results {
            match res {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!("dropping subscriber {}: {}", id, e);
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let removed = self.remove(&failed);
            close_all_bounded(removed).await;
        }
        delivered
    }

    /// Pushes `value` to one subscriber (the catch-up push on connect). A
    /// failed push removes the subscriber.
    pub async fn send_to<T: Serialize>(&self, id: SubscriberId, value: &T) -> bool {
        let sub = {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            subs.get(&id).cloned()
        };
        let Some(sub) = sub else {
            return false;
        };

        let text = match serde_json::to_string(value) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("send_to: serialize failed: {}", e);
                return false;
            }
        };

        match push(sub.as_ref(), text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("dropping subscriber {}: {}", id, e);
                let removed = self.remove(&[id]);
                close_all_bounded(removed).await;
                false
            }
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

async fn push(sub: &dyn Subscriber, text: String) -> Result<(), SendError> {
    match tokio::time::timeout(PUSH_TIMEOUT, sub.send_text(text)).await {
        Ok(res) => res,
        Err(_) => Err(SendError("push timed out".to_string())),
    }
}

async fn close_all_bounded(subs: Vec<(SubscriberId, Arc<dyn Subscriber>)>) {
    join_all(subs.into_iter().map(|(id, sub)| async move {
        if tokio::time::timeout(CLOSE_TIMEOUT, sub.close()).await.is_err() {
            tracing::debug!("close of subscriber {} timed out, abandoning it", id);
        }
    }))
    .await;
}

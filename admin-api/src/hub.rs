//! Broadcast hub for websocket subscribers
//!
//! Keeps the set of live subscriber handles. `broadcast` delivers to a
//! snapshot of the set taken under the read lock, sends outside the lock,
//! and prunes every subscriber whose send failed. One failing subscriber
//! never stops delivery to the rest. Nothing is replayed, and a subscriber
//! whose bounded buffer is full is treated as failed.

use admin_common::events::AdminEvent;
use admin_common::uuid_utils;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Messages a channel subscriber may have queued before it counts as lagging
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Identifier assigned to a subscriber on connect
pub type SubscriberId = String;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Subscriber channel closed")]
    Closed,

    #[error("Subscriber lagging, {0} messages queued")]
    Lagging(usize),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Anything that can receive serialized event envelopes
pub trait Subscriber: Send + Sync {
    fn send(&self, message: &str) -> Result<(), HubError>;
}

/// Subscriber backed by a bounded channel drained by a websocket task
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::Sender<String>,
}

impl ChannelSubscriber {
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        Self::with_capacity(SUBSCRIBER_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn send(&self, message: &str) -> Result<(), HubError> {
        self.tx.try_send(message.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => HubError::Lagging(self.tx.max_capacity()),
            TrySendError::Closed(_) => HubError::Closed,
        })
    }
}

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

/// Registry of active subscribers
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: RwLock<HashMap<SubscriberId, Arc<dyn Subscriber>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = uuid_utils::generate();
        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id.clone(), subscriber);
        info!(subscriber = %id, total = subscribers.len(), "Subscriber connected");
        id
    }

    /// Remove a subscriber; returns false when it was already gone
    pub async fn unsubscribe(&self, id: &str) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let removed = subscribers.remove(id).is_some();
        if removed {
            info!(subscriber = %id, total = subscribers.len(), "Subscriber disconnected");
        }
        removed
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver a mutation event to every current subscriber
    pub async fn broadcast(&self, event: &AdminEvent) -> BroadcastReport {
        let report = self.broadcast_text(&event.to_json()).await;
        debug!(
            event = %event.event_type(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Event broadcast"
        );
        report
    }

    pub async fn broadcast_text(&self, message: &str) -> BroadcastReport {
        let snapshot: Vec<(SubscriberId, Arc<dyn Subscriber>)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), Arc::clone(s)))
            .collect();

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for (id, subscriber) in snapshot {
            match subscriber.send(message) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(subscriber = %id, error = %e, "Dropping subscriber after failed send");
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &failed {
                if subscribers.remove(id).is_some() {
                    report.pruned += 1;
                }
            }
        }
        report
    }
}

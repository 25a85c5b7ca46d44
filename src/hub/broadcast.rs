//! Subscriber registry and fan-out
//!
//! `publish` never sends while holding the registry lock: it copies the
//! current subscribers, sends to each copy, then takes the lock again to
//! drop the ones that turned out dead. Registration therefore only ever
//! waits for a map operation, never for a slow socket.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::SubscriberError;
use crate::hub::subscriber::{Subscriber, SubscriberId};
use crate::protocol::EncodedPayload;

/// Outcome of one publish call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Send attempts made
    pub attempted: usize,
    /// Sends accepted by the subscriber
    pub delivered: usize,
    /// Sends rejected because the subscriber was still busy
    pub skipped: usize,
    /// Subscribers removed from the registry by this call
    pub reaped: usize,
}

/// Lifetime hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub frames_published: u64,
    pub deliveries: u64,
    pub reaped: u64,
}

/// Broadcast hub shared by the sampling loop and connection tasks
#[derive(Default)]
pub struct Hub {
    registry: Mutex<HashMap<SubscriberId, Arc<dyn Subscriber>>>,
    frames_published: AtomicU64,
    deliveries: AtomicU64,
    reaped: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns false if its id is already registered.
    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> bool {
        let id = subscriber.id();
        let mut registry = self.registry.lock();
        if registry.contains_key(&id) {
            return false;
        }
        registry.insert(id, subscriber);
        tracing::debug!("Registered subscriber {} ({} total)", id, registry.len());
        true
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut registry = self.registry.lock();
        let removed = registry.remove(&id).is_some();
        if removed {
            tracing::debug!("Unregistered subscriber {} ({} left)", id, registry.len());
        }
        removed
    }

    /// Number of registered subscribers
    pub fn count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.registry.lock().contains_key(&id)
    }

    /// Deliver `payload` once to every registered subscriber, reaping the
    /// ones whose connection is gone.
    pub async fn publish(&self, payload: &EncodedPayload) -> PublishReport {
        let snapshot: Vec<Arc<dyn Subscriber>> = self.registry.lock().values().cloned().collect();

        let mut report = PublishReport::default();
        let mut dead = Vec::new();

        for subscriber in &snapshot {
            if !subscriber.is_active() {
                dead.push(subscriber.id());
                continue;
            }

            report.attempted += 1;
            match subscriber.send(payload.clone()).await {
                Ok(()) => report.delivered += 1,
                Err(SubscriberError::Backpressure) => {
                    tracing::debug!("Subscriber {} busy, frame skipped", subscriber.id());
                    report.skipped += 1;
                }
                Err(SubscriberError::Closed) => {
                    tracing::debug!("Subscriber {} dropped during send", subscriber.id());
                    dead.push(subscriber.id());
                }
            }
        }

        if !dead.is_empty() {
            let mut registry = self.registry.lock();
            for id in dead {
                if registry.remove(&id).is_some() {
                    tracing::debug!("Reaped subscriber {}", id);
                    report.reaped += 1;
                }
            }
        }

        self.frames_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.reaped.fetch_add(report.reaped as u64, Ordering::Relaxed);

        report
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
        }
    }
}

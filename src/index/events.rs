// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Index change notifications.
//!
//! The bus exists so dialogs and background views can watch the index without
//! being able to stall it. Delivery rules:
//!
//! - Each subscriber gets its own bounded queue. Events are delivered in
//!   order per subscriber; there is no global order across subscribers.
//! - Emission never blocks: a full queue drops the event for that subscriber
//!   (and only that subscriber). A consumer that falls 256 events behind has
//!   effectively stopped listening.
//! - A [`Subscription`] unregisters itself on drop, so a consumer's listener
//!   lifetime is tied to its own scope — register on open, drop on close.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::types::EntityId;

/// Events per subscriber queue before emission starts dropping.
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Which maintenance pass an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceKind {
    Reindex,
    Cleanup,
}

/// Structured index-change events delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    EntitiesIndexed(Vec<EntityId>),
    EntitiesRemoved(Vec<EntityId>),
    MaintenanceStarted(MaintenanceKind),
    MaintenanceFinished(MaintenanceKind),
}

struct Subscriber {
    token: u64,
    tx: SyncSender<IndexEvent>,
}

/// Listener registry owned by the index.
#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_token: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; the returned subscription is the removal token.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = sync_channel(EVENT_QUEUE_CAPACITY);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push(Subscriber { token, tx });
        Subscription {
            token,
            rx,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    /// Deliver an event to every live subscriber without blocking.
    pub fn emit(&self, event: IndexEvent) {
        let mut subs = self.subscribers.lock();
        subs.retain(|sub| match sub.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(token = sub.token, "listener queue full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// A registered listener. Dropping it deterministically unregisters.
pub struct Subscription {
    token: u64,
    rx: Receiver<IndexEvent>,
    registry: Weak<Mutex<Vec<Subscriber>>>,
}

impl Subscription {
    /// Pull the next queued event without waiting.
    pub fn try_next(&self) -> Option<IndexEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<IndexEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<IndexEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().retain(|sub| sub.token != self.token);
        }
    }
}

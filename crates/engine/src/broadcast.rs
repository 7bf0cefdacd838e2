// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-and-forget broadcast bus.
//!
//! The HTTP/WebSocket collaborator subscribes; the core never waits on
//! listeners and never fails because nobody is listening.

use tf_core::Broadcast;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out sender for [`Broadcast`] events.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Broadcast>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.tx.subscribe()
    }

    /// Emit an event; dropped silently when no receiver is subscribed.
    pub fn emit(&self, event: Broadcast) {
        tracing::trace!(kind = event.kind(), "broadcast");
        let _ = self.tx.send(event);
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;

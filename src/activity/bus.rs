//! In-process activity feed
//!
//! The dashboard's activity panel, the CLI and tests all read the same
//! stream: one `broadcast` channel fed by the [`ActivityLogger`](super::ActivityLogger).
//! A subscriber only sees events emitted after it subscribed.

use super::{ActivityEvent, EventEmitter};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

/// Events kept for a slow subscriber before it starts lagging
const DEFAULT_CAPACITY: usize = 256;

/// Activity feed shared by every clone
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ActivityEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventEmitter for EventBus {
    fn emit(&self, event: ActivityEvent) {
        let summary = event.summary();
        match self.sender.send(event) {
            Ok(subscribers) => debug!(subscribers, "Activity published: {}", summary),
            // Nobody is watching the feed; the entry is not kept anywhere
            Err(_) => debug!("Activity dropped, no subscribers: {}", summary),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Take every event already delivered to `rx` without waiting.
///
/// Entries overwritten while the subscriber lagged are skipped with a warning.
pub fn drain(rx: &mut broadcast::Receiver<ActivityEvent>) -> Vec<ActivityEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(missed)) => {
                warn!(missed, "Activity feed lagged; oldest entries lost");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return events,
        }
    }
}

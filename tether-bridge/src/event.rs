//! Forwarder completion/failure events.
//!
//! The bridge core reports how each forwarding session ended on a bounded
//! channel; what the owning layer does with that (user-facing reporting,
//! retries, teardown) is outside the core. Workers never block on a dead
//! controller: a send to a closed channel is logged and dropped.

use tokio::sync::mpsc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ForwardEvent
// ---------------------------------------------------------------------------

/// How one forwarding session ended.
#[derive(Debug)]
pub enum ForwardEvent {
    // ---
    /// Forwarding ended normally: source EOF (END chunk sent, write half
    /// closed) or an external stop request.
    Done { uuid: Uuid, bytes: u64 },

    /// The poller reported the source errored. The loop stopped without
    /// emitting an END chunk — the descriptor may no longer be meaningful.
    SourceGone { uuid: Uuid, reason: String },

    /// A read or chunk-write failure ended the session. The same error is
    /// returned by the worker's join handle.
    Failed { uuid: Uuid, reason: String },
}

// ---------------------------------------------------------------------------
// EventTx
// ---------------------------------------------------------------------------

/// Cheap-clone sender handle. Cloned into every forwarder a controller
/// spawns.
#[derive(Clone)]
pub struct EventTx {
    // ---
    tx: mpsc::Sender<ForwardEvent>,
}

// ---

impl EventTx {
    // ---
    /// Send an event. Returns `false` if the channel has closed
    /// (controller exited).
    pub async fn send(&self, event: ForwardEvent) -> bool {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("event channel closed — dropping forward event");
            return false;
        }
        true
    }
}

// ---

/// Create the event channel pair: a sender for forwarders, a receiver for
/// the controller's owner.
pub fn event_channel(capacity: usize) -> (EventTx, mpsc::Receiver<ForwardEvent>) {
    // ---
    let (tx, rx) = mpsc::channel(capacity);
    (EventTx { tx }, rx)
}

//! Cross-context read and subscription marshaling.
//!
//! The status model and its cache have no internal locking; correctness
//! relies on every read and write happening on the single owner context.
//! The [`StatusGate`] is the sole sanctioned crossing point: a foreign
//! execution context (an HTTP handler, a socket task) sends a request into
//! the owner loop's queue and suspends until the loop services it, which
//! is bounded by one loop iteration.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::channel::{SubscriberChannel, SubscriberId};

/// A marshaled request for the owner loop.
#[derive(Debug)]
pub(crate) enum GateRequest {
    /// Read the full merged status document.
    Snapshot {
        /// Completed with the merged view.
        reply: oneshot::Sender<Value>,
    },
    /// Register a new subscriber.
    Subscribe {
        /// Completed with the subscriber's receiving half.
        reply: oneshot::Sender<SubscriberChannel>,
    },
    /// Deregister a subscriber.
    Unsubscribe {
        /// The subscriber to remove.
        id: SubscriberId,
    },
}

/// Errors crossing the gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The owner loop has shut down and will never answer.
    #[error("the state-owning loop has shut down")]
    HubGone,
}

/// Handle for marshaling requests onto the owner execution context.
///
/// Cloneable and callable from any context. Each request suspends only the
/// caller; the owner loop answers during its next service pass.
#[derive(Debug, Clone)]
pub struct StatusGate {
    tx: mpsc::UnboundedSender<GateRequest>,
}

impl StatusGate {
    pub(crate) const fn new(tx: mpsc::UnboundedSender<GateRequest>) -> Self {
        Self { tx }
    }

    /// Read a consistent point-in-time copy of the full merged status.
    ///
    /// The returned document always corresponds to some single completed
    /// publish (or the initial state), never a mix of two.
    pub async fn read_snapshot(&self) -> Result<Value, GateError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(GateRequest::Snapshot { reply })
            .map_err(|_| GateError::HubGone)?;
        rx.await.map_err(|_| GateError::HubGone)
    }

    /// Register a subscriber and receive its channel.
    ///
    /// The channel's first frame is always the `hello` envelope carrying
    /// the snapshot current at registration time.
    pub async fn subscribe(&self) -> Result<SubscriberChannel, GateError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(GateRequest::Subscribe { reply })
            .map_err(|_| GateError::HubGone)?;
        rx.await.map_err(|_| GateError::HubGone)
    }

    /// Deregister a subscriber.
    ///
    /// Best-effort: if the owner loop is already gone there is nothing
    /// left to deregister from.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let _ = self.tx.send(GateRequest::Unsubscribe { id });
    }
}

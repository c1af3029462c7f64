//! Per-subscriber ordered outbound queues.
//!
//! Every subscriber gets its own FIFO queue: the hub holds the sending
//! half and enqueues serialized envelopes without ever blocking; the
//! transport task holds the [`SubscriberChannel`] and drains it into the
//! socket with a single loop, so wire order always equals publish order.
//! Closing a channel cancels its backlog without touching the hub or any
//! other subscriber.

use std::sync::Arc;

use tokio::sync::mpsc;

/// A serialized push envelope, shared between all subscribers of a publish.
pub type Frame = Arc<str>;

/// Identifies one subscriber within the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a subscriber channel.
///
/// `Closed` is terminal; a closed channel yields no further frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Accepting and delivering frames.
    Open,
    /// Close requested; the backlog is being cancelled.
    Closing,
    /// No more frames will ever be delivered.
    Closed,
}

/// Receiving half of one subscriber's ordered outbound queue.
///
/// Obtained from the hub on subscribe. The owning transport task drains it
/// with [`recv`](Self::recv) and calls [`close`](Self::close) when the
/// connection goes away, whichever side notices first.
#[derive(Debug)]
pub struct SubscriberChannel {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<Frame>,
    state: ChannelState,
}

impl SubscriberChannel {
    pub(crate) const fn new(id: SubscriberId, rx: mpsc::UnboundedReceiver<Frame>) -> Self {
        Self {
            id,
            rx,
            state: ChannelState::Open,
        }
    }

    /// The hub-assigned identity of this subscriber.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// Receive the next frame, in exact enqueue order.
    ///
    /// Returns `None` once the channel is closed from either side; the
    /// channel is `Closed` afterwards.
    pub async fn recv(&mut self) -> Option<Frame> {
        if self.state != ChannelState::Open {
            return None;
        }
        let frame = self.rx.recv().await;
        if frame.is_none() {
            self.state = ChannelState::Closed;
        }
        frame
    }

    /// Close the channel and cancel its backlog.
    ///
    /// Frames already enqueued but not yet received are discarded; they
    /// would only ever reach a dead socket. Idempotent.
    pub fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }
        self.state = ChannelState::Closing;
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        self.state = ChannelState::Closed;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn pair() -> (mpsc::UnboundedSender<Frame>, SubscriberChannel) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, SubscriberChannel::new(SubscriberId::new(1), rx))
    }

    #[tokio::test]
    async fn frames_arrive_in_enqueue_order() {
        let (tx, mut channel) = pair();
        for i in 0..100 {
            tx.send(Frame::from(format!("frame-{i}"))).unwrap();
        }

        for i in 0..100 {
            let frame = channel.recv().await.unwrap();
            assert_eq!(frame.as_ref(), format!("frame-{i}"));
        }
    }

    #[tokio::test]
    async fn sender_drop_closes_channel() {
        let (tx, mut channel) = pair();
        tx.send(Frame::from("only")).unwrap();
        drop(tx);

        assert_eq!(channel.recv().await.unwrap().as_ref(), "only");
        assert!(channel.recv().await.is_none());
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn close_discards_backlog_and_rejects_new_frames() {
        let (tx, mut channel) = pair();
        tx.send(Frame::from("stale-1")).unwrap();
        tx.send(Frame::from("stale-2")).unwrap();

        channel.close();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(channel.recv().await.is_none());

        // The hub side now fails to enqueue, which is how it learns the
        // subscriber is gone.
        assert!(tx.send(Frame::from("late")).is_err());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_tx, mut channel) = pair();
        channel.close();
        channel.close();
        assert_eq!(channel.state(), ChannelState::Closed);
    }
}

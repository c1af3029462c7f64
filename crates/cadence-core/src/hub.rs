//! The publish/subscribe core.
//!
//! [`TelemetryHub`] owns the status model and its snapshot cache. The
//! simulation loop mutates the model through [`status_mut`], then calls
//! [`publish`] with the [`ChangeSet`] naming what it touched; the hub
//! rebuilds the dirty cache entries, composes one diff envelope, serializes
//! it once, and enqueues it on every live subscriber. Neither call ever
//! blocks on I/O.
//!
//! All entry points here are owner-context only. Foreign contexts reach
//! the hub through the [`StatusGate`] queue, which the owner loop services
//! once per iteration with [`service_gate`]. The hub pins the first thread
//! that uses an owner entry point and, in debug builds, aborts on any call
//! from another thread; release builds elide the check because the
//! constraint is a programming error, not a runtime condition.
//!
//! [`status_mut`]: TelemetryHub::status_mut
//! [`publish`]: TelemetryHub::publish
//! [`service_gate`]: TelemetryHub::service_gate

use std::cell::OnceCell;
use std::thread::ThreadId;

use cadence_types::{Category, ChangeSet, StatusModel};
use chrono::Utc;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cause;
use crate::channel::{Frame, SubscriberChannel, SubscriberId};
use crate::gate::{GateRequest, StatusGate};
use crate::snapshot::SnapshotCache;

/// The categories that, when all present in one publish, switch the
/// envelope from sparse to full status.
///
/// A set this broad means the receiver has to re-read everything anyway,
/// and one merged object is cheaper for it to reason about.
const FULL_STATUS: ChangeSet = ChangeSet::SESSION
    .union(ChangeSet::CONTENT)
    .union(ChangeSet::PERFORMANCE)
    .union(ChangeSet::MODIFIERS);

struct SubscriberEntry {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<Frame>,
}

impl core::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriberEntry").field("id", &self.id).finish()
    }
}

/// Owner of the status model, the snapshot cache, and the subscriber set.
#[derive(Debug)]
pub struct TelemetryHub {
    model: StatusModel,
    cache: SnapshotCache,
    subscribers: Vec<SubscriberEntry>,
    requests: mpsc::UnboundedReceiver<GateRequest>,
    next_subscriber: u64,
    owner: OnceCell<ThreadId>,
}

impl TelemetryHub {
    /// Create a hub owning `model`, plus the gate other contexts use to
    /// reach it.
    ///
    /// The hub is `Send`: construct it anywhere, move it onto the owner
    /// thread, and keep it there.
    pub fn new(model: StatusModel) -> (Self, StatusGate) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = SnapshotCache::new(&model);
        let hub = Self {
            model,
            cache,
            subscribers: Vec::new(),
            requests: rx,
            next_subscriber: 0,
            owner: OnceCell::new(),
        };
        (hub, StatusGate::new(tx))
    }

    /// Read-only view of the model. Owner context only.
    pub fn status(&self) -> &StatusModel {
        self.assert_owner();
        &self.model
    }

    /// Mutable access to the model for the simulation loop. Owner context
    /// only; every mutation must be followed by a [`publish`](Self::publish)
    /// flagging the touched categories.
    pub fn status_mut(&mut self) -> &mut StatusModel {
        self.assert_owner();
        &mut self.model
    }

    /// Rebuild the flagged cache categories, compose the diff envelope,
    /// and enqueue it on every live subscriber.
    ///
    /// Synchronous and cheap; never blocks on I/O. Subscribers whose
    /// channel is gone are detached here without affecting the rest.
    pub fn publish(&mut self, changes: ChangeSet, cause: &str) {
        self.assert_owner();
        self.cache.rebuild(&self.model, changes);

        let envelope = self.compose(changes, cause);
        let frame = match serde_json::to_string(&envelope) {
            Ok(text) => Frame::from(text),
            Err(e) => {
                warn!(cause, error = %e, "failed to serialize push envelope");
                return;
            }
        };

        self.subscribers.retain(|entry| {
            let alive = entry.tx.send(Frame::clone(&frame)).is_ok();
            if !alive {
                debug!(subscriber = %entry.id, "subscriber gone, detaching");
            }
            alive
        });
    }

    /// Register a subscriber. Owner context only; foreign contexts use
    /// [`StatusGate::subscribe`].
    ///
    /// The new channel's first frame is the `hello` envelope carrying the
    /// full snapshot current at this moment, enqueued before the channel
    /// can observe any publish.
    pub fn subscribe(&mut self) -> SubscriberChannel {
        self.assert_owner();
        let id = SubscriberId::new(self.next_subscriber);
        self.next_subscriber = self.next_subscriber.wrapping_add(1);

        let (tx, rx) = mpsc::unbounded_channel();
        match serde_json::to_string(&self.compose_hello()) {
            Ok(text) => {
                let _ = tx.send(Frame::from(text));
            }
            Err(e) => warn!(error = %e, "failed to serialize hello envelope"),
        }

        self.subscribers.push(SubscriberEntry { id, tx });
        info!(subscriber = %id, total = self.subscribers.len(), "subscriber attached");
        SubscriberChannel::new(id, rx)
    }

    /// Deregister a subscriber. Owner context only; foreign contexts use
    /// [`StatusGate::unsubscribe`].
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.assert_owner();
        let before = self.subscribers.len();
        self.subscribers.retain(|entry| entry.id != id);
        if self.subscribers.len() < before {
            info!(subscriber = %id, total = self.subscribers.len(), "subscriber detached");
        }
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Answer every pending gate request. Returns how many were serviced.
    ///
    /// The owner loop calls this once per iteration, which bounds how long
    /// a foreign context can stay suspended on the gate.
    pub fn service_gate(&mut self) -> usize {
        self.assert_owner();
        let mut serviced: usize = 0;
        while let Ok(request) = self.requests.try_recv() {
            serviced = serviced.saturating_add(1);
            match request {
                GateRequest::Snapshot { reply } => {
                    let _ = reply.send(self.cache.merged_view().clone());
                }
                GateRequest::Subscribe { reply } => {
                    let channel = self.subscribe();
                    // The requester may have vanished mid-handshake; take
                    // the channel back and drop its registration.
                    if let Err(channel) = reply.send(channel) {
                        self.unsubscribe(channel.id());
                    }
                }
                GateRequest::Unsubscribe { id } => self.unsubscribe(id),
            }
        }
        serviced
    }

    fn compose(&self, changes: ChangeSet, cause: &str) -> Value {
        let mut envelope = Map::new();
        envelope.insert(String::from("event"), json!(cause));
        envelope.insert(String::from("time"), json!(now_ms()));

        let status = if changes.contains_all(FULL_STATUS) {
            self.cache.merged_view().clone()
        } else {
            let mut sparse = Map::new();
            for category in changes.iter().filter(|c| c.in_status()) {
                if let Some(view) = self.cache.status_view(category) {
                    sparse.insert(category.key().to_owned(), view.clone());
                }
            }
            Value::Object(sparse)
        };
        envelope.insert(String::from("status"), status);

        if changes.contains(Category::EventDetail) {
            envelope.insert(
                String::from("eventDetail"),
                self.cache.event_detail_view().clone(),
            );
        }
        if changes.contains(Category::GenericEvent) {
            envelope.insert(
                String::from("genericEvent"),
                self.cache.generic_event_view().clone(),
            );
        }

        Value::Object(envelope)
    }

    fn compose_hello(&self) -> Value {
        json!({
            "event": cause::HELLO,
            "time": now_ms(),
            "status": self.cache.merged_view(),
        })
    }

    /// Pin the owner thread on first use and verify every later call.
    fn assert_owner(&self) {
        let current = std::thread::current().id();
        let owner = *self.owner.get_or_init(|| current);
        debug_assert_eq!(
            owner, current,
            "TelemetryHub touched from a non-owner thread; route through StatusGate"
        );
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use cadence_types::Content;

    use super::*;

    fn started_model() -> StatusModel {
        let mut model = StatusModel::default();
        model.session.scene = String::from("Song");
        model.content = Some(Content {
            name: String::from("Test Song"),
            sub_name: String::new(),
            author_name: String::from("Artist"),
            level_author_name: String::from("Mapper"),
            cover: None,
            hash: None,
            bpm: 128.0,
            note_jump_speed: 16.0,
            song_time_offset_ms: 0,
            length_ms: 120_000,
            start_ms: Some(1_700_000_000_000),
            paused_ms: None,
            difficulty: Some(String::from("Hard")),
            notes_count: 200,
            bombs_count: 0,
            obstacles_count: 4,
            max_score: 180_000,
            max_rank: String::from("SSS"),
            environment: None,
        });
        model
    }

    async fn next_json(channel: &mut SubscriberChannel) -> Value {
        let frame = channel.recv().await.unwrap();
        serde_json::from_str(frame.as_ref()).unwrap()
    }

    #[tokio::test]
    async fn first_event_is_hello_with_full_status() {
        let (mut hub, _gate) = TelemetryHub::new(StatusModel::default());
        let mut channel = hub.subscribe();

        let hello = next_json(&mut channel).await;
        assert_eq!(hello.get("event").unwrap(), "hello");
        let status = hello.get("status").unwrap();
        assert!(status.get("session").is_some());
        assert!(status.get("content").unwrap().is_null());
        assert!(status.get("playerSettings").is_some());
    }

    #[tokio::test]
    async fn performance_only_publish_is_sparse() {
        let (mut hub, _gate) = TelemetryHub::new(started_model());
        let mut channel = hub.subscribe();
        let _hello = channel.recv().await.unwrap();

        hub.status_mut().performance.score = 1200;
        hub.publish(ChangeSet::PERFORMANCE, cause::SCORE_CHANGED);

        let event = next_json(&mut channel).await;
        assert_eq!(event.get("event").unwrap(), "scoreChanged");
        let status = event.get("status").unwrap().as_object().unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(
            status.get("performance").unwrap().get("score").unwrap(),
            1200
        );
        assert!(event.get("eventDetail").is_none());
        assert!(event.get("genericEvent").is_none());
    }

    #[tokio::test]
    async fn broad_publish_carries_full_status() {
        let (mut hub, _gate) = TelemetryHub::new(started_model());
        let mut channel = hub.subscribe();
        let _hello = channel.recv().await.unwrap();

        hub.publish(ChangeSet::SESSION_REFRESH, cause::SONG_START);

        let event = next_json(&mut channel).await;
        let status = event.get("status").unwrap().as_object().unwrap();
        assert_eq!(status.len(), 5);
        for key in ["session", "content", "performance", "modifiers", "playerSettings"] {
            assert!(status.contains_key(key), "missing {key}");
        }
    }

    #[tokio::test]
    async fn core_four_categories_switch_to_full_status() {
        let (mut hub, _gate) = TelemetryHub::new(started_model());
        let mut channel = hub.subscribe();
        let _hello = channel.recv().await.unwrap();

        hub.publish(
            ChangeSet::SESSION
                | ChangeSet::CONTENT
                | ChangeSet::PERFORMANCE
                | ChangeSet::MODIFIERS,
            cause::SCENE,
        );

        // The full merged document is emitted, player settings included,
        // even though that category was not in the set.
        let event = next_json(&mut channel).await;
        let status = event.get("status").unwrap().as_object().unwrap();
        assert_eq!(status.len(), 5);
        assert!(status.contains_key("playerSettings"));
    }

    #[tokio::test]
    async fn event_detail_rides_alongside_sparse_status() {
        let (mut hub, _gate) = TelemetryHub::new(started_model());
        let mut channel = hub.subscribe();
        let _hello = channel.recv().await.unwrap();

        hub.status_mut().event_detail.note_id = Some(3);
        hub.publish(
            ChangeSet::PERFORMANCE | ChangeSet::EVENT_DETAIL,
            cause::NOTE_CUT,
        );

        let event = next_json(&mut channel).await;
        assert_eq!(event.get("event").unwrap(), "noteCut");
        let status = event.get("status").unwrap().as_object().unwrap();
        assert_eq!(status.len(), 1);
        assert!(status.contains_key("performance"));
        assert_eq!(event.get("eventDetail").unwrap().get("noteID").unwrap(), 3);
    }

    #[tokio::test]
    async fn generic_event_rides_on_its_own() {
        let (mut hub, _gate) = TelemetryHub::new(StatusModel::default());
        let mut channel = hub.subscribe();
        let _hello = channel.recv().await.unwrap();

        hub.status_mut().generic_event.event_type = 8;
        hub.status_mut().generic_event.value = 3;
        hub.publish(ChangeSet::GENERIC_EVENT, cause::EVENT);

        let event = next_json(&mut channel).await;
        assert_eq!(event.get("status").unwrap().as_object().unwrap().len(), 0);
        let generic = event.get("genericEvent").unwrap();
        assert_eq!(generic.get("type").unwrap(), 8);
        assert_eq!(generic.get("value").unwrap(), 3);
    }

    #[tokio::test]
    async fn frames_preserve_publish_order() {
        let (mut hub, _gate) = TelemetryHub::new(started_model());
        let mut channel = hub.subscribe();
        let _hello = channel.recv().await.unwrap();

        for score in 0..50u32 {
            hub.status_mut().performance.score = score;
            hub.publish(ChangeSet::PERFORMANCE, cause::SCORE_CHANGED);
        }

        for score in 0..50u32 {
            let event = next_json(&mut channel).await;
            assert_eq!(
                event
                    .get("status")
                    .unwrap()
                    .get("performance")
                    .unwrap()
                    .get("score")
                    .unwrap(),
                score
            );
        }
    }

    #[tokio::test]
    async fn late_subscriber_gets_current_snapshot_then_same_stream() {
        let (mut hub, _gate) = TelemetryHub::new(started_model());
        let mut first = hub.subscribe();
        let _hello = first.recv().await.unwrap();

        hub.status_mut().performance.score = 100;
        hub.publish(ChangeSet::PERFORMANCE, cause::SCORE_CHANGED);

        let mut second = hub.subscribe();
        let hello = next_json(&mut second).await;
        assert_eq!(
            hello
                .get("status")
                .unwrap()
                .get("performance")
                .unwrap()
                .get("score")
                .unwrap(),
            100
        );

        hub.status_mut().performance.score = 200;
        hub.publish(ChangeSet::PERFORMANCE, cause::SCORE_CHANGED);

        for channel in [&mut first, &mut second] {
            let event = next_json(channel).await;
            assert_eq!(
                event
                    .get("status")
                    .unwrap()
                    .get("performance")
                    .unwrap()
                    .get("score")
                    .unwrap(),
                200
            );
        }
    }

    #[tokio::test]
    async fn dead_subscriber_is_detached_without_disturbing_others() {
        let (mut hub, _gate) = TelemetryHub::new(started_model());
        let mut survivor = hub.subscribe();
        let _hello = survivor.recv().await.unwrap();
        let doomed = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(doomed);
        hub.status_mut().performance.score = 7;
        hub.publish(ChangeSet::PERFORMANCE, cause::SCORE_CHANGED);

        assert_eq!(hub.subscriber_count(), 1);
        let event = next_json(&mut survivor).await;
        assert_eq!(event.get("event").unwrap(), "scoreChanged");
    }

    #[tokio::test]
    async fn gate_snapshot_round_trip() {
        let (mut hub, gate) = TelemetryHub::new(started_model());

        let reader = tokio::spawn(async move { gate.read_snapshot().await });
        let mut serviced = hub.service_gate();
        while serviced == 0 {
            tokio::task::yield_now().await;
            serviced = hub.service_gate();
        }
        assert_eq!(serviced, 1);

        let snapshot = reader.await.unwrap().unwrap();
        assert!(snapshot.get("session").is_some());
        assert!(snapshot.get("content").unwrap().is_object());
    }

    #[tokio::test]
    async fn gate_subscribe_round_trip() {
        let (mut hub, gate) = TelemetryHub::new(StatusModel::default());

        let subscriber = tokio::spawn(async move { gate.subscribe().await });
        while hub.service_gate() == 0 {
            tokio::task::yield_now().await;
        }

        let mut channel = subscriber.await.unwrap().unwrap();
        assert_eq!(hub.subscriber_count(), 1);
        let hello = next_json(&mut channel).await;
        assert_eq!(hello.get("event").unwrap(), "hello");
    }

    #[tokio::test]
    async fn gate_fails_cleanly_after_hub_shutdown() {
        let (hub, gate) = TelemetryHub::new(StatusModel::default());
        drop(hub);

        assert!(matches!(
            gate.read_snapshot().await,
            Err(crate::gate::GateError::HubGone)
        ));
        assert!(matches!(
            gate.subscribe().await,
            Err(crate::gate::GateError::HubGone)
        ));
    }
}

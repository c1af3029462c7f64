//! Aggregation, diffing, and fan-out core of the Cadence telemetry
//! broadcaster.
//!
//! A simulation update loop owns a [`StatusModel`](cadence_types::StatusModel)
//! through the [`TelemetryHub`]; every mutation is published together with a
//! [`ChangeSet`](cadence_types::ChangeSet) naming the touched categories.
//! The hub rebuilds only the dirty parts of the [`SnapshotCache`], composes
//! a diff envelope, and enqueues it on every live [`SubscriberChannel`].
//! Foreign execution contexts never touch the model directly; they go
//! through the [`StatusGate`], a request/response channel serviced by the
//! owner loop.
//!
//! # Modules
//!
//! - [`hub`] -- The publish/subscribe core
//! - [`snapshot`] -- Per-category serialized views and the merged document
//! - [`resolver`] -- Stable-ID assignment for ephemeral note objects
//! - [`channel`] -- Per-subscriber ordered outbound queues
//! - [`gate`] -- Cross-context read/subscribe marshaling
//! - [`cause`] -- Well-known cause labels

pub mod cause;
pub mod channel;
pub mod gate;
pub mod hub;
pub mod resolver;
pub mod snapshot;

// Re-export primary types for convenience.
pub use channel::{ChannelState, Frame, SubscriberChannel, SubscriberId};
pub use gate::{GateError, StatusGate};
pub use hub::TelemetryHub;
pub use resolver::NoteIdentityResolver;
pub use snapshot::SnapshotCache;

//! # Laneway
//!
//! The concurrent dispatch core of an actor-style real-time
//! state-synchronization runtime. Addressable state cells ("lanes") live
//! inside host processes and are observed by local views and remote uplinks;
//! every state change fans out to all interested observers through a phased
//! relay: "will" notifications, the storage commit, then "did"
//! notifications, in a well-defined order, with per-observer failure
//! isolation and at most one hand-off to a background execution stage when
//! an observer cannot run on the mutating thread.
//!
//! The crate provides the relay engine, the lane binding contract a lane
//! implementation satisfies to participate in dispatch, and one concrete
//! lane: the ordered, key-augmented list lane.

// ---------------------------------------------------------------------------
// Core infrastructure modules
// ---------------------------------------------------------------------------

/// Lane addressing (URIs, the mesh/part/host/node/lane tuple).
pub mod address;

/// The lane binding contract between container and lane.
pub mod binding;

/// Keyed, indexable sequence storage.
pub mod data;

/// Error types and the recoverable/fatal classification.
pub mod error;

/// Typed value codecs.
pub mod form;

/// Copy-on-write observer registration.
pub mod observer;

/// The phased relay engine.
pub mod relay;

/// Background execution stage and deferred scheduling.
pub mod stage;

// ---------------------------------------------------------------------------
// Concrete lanes
// ---------------------------------------------------------------------------

/// Lane implementations (list lane).
pub mod lane;

// ---------------------------------------------------------------------------
// Convenience re-exports
// ---------------------------------------------------------------------------

pub use address::{LaneAddress, Uri};
pub use binding::{AgentContext, CommandMessage, LaneBinding, Uplink};
pub use data::{ListData, ListEntry, MemoryListData};
pub use error::LaneError;
pub use form::{Form, ValueForm};
pub use lane::list::observers::ListObserver;
pub use lane::list::{ListLaneModel, ListLaneView};
pub use observer::{ObserverEntry, ObserverId, ObserverSet};
pub use relay::{Relay, RelayCursor, RelayOutcome, RelayRun, Step};
pub use stage::{Schedule, Stage, StageConfig, Task, TimerRef, TokioStage};

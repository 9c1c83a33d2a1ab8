//! The lane binding contract.
//!
//! [`LaneBinding`] is the seam between the generic node/agent container and a
//! concrete lane implementation: identity, view lifecycle, uplink
//! bookkeeping, scheduling access, and inbound command intake. It carries no
//! dispatch logic of its own.
//!
//! Benign races — closing a view that already closed, closing an unknown
//! uplink — are no-ops, never errors. Unexpected errors propagate to the
//! container, which owns lane-level shutdown.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::address::{LaneAddress, Uri};
use crate::stage::{Schedule, Stage};

/// The agent context a view belongs to.
///
/// Agent lifecycle is an external collaborator; the dispatch core only needs
/// a stable identity to associate views with their owning agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentContext {
    /// Stable agent identity.
    pub id: Uuid,
    /// URI of the node the agent runs on.
    pub node_uri: Uri,
}

impl AgentContext {
    /// Create an agent context with a fresh identity.
    pub fn new(node_uri: impl Into<Uri>) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_uri: node_uri.into(),
        }
    }
}

/// A remote subscriber's link to a lane.
///
/// Uplinks are torn down consistently with local view teardown; the
/// remote-sync collaborator updates them as a side effect of relay phases.
#[derive(Debug, Clone, PartialEq)]
pub struct Uplink {
    /// Key identifying the link.
    pub key: Uuid,
    /// URI of the remote node holding the downlink end.
    pub remote_node_uri: Uri,
}

impl Uplink {
    /// Create an uplink with a fresh key.
    pub fn new(remote_node_uri: impl Into<Uri>) -> Self {
        Self {
            key: Uuid::new_v4(),
            remote_node_uri: remote_node_uri.into(),
        }
    }
}

/// An inbound command addressed to a lane, queued for later application.
///
/// The wire protocol that produced it is out of scope; by the time a command
/// reaches a binding it is already decoded to a structural body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// URI of the node the command targets.
    pub node_uri: Uri,
    /// URI of the lane the command targets.
    pub lane_uri: Uri,
    /// Structural command body.
    pub body: Value,
}

impl CommandMessage {
    /// Create a command message.
    pub fn new(node_uri: impl Into<Uri>, lane_uri: impl Into<Uri>, body: Value) -> Self {
        Self {
            node_uri: node_uri.into(),
            lane_uri: lane_uri.into(),
            body,
        }
    }
}

/// Everything the hosting container needs to route messages to a lane and to
/// let the lane participate in scheduling.
pub trait LaneBinding: Send + Sync {
    /// The view type this lane exposes to agents.
    type View;

    /// The lane's full address.
    fn address(&self) -> &LaneAddress;

    /// URI of the mesh the lane's host belongs to.
    fn mesh_uri(&self) -> &Uri {
        &self.address().mesh_uri
    }

    /// Partition key within the mesh.
    fn part_key(&self) -> &Value {
        &self.address().part_key
    }

    /// URI of the host process.
    fn host_uri(&self) -> &Uri {
        &self.address().host_uri
    }

    /// URI of the owning node.
    fn node_uri(&self) -> &Uri {
        &self.address().node_uri
    }

    /// URI of the lane.
    fn lane_uri(&self) -> &Uri {
        &self.address().lane_uri
    }

    /// The deferred-callback scheduler shared with the container.
    fn schedule(&self) -> Arc<dyn Schedule>;

    /// The background execution stage suspended relays resume on.
    fn stage(&self) -> Arc<dyn Stage>;

    /// The view opened by `agent`, if any.
    fn lane_view(&self, agent: &AgentContext) -> Option<Arc<Self::View>>;

    /// Open a view on this lane. Opening an already-open view is a no-op.
    fn open_lane_view(&self, view: Arc<Self::View>);

    /// Close a view. Closing an already-closed view is a no-op.
    fn close_lane_view(&self, view: &Arc<Self::View>);

    /// The currently open uplinks.
    fn uplinks(&self) -> Vec<Uplink>;

    /// Register a remote subscriber's uplink.
    fn open_uplink(&self, uplink: Uplink);

    /// Close the uplink with `key`. Unknown keys are a no-op.
    fn close_uplink(&self, key: &Uuid);

    /// Accept an inbound command for later application.
    fn push_up_command(&self, message: CommandMessage);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

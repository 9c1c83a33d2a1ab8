//! Lane addressing.
//!
//! A lane is identified by an immutable tuple of mesh, part, host, node and
//! lane coordinates. Addresses are constructed once when a lane is opened and
//! never mutated afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A runtime URI, held as an opaque normalized string.
///
/// Resolution of meshes, parts, hosts and nodes happens in the routing layer
/// above this core; here a URI is only an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    /// Create a URI from a string.
    pub fn new(uri: impl Into<String>) -> Self {
        Uri(uri.into())
    }

    /// The empty URI.
    pub fn empty() -> Self {
        Uri(String::new())
    }

    /// The URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty URI.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(uri: &str) -> Self {
        Uri::new(uri)
    }
}

impl From<String> for Uri {
    fn from(uri: String) -> Self {
        Uri(uri)
    }
}

/// The full coordinates of a lane within the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneAddress {
    /// URI of the mesh the lane's host belongs to.
    pub mesh_uri: Uri,
    /// Structural key of the partition within the mesh.
    pub part_key: Value,
    /// URI of the host process.
    pub host_uri: Uri,
    /// URI of the node (agent instance) owning the lane.
    pub node_uri: Uri,
    /// URI of the lane itself, relative to the node.
    pub lane_uri: Uri,
}

impl LaneAddress {
    /// Create a fully-qualified lane address.
    pub fn new(
        mesh_uri: impl Into<Uri>,
        part_key: Value,
        host_uri: impl Into<Uri>,
        node_uri: impl Into<Uri>,
        lane_uri: impl Into<Uri>,
    ) -> Self {
        Self {
            mesh_uri: mesh_uri.into(),
            part_key,
            host_uri: host_uri.into(),
            node_uri: node_uri.into(),
            lane_uri: lane_uri.into(),
        }
    }

    /// A local address with only node and lane coordinates filled in.
    ///
    /// Used by tests and by single-process deployments that have no mesh.
    pub fn local(node_uri: impl Into<Uri>, lane_uri: impl Into<Uri>) -> Self {
        Self {
            mesh_uri: Uri::empty(),
            part_key: Value::Null,
            host_uri: Uri::empty(),
            node_uri: node_uri.into(),
            lane_uri: lane_uri.into(),
        }
    }
}

impl fmt::Display for LaneAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}#{}", self.host_uri, self.node_uri, self.lane_uri)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_roundtrip() {
        let uri = Uri::new("warp://host.example");
        assert_eq!(uri.as_str(), "warp://host.example");
        assert_eq!(uri.to_string(), "warp://host.example");
        assert!(!uri.is_empty());
        assert!(Uri::empty().is_empty());
    }

    #[test]
    fn test_local_address() {
        let address = LaneAddress::local("/unit/1", "list");
        assert!(address.mesh_uri.is_empty());
        assert_eq!(address.part_key, Value::Null);
        assert_eq!(address.node_uri.as_str(), "/unit/1");
        assert_eq!(address.lane_uri.as_str(), "list");
        assert_eq!(address.to_string(), "/unit/1#list");
    }
}

//! Nodes: OSM points.

use crate::child::Child;
use crate::element::{ChangesetId, ChildId, Tags, UserId};
use crate::update::Update;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Primary key of a node. The id and version together identify a node version.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub i64);

/// A single version of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id
    pub id: NodeId,
    /// Latitude
    #[serde(default)]
    pub lat: f64,
    /// Longitude
    #[serde(default)]
    pub lon: f64,
    /// Display name of the editing user
    #[serde(default)]
    pub user: String,
    /// Id of the editing user
    #[serde(rename = "uid", default)]
    pub user_id: UserId,
    /// False if this version deleted the node
    pub visible: bool,
    /// Version number
    pub version: u32,
    /// Changeset this version was uploaded in
    #[serde(rename = "changeset", default)]
    pub changeset_id: ChangesetId,
    /// Edit time
    pub timestamp: DateTime<Utc>,
    /// Tags
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    /// Estimated time the version was committed and made visible in the
    /// central database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed: Option<DateTime<Utc>>,
}

impl Child for Node {
    fn id(&self) -> ChildId {
        ChildId::node(self.id.0)
    }

    fn version_index(&self) -> usize {
        self.version as usize
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn committed(&self) -> Option<DateTime<Utc>> {
        self.committed
    }

    fn update(&self) -> Update {
        Update {
            index: 0,
            version: self.version,
            timestamp: self.available_at(),
            changeset_id: self.changeset_id,
            lat: Some(self.lat),
            lon: Some(self.lon),
        }
    }
}

/// A set of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nodes(pub Vec<Node>);

impl Nodes {
    /// Sort first by id and then by version, ascending.
    pub fn sort_by_id_version(&mut self) {
        self.0.sort_by_key(|n| (n.id, n.version));
    }
}

impl Deref for Nodes {
    type Target = Vec<Node>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Nodes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

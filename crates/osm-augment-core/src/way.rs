//! Ways: ordered lists of nodes.

use crate::child::Child;
use crate::element::{ChangesetId, ChildId, ElementType, Tags, UserId};
use crate::node::NodeId;
use crate::update::{MemberUpdates, Update, UpdateSlot, Updates};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Primary key of a way.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WayId(pub i64);

/// A node reference of a way, optionally annotated with the node version
/// that was in effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WayNode {
    /// Referenced node
    #[serde(rename = "ref")]
    pub id: NodeId,
    /// Resolved node version, zero if unknown
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u32,
    /// Changeset of the resolved node version
    #[serde(rename = "changeset", default, skip_serializing_if = "ChangesetId::is_zero")]
    pub changeset_id: ChangesetId,
    /// Latitude of the resolved node version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude of the resolved node version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl WayNode {
    /// An unresolved reference to a node.
    #[must_use]
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

impl UpdateSlot for WayNode {
    fn apply(&mut self, update: &Update) {
        self.version = update.version;
        self.changeset_id = update.changeset_id;
        self.lat = update.lat;
        self.lon = update.lon;
    }
}

/// A single version of a way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Way {
    /// Way id
    pub id: WayId,
    /// Display name of the editing user
    #[serde(default)]
    pub user: String,
    /// Id of the editing user
    #[serde(rename = "uid", default)]
    pub user_id: UserId,
    /// False if this version deleted the way
    pub visible: bool,
    /// Version number
    pub version: u32,
    /// Changeset this version was uploaded in
    #[serde(rename = "changeset", default)]
    pub changeset_id: ChangesetId,
    /// Edit time
    pub timestamp: DateTime<Utc>,
    /// Ordered node references
    #[serde(default)]
    pub nodes: Vec<WayNode>,
    /// Tags
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    /// Estimated time the version was committed and made visible in the
    /// central database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed: Option<DateTime<Utc>>,
    /// Changes to the node references that did not bump the way's version
    #[serde(default, skip_serializing_if = "Updates::is_empty")]
    pub updates: Updates,
}

impl MemberUpdates for Way {
    type Slot = WayNode;

    fn slots_and_updates(&mut self) -> (&mut [WayNode], &Updates) {
        (&mut self.nodes, &self.updates)
    }
}

impl Child for Way {
    fn id(&self) -> ChildId {
        ChildId::new(ElementType::Way, self.id.0)
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
            lat: None,
            lon: None,
        }
    }
}

/// A set of ways.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ways(pub Vec<Way>);

impl Ways {
    /// Sort first by id and then by version, ascending.
    pub fn sort_by_id_version(&mut self) {
        self.0.sort_by_key(|w| (w.id, w.version));
    }
}

impl Deref for Ways {
    type Target = Vec<Way>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Ways {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &u32) -> bool {
    *v == 0
}

//! Shared element identifiers and the element union.

use crate::child::Child;
use crate::node::Node;
use crate::relation::Relation;
use crate::update::Update;
use crate::way::Way;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value tags attached to an element.
pub type Tags = BTreeMap<String, String>;

/// The kind of an OSM element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// A point
    Node,
    /// An ordered list of nodes
    Way,
    /// A collection of members of any type
    Relation,
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::Node => write!(f, "node"),
            ElementType::Way => write!(f, "way"),
            ElementType::Relation => write!(f, "relation"),
        }
    }
}

/// Identifier of the changeset an element version was uploaded in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChangesetId(pub i64);

impl ChangesetId {
    /// True for the zero value, which marks an unset changeset.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Identifier of the user that made an edit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Stable identity of a referenced child element.
///
/// Two versions of the same element share a `ChildId`. Only used for
/// lookup and logging, never for ordering versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChildId {
    /// Element kind of the child
    #[serde(rename = "type")]
    pub kind: ElementType,
    /// Element id within its kind
    #[serde(rename = "ref")]
    pub reference: i64,
}

impl ChildId {
    /// Create a child id.
    #[must_use]
    pub fn new(kind: ElementType, reference: i64) -> Self {
        Self { kind, reference }
    }

    /// Child id of a node.
    #[must_use]
    pub fn node(reference: i64) -> Self {
        Self::new(ElementType::Node, reference)
    }
}

impl std::fmt::Display for ChildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.reference)
    }
}

/// Any OSM element. Used as the child type of relation members, which may
/// reference nodes, ways and other relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// A node version
    Node(Node),
    /// A way version
    Way(Way),
    /// A relation version
    Relation(Relation),
}

impl Element {
    fn inner(&self) -> &dyn Child {
        match self {
            Element::Node(n) => n,
            Element::Way(w) => w,
            Element::Relation(r) => r,
        }
    }
}

impl From<Node> for Element {
    fn from(n: Node) -> Self {
        Element::Node(n)
    }
}

impl From<Way> for Element {
    fn from(w: Way) -> Self {
        Element::Way(w)
    }
}

impl From<Relation> for Element {
    fn from(r: Relation) -> Self {
        Element::Relation(r)
    }
}

impl Child for Element {
    fn id(&self) -> ChildId {
        self.inner().id()
    }

    fn version_index(&self) -> usize {
        self.inner().version_index()
    }

    fn visible(&self) -> bool {
        self.inner().visible()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.inner().timestamp()
    }

    fn committed(&self) -> Option<DateTime<Utc>> {
        self.inner().committed()
    }

    fn update(&self) -> Update {
        self.inner().update()
    }
}

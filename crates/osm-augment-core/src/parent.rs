//! Parent elements and the per-reference child histories backing them.

use crate::child::{Child, ChildList};
use crate::element::{ChildId, Element, ElementType};
use crate::history::Histories;
use crate::node::Node;
use crate::relation::Relation;
use crate::way::Way;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a parent, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentId {
    /// Element kind of the parent
    #[serde(rename = "type")]
    pub kind: ElementType,
    /// Element id within its kind
    pub id: i64,
}

impl std::fmt::Display for ParentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A version of an element whose value depends on the elements it references.
pub trait Parent {
    /// Child element type of the references.
    type Child: Child;

    /// Identity, for logging.
    fn id(&self) -> ParentId;

    /// Version number of this parent version.
    fn version(&self) -> u32;

    /// False if this version deleted the parent.
    fn visible(&self) -> bool;

    /// Recorded edit time.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Confirmed time the version became visible downstream, if known.
    fn committed(&self) -> Option<DateTime<Utc>>;

    /// The references, in order.
    fn refs(&self) -> Vec<ChildId>;

    /// One child history per reference, in the same order as [`Parent::refs`].
    fn children(&self) -> &[ChildList<Self::Child>];
}

/// A way version together with the histories of its nodes.
#[derive(Debug, Clone)]
pub struct WayParent {
    /// The way version
    pub way: Way,
    /// History of each referenced node, indexed like `way.nodes`
    pub children: Vec<ChildList<Node>>,
}

impl WayParent {
    /// Pair a way version with the histories of its nodes.
    #[must_use]
    pub fn new(way: Way, children: Vec<ChildList<Node>>) -> Self {
        debug_assert_eq!(way.nodes.len(), children.len());
        Self { way, children }
    }

    /// Look up the history of every node the way references. Nodes with no
    /// known history get an empty list.
    #[must_use]
    pub fn assemble(way: Way, nodes: &Histories<Node>) -> Self {
        let children = way
            .nodes
            .iter()
            .map(|wn| nodes.list(&ChildId::node(wn.id.0)))
            .collect();
        Self::new(way, children)
    }
}

impl Parent for WayParent {
    type Child = Node;

    fn id(&self) -> ParentId {
        ParentId {
            kind: ElementType::Way,
            id: self.way.id.0,
        }
    }

    fn version(&self) -> u32 {
        self.way.version
    }

    fn visible(&self) -> bool {
        self.way.visible
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.way.timestamp
    }

    fn committed(&self) -> Option<DateTime<Utc>> {
        self.way.committed
    }

    fn refs(&self) -> Vec<ChildId> {
        self.way
            .nodes
            .iter()
            .map(|wn| ChildId::node(wn.id.0))
            .collect()
    }

    fn children(&self) -> &[ChildList<Node>] {
        &self.children
    }
}

/// A relation version together with the histories of its members.
#[derive(Debug, Clone)]
pub struct RelationParent {
    /// The relation version
    pub relation: Relation,
    /// History of each member, indexed like `relation.members`
    pub children: Vec<ChildList<Element>>,
}

impl RelationParent {
    /// Pair a relation version with the histories of its members.
    #[must_use]
    pub fn new(relation: Relation, children: Vec<ChildList<Element>>) -> Self {
        debug_assert_eq!(relation.members.len(), children.len());
        Self { relation, children }
    }

    /// Look up the history of every member. Members with no known history
    /// get an empty list.
    #[must_use]
    pub fn assemble(relation: Relation, elements: &Histories<Element>) -> Self {
        let children = relation
            .members
            .iter()
            .map(|m| elements.list(&m.child_id()))
            .collect();
        Self::new(relation, children)
    }
}

impl Parent for RelationParent {
    type Child = Element;

    fn id(&self) -> ParentId {
        ParentId {
            kind: ElementType::Relation,
            id: self.relation.id.0,
        }
    }

    fn version(&self) -> u32 {
        self.relation.version
    }

    fn visible(&self) -> bool {
        self.relation.visible
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.relation.timestamp
    }

    fn committed(&self) -> Option<DateTime<Utc>> {
        self.relation.committed
    }

    fn refs(&self) -> Vec<ChildId> {
        self.relation.members.iter().map(|m| m.child_id()).collect()
    }

    fn children(&self) -> &[ChildList<Element>] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::relation::Member;
    use crate::way::{WayId, WayNode};

    #[test]
    fn way_parent_refs_follow_node_order() {
        let way = Way {
            id: WayId(4),
            nodes: vec![WayNode::new(NodeId(9)), WayNode::new(NodeId(3))],
            ..Way::default()
        };
        let nodes: Histories<Node> = vec![Node {
            id: NodeId(3),
            version: 1,
            visible: true,
            ..Node::default()
        }]
        .into_iter()
        .collect();

        let parent = WayParent::assemble(way, &nodes);

        assert_eq!(parent.id().to_string(), "way/4");
        assert_eq!(parent.refs(), vec![ChildId::node(9), ChildId::node(3)]);
        assert!(parent.children()[0].is_empty());
        assert_eq!(parent.children()[1].len(), 1);
    }

    #[test]
    fn relation_parent_refs_keep_member_kind() {
        let relation = Relation {
            members: vec![
                Member::new(ElementType::Way, 1, "outer"),
                Member::new(ElementType::Node, 1, "label"),
            ],
            ..Relation::default()
        };

        let parent = RelationParent::assemble(relation, &Histories::default());

        assert_eq!(
            parent.refs(),
            vec![
                ChildId::new(ElementType::Way, 1),
                ChildId::new(ElementType::Node, 1)
            ]
        );
        assert_eq!(parent.children().len(), 2);
    }
}

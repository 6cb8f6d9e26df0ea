//! Grouping raw element versions into per-child histories.

use crate::child::{Child, ChildList};
use crate::element::ChildId;
use std::collections::HashMap;

/// Frozen version histories, keyed by child identity.
#[derive(Debug)]
pub struct Histories<C> {
    lists: HashMap<ChildId, ChildList<C>>,
}

impl<C> Default for Histories<C> {
    fn default() -> Self {
        Self {
            lists: HashMap::new(),
        }
    }
}

impl<C: Child> Histories<C> {
    /// History of the given child, shared with every other caller. Unknown
    /// children get an empty list.
    #[must_use]
    pub fn list(&self, id: &ChildId) -> ChildList<C> {
        self.lists.get(id).cloned().unwrap_or_default()
    }

    /// Number of distinct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// True if no versions were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl<C: Child> FromIterator<C> for Histories<C> {
    /// Group versions by child and sort each group by timestamp, falling
    /// back to version order for equal timestamps.
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let mut groups: HashMap<ChildId, Vec<C>> = HashMap::new();
        for c in iter {
            groups.entry(c.id()).or_default().push(c);
        }

        let lists = groups
            .into_iter()
            .map(|(id, mut versions)| {
                versions.sort_by_key(|c| (c.timestamp(), c.version_index()));
                (id, ChildList::new(versions))
            })
            .collect();

        Self { lists }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeId};
    use chrono::{TimeZone, Utc};

    fn node(id: i64, version: u32, second: u32) -> Node {
        Node {
            id: NodeId(id),
            version,
            visible: true,
            timestamp: Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, second).unwrap(),
            ..Node::default()
        }
    }

    #[test]
    fn groups_and_sorts_versions() {
        let histories: Histories<Node> =
            vec![node(2, 2, 30), node(1, 1, 5), node(2, 1, 10), node(1, 2, 50)]
                .into_iter()
                .collect();

        assert_eq!(histories.len(), 2);

        let versions: Vec<u32> = histories
            .list(&ChildId::node(2))
            .iter()
            .map(|n| n.version)
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn unknown_child_is_empty() {
        let histories: Histories<Node> = vec![node(1, 1, 0)].into_iter().collect();
        assert!(histories.list(&ChildId::node(99)).is_empty());
    }
}

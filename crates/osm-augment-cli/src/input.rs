//! History file loading and per-element grouping.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use osm_augment_core::augment::state_before;
use osm_augment_core::{
    Augmenter, ChildList, Element, Histories, Node, Nodes, Relation, Relations, Way, Ways,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Full version history of a set of elements.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HistoryFile {
    /// Every node version
    #[serde(default)]
    pub nodes: Nodes,
    /// Every way version
    #[serde(default)]
    pub ways: Ways,
    /// Every relation version
    #[serde(default)]
    pub relations: Relations,
}

/// Augmented way and relation versions.
#[derive(Debug, Default, Serialize)]
pub struct Augmented {
    /// Augmented way versions, by id then version
    pub ways: Vec<Way>,
    /// Augmented relation versions, by id then version
    pub relations: Vec<Relation>,
}

impl HistoryFile {
    /// Read a JSON history file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut history: Self = serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        history.nodes.sort_by_id_version();
        history.ways.sort_by_id_version();
        history.relations.sort_by_id_version();

        tracing::info!(
            path = %path.display(),
            nodes = history.nodes.len(),
            ways = history.ways.len(),
            relations = history.relations.len(),
            "Loaded history"
        );
        Ok(history)
    }

    /// Augment every way and relation history.
    ///
    /// # Errors
    ///
    /// Returns error if a resolved snapshot cannot be written to its element.
    pub fn augment(&self, augmenter: &Augmenter) -> Result<Augmented> {
        let nodes: Histories<Node> = self.nodes.iter().cloned().collect();
        let elements: Histories<Element> = self
            .nodes
            .iter()
            .cloned()
            .map(Element::from)
            .chain(self.ways.iter().cloned().map(Element::from))
            .chain(self.relations.iter().cloned().map(Element::from))
            .collect();

        let mut augmented = Augmented::default();

        for (id, versions) in group_by(&self.ways, |w| w.id.0) {
            let ways = augmenter
                .augment_way_history(&versions, &nodes)
                .with_context(|| format!("Failed to augment way {id}"))?;
            augmented.ways.extend(ways);
        }

        for (id, versions) in group_by(&self.relations, |r| r.id.0) {
            let relations = augmenter
                .augment_relation_history(&versions, &elements)
                .with_context(|| format!("Failed to augment relation {id}"))?;
            augmented.relations.extend(relations);
        }

        tracing::info!(
            ways = augmented.ways.len(),
            relations = augmented.relations.len(),
            threshold_secs = augmenter.threshold().num_seconds(),
            "Augmented history"
        );
        Ok(augmented)
    }
}

impl Augmented {
    /// Every element as it was just before `at`, with member updates replayed.
    /// Elements that did not exist yet or were deleted are left out.
    ///
    /// # Errors
    ///
    /// Returns error if an update refers to a missing member slot.
    pub fn state_before(&self, at: DateTime<Utc>) -> Result<Augmented> {
        let mut state = Augmented::default();

        for (id, versions) in group_by(&self.ways, |w| w.id.0) {
            let history = ChildList::new(versions);
            if let Some(way) = state_before(&history, at)
                .with_context(|| format!("Failed to replay way {id}"))?
            {
                state.ways.push(way);
            }
        }

        for (id, versions) in group_by(&self.relations, |r| r.id.0) {
            let history = ChildList::new(versions);
            if let Some(relation) = state_before(&history, at)
                .with_context(|| format!("Failed to replay relation {id}"))?
            {
                state.relations.push(relation);
            }
        }

        Ok(state)
    }
}

/// Group versions by element id, keeping their order within each group and
/// sorting each group by timestamp.
fn group_by<E, F>(versions: &[E], id: F) -> BTreeMap<i64, Vec<E>>
where
    E: Clone + osm_augment_core::Child,
    F: Fn(&E) -> i64,
{
    let mut groups: BTreeMap<i64, Vec<E>> = BTreeMap::new();
    for v in versions {
        groups.entry(id(v)).or_default().push(v.clone());
    }
    for group in groups.values_mut() {
        group.sort_by_key(|v| (v.timestamp(), v.version_index()));
    }
    groups
}

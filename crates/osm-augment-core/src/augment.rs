//! Augmentation of parent version histories.
//!
//! For each parent version, every reference is resolved to the child version
//! in effect at the parent's timestamp. Child edits that happen between two
//! parent versions become member updates on the earlier version.

use crate::child::{Child, ChildList};
use crate::element::Element;
use crate::history::Histories;
use crate::node::Node;
use crate::parent::{Parent, ParentId, RelationParent, WayParent};
use crate::relation::Relation;
use crate::update::{self, MemberUpdates, Update, UpdateError, UpdateSlot, Updates};
use crate::way::Way;
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;

/// The children of one parent version, resolved at a point in time.
#[derive(Debug)]
pub struct Snapshot<'a, C> {
    /// Parent identity
    pub parent: ParentId,
    /// Parent version number
    pub version: u32,
    /// Time the children were resolved at
    pub at: DateTime<Utc>,
    /// Resolved child per reference; `None` if no version could be determined
    pub children: Vec<Option<&'a C>>,
}

impl<C: Child> Snapshot<'_, C> {
    /// True if every reference resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.children.iter().all(Option::is_some)
    }

    /// Positions of the references that did not resolve.
    pub fn unknown(&self) -> impl Iterator<Item = usize> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.is_none().then_some(i))
    }

    /// Write each resolved child's version, changeset and location into the
    /// matching slot. Unresolved slots are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::IndexOutOfRange`] if there are fewer slots than
    /// resolved references.
    pub fn apply_to<S: UpdateSlot>(&self, slots: &mut [S]) -> Result<usize, UpdateError> {
        let mut applied = 0;
        for (index, child) in self.children.iter().enumerate() {
            let Some(child) = child else { continue };
            update::apply_update(slots, &Update { index, ..child.update() })?;
            applied += 1;
        }
        Ok(applied)
    }
}

/// Resolves parent versions against their children's histories.
#[derive(Debug, Clone, Copy)]
pub struct Augmenter {
    threshold: Duration,
    parallel: bool,
}

impl Augmenter {
    /// Create an augmenter tolerating `threshold` of clock skew between a
    /// parent and its children.
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            parallel: false,
        }
    }

    /// Augment independent parents on the rayon thread pool.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The clock skew tolerance.
    #[must_use]
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Resolve every reference of a parent version at its timestamp.
    pub fn augment<'a, P: Parent>(&self, parent: &'a P) -> Snapshot<'a, P::Child> {
        let at = parent.timestamp();
        let children = parent
            .children()
            .iter()
            .map(|cl| cl.find_visible(at, self.threshold))
            .collect();

        let snapshot = Snapshot {
            parent: parent.id(),
            version: parent.version(),
            at,
            children,
        };
        log_snapshot(parent, &snapshot);
        snapshot
    }

    /// Resolve every reference of a parent version to the latest child
    /// version available strictly before `at`. No fuzziness applies.
    pub fn resolve_before<'a, P: Parent>(
        &self,
        parent: &'a P,
        at: DateTime<Utc>,
    ) -> Snapshot<'a, P::Child> {
        let children = parent
            .children()
            .iter()
            .map(|cl| cl.last_visible_before(at))
            .collect();

        let snapshot = Snapshot {
            parent: parent.id(),
            version: parent.version(),
            at,
            children,
        };
        log_snapshot(parent, &snapshot);
        snapshot
    }

    /// Augment independent parents, in parallel if enabled.
    pub fn augment_all<'a, P>(&self, parents: &'a [P]) -> Vec<Snapshot<'a, P::Child>>
    where
        P: Parent + Sync,
        P::Child: Sync,
    {
        if self.parallel {
            parents.par_iter().map(|p| self.augment(p)).collect()
        } else {
            parents.iter().map(|p| self.augment(p)).collect()
        }
    }

    /// Member updates for a parent version.
    ///
    /// Every visible child version newer than the resolved one that becomes
    /// available before `until` (the next parent version's timestamp, if any)
    /// yields an update for its slot. For an unresolved slot, versions
    /// available after the parent's timestamp count as newer. A version is
    /// dropped when a higher version was already available at or before it,
    /// so a slot's version never decreases during replay. Deleted parent
    /// versions get no updates.
    #[must_use]
    pub fn compute_updates<P: Parent>(
        &self,
        parent: &P,
        snapshot: &Snapshot<'_, P::Child>,
        until: Option<DateTime<Utc>>,
    ) -> Updates {
        let mut updates = Updates::new();
        if !parent.visible() {
            return updates;
        }

        let after = parent.timestamp();
        for (index, (list, resolved)) in parent
            .children()
            .iter()
            .zip(&snapshot.children)
            .enumerate()
        {
            for c in list.iter().filter(|c| c.visible()) {
                let available = c.available_at();
                if until.is_some_and(|until| available >= until) {
                    continue;
                }
                // a stale commit estimate must not roll the slot back
                if superseded(list, c) {
                    continue;
                }

                let newer = match resolved {
                    Some(r) => c.version_index() > r.version_index(),
                    None => available > after,
                };
                if newer {
                    updates.push(Update { index, ..c.update() });
                }
            }
        }

        updates.sort_by_timestamp();
        updates
    }

    /// Augment the full history of one way, ascending by version.
    ///
    /// Each returned version has its node references filled with the
    /// resolved node versions and carries the node edits made before the
    /// next way version as updates.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError`] if a snapshot cannot be written to the way.
    pub fn augment_way_history(
        &self,
        versions: &[Way],
        nodes: &Histories<Node>,
    ) -> Result<Vec<Way>, UpdateError> {
        let parents: Vec<WayParent> = versions
            .iter()
            .map(|w| WayParent::assemble(w.clone(), nodes))
            .collect();
        let snapshots = self.augment_all(&parents);

        let mut augmented = Vec::with_capacity(parents.len());
        for (i, (parent, snapshot)) in parents.iter().zip(&snapshots).enumerate() {
            let until = parents.get(i + 1).map(Parent::timestamp);
            let mut way = parent.way.clone();
            snapshot.apply_to(&mut way.nodes)?;
            way.updates = self.compute_updates(parent, snapshot, until);
            augmented.push(way);
        }
        Ok(augmented)
    }

    /// Augment the full history of one relation, ascending by version.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError`] if a snapshot cannot be written to the relation.
    pub fn augment_relation_history(
        &self,
        versions: &[Relation],
        elements: &Histories<Element>,
    ) -> Result<Vec<Relation>, UpdateError> {
        let parents: Vec<RelationParent> = versions
            .iter()
            .map(|r| RelationParent::assemble(r.clone(), elements))
            .collect();
        let snapshots = self.augment_all(&parents);

        let mut augmented = Vec::with_capacity(parents.len());
        for (i, (parent, snapshot)) in parents.iter().zip(&snapshots).enumerate() {
            let until = parents.get(i + 1).map(Parent::timestamp);
            let mut relation = parent.relation.clone();
            snapshot.apply_to(&mut relation.members)?;
            relation.updates = self.compute_updates(parent, snapshot, until);
            augmented.push(relation);
        }
        Ok(augmented)
    }
}

/// The state of an augmented element just before `at`: the version that
/// most recently became available before `at`, with its member updates
/// before `at` applied. Versions superseded by a higher version that was
/// available no later are skipped. `None` if the element did not exist yet
/// or was deleted.
///
/// # Errors
///
/// Returns the first [`UpdateError`] raised while replaying updates.
pub fn state_before<E>(history: &ChildList<E>, at: DateTime<Utc>) -> Result<Option<E>, UpdateError>
where
    E: Child + MemberUpdates + Clone,
{
    let Some(current) = history
        .iter()
        .filter(|e| e.available_at() < at && !superseded(history, e))
        .max_by_key(|e| (e.available_at(), e.version_index()))
    else {
        return Ok(None);
    };
    if !current.visible() {
        return Ok(None);
    }

    let mut state = current.clone();
    // updates strictly before `at`
    state.apply_updates_up_to(at - Duration::nanoseconds(1))?;
    Ok(Some(state))
}

/// True if a higher version of the same child was available at or before `c`.
fn superseded<C: Child>(versions: &[C], c: &C) -> bool {
    let available = c.available_at();
    versions
        .iter()
        .any(|v| v.version_index() > c.version_index() && v.available_at() <= available)
}

fn log_snapshot<P: Parent>(parent: &P, snapshot: &Snapshot<'_, P::Child>) {
    let unknown = snapshot.unknown().count();
    tracing::debug!(
        parent = %snapshot.parent,
        version = snapshot.version,
        at = %snapshot.at,
        refs = snapshot.children.len(),
        unknown,
        "Resolved parent version"
    );

    if unknown > 0 && tracing::enabled!(tracing::Level::TRACE) {
        let refs = parent.refs();
        for (index, child) in snapshot.unknown().filter_map(|i| refs.get(i).map(|c| (i, c))) {
            tracing::trace!(
                parent = %snapshot.parent,
                version = snapshot.version,
                index,
                child = %child,
                "No visible child version"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ChangesetId;
    use crate::node::NodeId;
    use crate::way::{WayId, WayNode};
    use chrono::TimeZone;

    fn t(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 1, 1, 0, minute, second).unwrap()
    }

    fn node(id: i64, version: u32, visible: bool, timestamp: DateTime<Utc>) -> Node {
        Node {
            id: NodeId(id),
            version,
            visible,
            timestamp,
            changeset_id: ChangesetId(i64::from(version) * 100),
            lat: f64::from(version),
            lon: -f64::from(version),
            ..Node::default()
        }
    }

    fn way(version: u32, timestamp: DateTime<Utc>, refs: &[i64]) -> Way {
        Way {
            id: WayId(1),
            version,
            visible: true,
            timestamp,
            nodes: refs.iter().map(|&id| WayNode::new(NodeId(id))).collect(),
            ..Way::default()
        }
    }

    fn histories() -> Histories<Node> {
        vec![
            node(1, 1, true, t(0, 0)),
            node(1, 2, true, t(5, 0)),
            node(1, 3, true, t(20, 0)),
            node(2, 1, true, t(0, 10)),
            node(2, 2, false, t(30, 0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn augment_resolves_each_reference() {
        let parent = WayParent::assemble(way(1, t(1, 0), &[1, 2, 3]), &histories());
        let snapshot = Augmenter::new(Duration::seconds(30)).augment(&parent);

        let versions: Vec<Option<u32>> = snapshot
            .children
            .iter()
            .map(|c| c.map(|n| n.version))
            .collect();
        assert_eq!(versions, vec![Some(1), Some(1), None]);
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.unknown().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn snapshot_fills_slots_and_keeps_unknown() {
        let parent = WayParent::assemble(way(1, t(1, 0), &[1, 3]), &histories());
        let snapshot = Augmenter::new(Duration::zero()).augment(&parent);

        let mut nodes = parent.way.nodes.clone();
        assert_eq!(snapshot.apply_to(&mut nodes).unwrap(), 1);
        assert_eq!(nodes[0].version, 1);
        assert_eq!(nodes[0].changeset_id, ChangesetId(100));
        assert_eq!(nodes[0].lat, Some(1.0));
        assert_eq!(nodes[1], WayNode::new(NodeId(3)));
    }

    #[test]
    fn apply_to_rejects_short_slots() {
        let parent = WayParent::assemble(way(1, t(1, 0), &[1, 2]), &histories());
        let snapshot = Augmenter::new(Duration::zero()).augment(&parent);

        let mut nodes = vec![WayNode::new(NodeId(1))];
        let err = snapshot.apply_to(&mut nodes).unwrap_err();
        assert_eq!(err, UpdateError::IndexOutOfRange { index: 1, len: 1 });
    }

    #[test]
    fn way_history_carries_child_edits_as_updates() {
        let versions = vec![way(1, t(1, 0), &[1, 2]), way(2, t(10, 0), &[2, 1])];
        let augmenter = Augmenter::new(Duration::seconds(30));

        let augmented = augmenter
            .augment_way_history(&versions, &histories())
            .unwrap();

        // v1: node 1 edited at 5:00, before the way's next version
        assert_eq!(augmented[0].nodes[0].version, 1);
        assert_eq!(augmented[0].updates.len(), 1);
        assert_eq!(augmented[0].updates[0].index, 0);
        assert_eq!(augmented[0].updates[0].version, 2);
        assert_eq!(augmented[0].updates[0].timestamp, t(5, 0));

        // v2: node 1 is now in slot 1, its 20:00 edit is an update there;
        // node 2's deletion is not
        assert_eq!(augmented[1].nodes[1].version, 2);
        assert_eq!(augmented[1].updates.len(), 1);
        assert_eq!(augmented[1].updates[0].index, 1);
        assert_eq!(augmented[1].updates[0].version, 3);
    }

    #[test]
    fn late_commit_estimate_does_not_roll_back_slot() {
        let hour = |h: u32, m: u32, s: u32| Utc.with_ymd_and_hms(2016, 1, 1, h, m, s).unwrap();
        let mut v1 = node(1, 1, true, hour(0, 0, 0));
        v1.committed = Some(hour(1, 10, 0));
        let nodes: Histories<Node> = vec![v1, node(1, 2, true, hour(1, 0, 10))]
            .into_iter()
            .collect();

        let augmented = Augmenter::new(Duration::seconds(30))
            .augment_way_history(&[way(1, hour(1, 0, 0), &[1])], &nodes)
            .unwrap();

        // v1 is not committed at 1:00 and v2 supersedes it before its commit
        assert_eq!(augmented[0].nodes[0].version, 0);
        let updates: Vec<(u32, DateTime<Utc>)> = augmented[0]
            .updates
            .iter()
            .map(|u| (u.version, u.timestamp))
            .collect();
        assert_eq!(updates, vec![(2, hour(1, 0, 10))]);

        let history = ChildList::new(augmented);
        let state = state_before(&history, hour(2, 0, 0)).unwrap().unwrap();
        assert_eq!(state.nodes[0].version, 2);
    }

    #[test]
    fn state_before_skips_superseded_version() {
        let hour = |h: u32| Utc.with_ymd_and_hms(2016, 1, 1, h, 0, 0).unwrap();
        let mut v1 = way(1, hour(1), &[1]);
        v1.committed = Some(hour(3));
        let v2 = way(2, hour(2), &[1]);
        let history = ChildList::new(vec![v1, v2]);

        assert!(state_before(&history, hour(2)).unwrap().is_none());
        assert_eq!(state_before(&history, hour(3)).unwrap().unwrap().version, 2);
        assert_eq!(state_before(&history, hour(4)).unwrap().unwrap().version, 2);
    }

    #[test]
    fn parallel_matches_sequential() {
        let h = histories();
        let parents: Vec<WayParent> = (0..16)
            .map(|i| WayParent::assemble(way(1, t(i, 0), &[1, 2]), &h))
            .collect();

        let seq = Augmenter::new(Duration::seconds(30)).augment_all(&parents);
        let par = Augmenter::new(Duration::seconds(30))
            .parallel(true)
            .augment_all(&parents);

        let versions = |s: &[Snapshot<'_, Node>]| -> Vec<Vec<Option<u32>>> {
            s.iter()
                .map(|s| s.children.iter().map(|c| c.map(|n| n.version)).collect())
                .collect()
        };
        assert_eq!(versions(&seq), versions(&par));
    }

    #[test]
    fn state_before_replays_updates() {
        let versions = vec![way(1, t(1, 0), &[1, 2]), way(2, t(10, 0), &[2, 1])];
        let augmented = Augmenter::new(Duration::seconds(30))
            .augment_way_history(&versions, &histories())
            .unwrap();
        let history = ChildList::new(augmented);

        assert!(state_before(&history, t(1, 0)).unwrap().is_none());

        let state = state_before(&history, t(6, 0)).unwrap().unwrap();
        assert_eq!(state.version, 1);
        assert_eq!(state.nodes[0].version, 2);

        let state = state_before(&history, t(5, 0)).unwrap().unwrap();
        assert_eq!(state.nodes[0].version, 1);
    }

    #[test]
    fn resolve_before_is_strict() {
        let parent = WayParent::assemble(way(1, t(5, 0), &[1]), &histories());
        let augmenter = Augmenter::new(Duration::minutes(1));

        let before = augmenter.resolve_before(&parent, t(5, 0));
        assert_eq!(before.children[0].map(|n| n.version), Some(1));

        let fuzzy = augmenter.augment(&parent);
        assert_eq!(fuzzy.children[0].map(|n| n.version), Some(2));
    }
}

//! Relations: collections of nodes, ways and other relations.

use crate::child::Child;
use crate::element::{ChangesetId, ChildId, ElementType, Tags, UserId};
use crate::update::{MemberUpdates, Update, UpdateSlot, Updates};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Primary key of a relation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RelationId(pub i64);

/// A member of a relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Element kind of the member
    #[serde(rename = "type")]
    pub kind: ElementType,
    /// Id of the member element
    #[serde(rename = "ref")]
    pub reference: i64,
    /// Role of the member within the relation
    #[serde(default)]
    pub role: String,
    /// Resolved member version, zero if unknown
    #[serde(default, skip_serializing_if = "is_zero")]
    pub version: u32,
    /// Changeset of the resolved member version
    #[serde(rename = "changeset", default, skip_serializing_if = "ChangesetId::is_zero")]
    pub changeset_id: ChangesetId,
    /// Latitude, only set for node members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude, only set for node members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl Member {
    /// An unresolved member.
    #[must_use]
    pub fn new(kind: ElementType, reference: i64, role: impl Into<String>) -> Self {
        Self {
            kind,
            reference,
            role: role.into(),
            version: 0,
            changeset_id: ChangesetId::default(),
            lat: None,
            lon: None,
        }
    }

    /// Identity of the referenced element.
    #[must_use]
    pub fn child_id(&self) -> ChildId {
        ChildId::new(self.kind, self.reference)
    }
}

impl UpdateSlot for Member {
    fn apply(&mut self, update: &Update) {
        self.version = update.version;
        self.changeset_id = update.changeset_id;
        self.lat = update.lat;
        self.lon = update.lon;
    }
}

/// A single version of a relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Relation id
    pub id: RelationId,
    /// Display name of the editing user
    #[serde(default)]
    pub user: String,
    /// Id of the editing user
    #[serde(rename = "uid", default)]
    pub user_id: UserId,
    /// False if this version deleted the relation
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
    /// Ordered members
    #[serde(default)]
    pub members: Vec<Member>,
    /// Estimated time the version was committed and made visible in the
    /// central database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed: Option<DateTime<Utc>>,
    /// Changes to the members that did not bump the relation's version
    #[serde(default, skip_serializing_if = "Updates::is_empty")]
    pub updates: Updates,
}

impl MemberUpdates for Relation {
    type Slot = Member;

    fn slots_and_updates(&mut self) -> (&mut [Member], &Updates) {
        (&mut self.members, &self.updates)
    }
}

impl Child for Relation {
    fn id(&self) -> ChildId {
        ChildId::new(ElementType::Relation, self.id.0)
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

/// A set of relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relations(pub Vec<Relation>);

impl Relations {
    /// Sort first by id and then by version, ascending.
    pub fn sort_by_id_version(&mut self) {
        self.0.sort_by_key(|r| (r.id, r.version));
    }
}

impl Deref for Relations {
    type Target = Vec<Relation>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Relations {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &u32) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::UpdateError;
    use chrono::TimeZone;

    #[test]
    fn apply_update_sets_member_attributes() {
        let mut r = Relation {
            members: vec![
                Member::new(ElementType::Node, 1, "stop"),
                Member::new(ElementType::Way, 2, "platform"),
            ],
            ..Relation::default()
        };

        r.apply_update(&Update {
            index: 1,
            version: 3,
            changeset_id: ChangesetId(12),
            ..Update::default()
        })
        .unwrap();

        assert_eq!(r.members[1].version, 3);
        assert_eq!(r.members[1].changeset_id, ChangesetId(12));
        assert_eq!(r.members[1].role, "platform");
        assert_eq!(r.members[0].version, 0);
    }

    #[test]
    fn apply_update_out_of_range() {
        let mut r = Relation {
            members: vec![Member::new(ElementType::Node, 1, "")],
            ..Relation::default()
        };

        let err = r
            .apply_update(&Update {
                index: 1,
                ..Update::default()
            })
            .unwrap_err();
        assert_eq!(err, UpdateError::IndexOutOfRange { index: 1, len: 1 });
    }

    #[test]
    fn apply_updates_up_to_ignores_later() {
        let t = |s| Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, s).unwrap();
        let mut r = Relation {
            members: vec![Member::new(ElementType::Node, 1, "")],
            updates: Updates::from(vec![
                Update {
                    index: 0,
                    version: 2,
                    timestamp: t(10),
                    ..Update::default()
                },
                Update {
                    index: 0,
                    version: 3,
                    timestamp: t(20),
                    ..Update::default()
                },
            ]),
            ..Relation::default()
        };

        assert_eq!(r.apply_updates_up_to(t(5)).unwrap(), 0);
        assert_eq!(r.members[0].version, 0);

        assert_eq!(r.apply_updates_up_to(t(10)).unwrap(), 1);
        assert_eq!(r.members[0].version, 2);

        assert_eq!(r.apply_updates_up_to(t(30)).unwrap(), 2);
        assert_eq!(r.members[0].version, 3);
    }

    #[test]
    fn sort_by_id_version() {
        let mut rs = Relations(
            [(3, 1), (1, 2), (1, 1)]
                .into_iter()
                .map(|(id, version)| Relation {
                    id: RelationId(id),
                    version,
                    ..Relation::default()
                })
                .collect(),
        );

        rs.sort_by_id_version();

        let keys: Vec<(i64, u32)> = rs.iter().map(|r| (r.id.0, r.version)).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (3, 1)]);
    }
}

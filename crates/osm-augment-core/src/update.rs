//! Member updates.
//!
//! The OSM API allows a child to change without any change to its parent. An
//! [`Update`] records such a change against one reference slot of a parent
//! version, so the parent's state between its own versions can be replayed.

use crate::element::ChangesetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// A change to a single reference slot of a parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Position of the slot in the parent's reference list
    pub index: usize,
    /// Child version now referenced by the slot
    pub version: u32,
    /// Time the change became visible
    pub timestamp: DateTime<Utc>,
    /// Changeset of the child version
    #[serde(rename = "changeset", default)]
    pub changeset_id: ChangesetId,
    /// Latitude, for node children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude, for node children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// An ordered sequence of updates, ascending by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Updates(Vec<Update>);

impl Updates {
    /// Create an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if there are no updates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append an update.
    pub fn push(&mut self, update: Update) {
        self.0.push(update);
    }

    /// Stable sort by timestamp, keeping slot order for equal times.
    pub fn sort_by_timestamp(&mut self) {
        self.0.sort_by_key(|u| u.timestamp);
    }
}

impl Deref for Updates {
    type Target = [Update];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Update>> for Updates {
    fn from(updates: Vec<Update>) -> Self {
        Self(updates)
    }
}

impl FromIterator<Update> for Updates {
    fn from_iter<I: IntoIterator<Item = Update>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A reference slot that can take the attributes carried by an update.
pub trait UpdateSlot {
    /// Overwrite the slot's version, changeset and location.
    fn apply(&mut self, update: &Update);
}

/// A parent whose reference slots take member updates.
pub trait MemberUpdates {
    /// Slot type of the references.
    type Slot: UpdateSlot;

    /// The reference slots and the pending updates against them.
    fn slots_and_updates(&mut self) -> (&mut [Self::Slot], &Updates);

    /// Modify the reference slots as dictated by the given update.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::IndexOutOfRange`] if the update index is too large.
    fn apply_update(&mut self, u: &Update) -> Result<(), UpdateError> {
        let (slots, _) = self.slots_and_updates();
        apply_update(slots, u)
    }

    /// Apply the pending updates up to and including the given time.
    ///
    /// # Errors
    ///
    /// Returns the first [`UpdateError`]; earlier updates stay applied.
    fn apply_updates_up_to(&mut self, at: DateTime<Utc>) -> Result<usize, UpdateError> {
        let (slots, updates) = self.slots_and_updates();
        apply_updates_up_to(slots, updates, at)
    }
}

/// Errors raised while applying updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// The update refers to a slot the parent does not have
    #[error("update index {index} out of range for {len} slots")]
    IndexOutOfRange {
        /// Offending update index
        index: usize,
        /// Number of slots in the parent
        len: usize,
    },
}

/// Apply a single update to its slot.
///
/// # Errors
///
/// Returns [`UpdateError::IndexOutOfRange`] if `update.index` is not a slot.
pub fn apply_update<S: UpdateSlot>(slots: &mut [S], update: &Update) -> Result<(), UpdateError> {
    let len = slots.len();
    let slot = slots
        .get_mut(update.index)
        .ok_or(UpdateError::IndexOutOfRange {
            index: update.index,
            len,
        })?;
    slot.apply(update);
    Ok(())
}

/// Apply, in order, every update with a timestamp on or before `at`.
///
/// Stops at the first update after `at`. On error the updates already
/// applied are kept. Returns the number of updates applied.
///
/// # Errors
///
/// Returns the first [`UpdateError`] raised by [`apply_update`].
pub fn apply_updates_up_to<S: UpdateSlot>(
    slots: &mut [S],
    updates: &[Update],
    at: DateTime<Utc>,
) -> Result<usize, UpdateError> {
    let mut applied = 0;
    for update in updates.iter().take_while(|u| u.timestamp <= at) {
        if let Err(e) = apply_update(slots, update) {
            tracing::warn!(
                index = update.index,
                version = update.version,
                applied,
                error = %e,
                "Rejected update"
            );
            return Err(e);
        }
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Slot {
        version: u32,
        touched: usize,
    }

    impl UpdateSlot for Slot {
        fn apply(&mut self, update: &Update) {
            self.version = update.version;
            self.touched += 1;
        }
    }

    fn update(index: usize, version: u32, second: u32) -> Update {
        Update {
            index,
            version,
            timestamp: Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, second).unwrap(),
            ..Update::default()
        }
    }

    #[test]
    fn out_of_range_carries_index() {
        let mut slots = vec![Slot::default()];
        let err = apply_update(&mut slots, &update(3, 1, 0)).unwrap_err();
        assert_eq!(err, UpdateError::IndexOutOfRange { index: 3, len: 1 });
        assert_eq!(err.to_string(), "update index 3 out of range for 1 slots");
    }

    #[test]
    fn stops_at_first_future_update() {
        let mut slots = vec![Slot::default(), Slot::default()];
        let updates = vec![update(0, 2, 10), update(1, 5, 20), update(0, 3, 30)];

        let at = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 20).unwrap();
        let applied = apply_updates_up_to(&mut slots, &updates, at).unwrap();

        assert_eq!(applied, 2);
        assert_eq!(slots[0].version, 2);
        assert_eq!(slots[1].version, 5);
    }

    #[test]
    fn failure_keeps_partial_application() {
        let mut slots = vec![Slot::default()];
        let updates = vec![update(0, 2, 10), update(4, 5, 11), update(0, 3, 12)];

        let at = Utc.with_ymd_and_hms(2016, 1, 1, 0, 1, 0).unwrap();
        let err = apply_updates_up_to(&mut slots, &updates, at).unwrap_err();

        assert_eq!(err, UpdateError::IndexOutOfRange { index: 4, len: 1 });
        assert_eq!(slots[0].version, 2);
        assert_eq!(slots[0].touched, 1);
    }

    #[test]
    fn sort_is_stable_on_equal_times() {
        let mut updates = Updates::from(vec![update(2, 1, 5), update(1, 1, 3), update(0, 1, 5)]);
        updates.sort_by_timestamp();

        let order: Vec<usize> = updates.iter().map(|u| u.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}

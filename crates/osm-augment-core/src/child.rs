//! Child version lists and their temporal lookups.
//!
//! A [`ChildList`] holds every version of a single referenced element,
//! ascending by edit timestamp. Given the timestamp of a parent version it
//! answers which child version was in effect at that moment.
//!
//! # Availability
//!
//! A version's effective availability time is its committed time when one is
//! known, else its edit timestamp. A version committed after the query time
//! could not have been observed at that time, no matter how close its edit
//! timestamp is.

use crate::element::ChildId;
use crate::update::Update;
use chrono::{DateTime, Duration, Utc};
use std::ops::Deref;
use std::sync::Arc;

/// A single version of a referenced element.
pub trait Child {
    /// Stable identity shared by all versions of this element.
    fn id(&self) -> ChildId;

    /// Position of this version in the element's history. Increases with
    /// every edit but need not be contiguous.
    fn version_index(&self) -> usize;

    /// False if this version deleted or hid the element.
    fn visible(&self) -> bool;

    /// Recorded edit time.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Confirmed time the version became visible downstream, if known.
    fn committed(&self) -> Option<DateTime<Utc>>;

    /// The attributes this version contributes to a parent's reference slot.
    /// The returned index is always zero; callers assign the slot.
    fn update(&self) -> Update;

    /// Committed time if set, else the edit timestamp.
    fn available_at(&self) -> DateTime<Utc> {
        self.committed().unwrap_or_else(|| self.timestamp())
    }
}

/// The versions of one child element, ascending by timestamp.
///
/// Frozen at construction. Clones share the same backing storage, so a list
/// can be handed to several parents or worker threads without copying.
#[derive(Debug)]
pub struct ChildList<C> {
    versions: Arc<[C]>,
}

impl<C> Clone for ChildList<C> {
    fn clone(&self) -> Self {
        Self {
            versions: Arc::clone(&self.versions),
        }
    }
}

impl<C> Default for ChildList<C> {
    fn default() -> Self {
        Self {
            versions: Arc::from(Vec::new()),
        }
    }
}

impl<C: Child> ChildList<C> {
    /// Freeze a version list. The versions must already be sorted ascending
    /// by timestamp; this is only checked in debug builds.
    #[must_use]
    pub fn new(versions: Vec<C>) -> Self {
        debug_assert!(
            versions
                .windows(2)
                .all(|w| w[0].timestamp() <= w[1].timestamp()),
            "child versions must be sorted by timestamp"
        );

        Self {
            versions: Arc::from(versions),
        }
    }

    /// Find the version that best represents this child at `at`.
    ///
    /// Versions whose edit timestamp falls within `threshold` of `at` are
    /// treated as fuzzy matches: the closest visible one wins, and an exact
    /// tie goes to the later version. Hidden versions inside that window are
    /// ignored. Outside the window only the latest version on or before
    /// `at - threshold` counts; if it is hidden the child is considered
    /// deleted and `None` is returned unless a visible version inside the
    /// window overrides it.
    ///
    /// Versions committed after `at` are never returned, and neither is
    /// anything after them.
    #[must_use]
    pub fn find_visible(&self, at: DateTime<Utc>, threshold: Duration) -> Option<&C> {
        debug_assert!(threshold >= Duration::zero(), "negative threshold");

        let start = at
            .checked_sub_signed(threshold)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = at
            .checked_add_signed(threshold)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut nearest = None;
        let mut best: Option<Duration> = None;

        for c in self.versions.iter() {
            if c.committed().is_some_and(|committed| committed > at) {
                break;
            }

            let timestamp = c.timestamp();
            if timestamp > end {
                break;
            }

            if timestamp <= start {
                nearest = c.visible().then_some(c);
                continue;
            }

            // within the threshold window
            if !c.visible() {
                continue;
            }

            let diff = distance(timestamp, at);
            if best.map_or(true, |b| diff <= b) {
                nearest = Some(c);
                best = Some(diff);
            }
        }

        nearest
    }

    /// The latest visible version available strictly before `at`.
    #[must_use]
    pub fn last_visible_before(&self, at: DateTime<Utc>) -> Option<&C> {
        self.versions
            .iter()
            .rev()
            .find(|c| c.visible() && c.available_at() < at)
    }

    /// Identity of the child, if the list has any versions.
    #[must_use]
    pub fn child_id(&self) -> Option<ChildId> {
        self.versions.first().map(Child::id)
    }
}

impl<C> Deref for ChildList<C> {
    type Target = [C];

    fn deref(&self) -> &Self::Target {
        &self.versions
    }
}

impl<C: Child> FromIterator<C> for ChildList<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn distance(a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

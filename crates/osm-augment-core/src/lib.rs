//! # OSM Augment Core
//!
//! Point-in-time reconciliation of OSM parent elements (ways and relations)
//! against the independent version histories of the elements they reference.
//!
//! This crate provides:
//! - Child version lists with fuzzy, commit-aware temporal lookup
//! - Parent/child contracts that drive the lookup
//! - Member updates applied to reference slots without a parent version bump
//! - The augmenter, which resolves every version of a parent history

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod augment;
pub mod child;
pub mod element;
pub mod history;
pub mod node;
pub mod parent;
pub mod relation;
pub mod update;
pub mod way;

pub use augment::{Augmenter, Snapshot};
pub use child::{Child, ChildList};
pub use element::{ChangesetId, ChildId, Element, ElementType, Tags, UserId};
pub use history::Histories;
pub use node::{Node, NodeId, Nodes};
pub use parent::{Parent, ParentId, RelationParent, WayParent};
pub use relation::{Member, Relation, RelationId, Relations};
pub use update::{MemberUpdates, Update, UpdateError, UpdateSlot, Updates};
pub use way::{Way, WayId, WayNode, Ways};

//! Reweave snapshot data model
//!
//! The immutable input of the rewrite engine and the small set of records
//! shared by every other crate in the workspace.
//!
//! # Core Concepts
//!
//! - [`Snapshot`]: captured instance tree, source blobs, and rendered markup
//! - [`PropValue`]: exhaustive tagged union over observed prop values
//! - [`MarkupNode`]: rendered markup tree, tagged by originating instance
//! - [`RegistryItem`]: an accepted, regenerated component
//! - [`NodeStatus`]: per-instance rewrite lifecycle status

#![warn(unreachable_pub)]

mod ids;
mod markup;
mod props;
mod registry;
mod snapshot;
mod status;

pub use ids::{CodeId, InstanceId, TypeId};
pub use markup::{MarkupElement, MarkupNode};
pub use props::{EmbeddedElement, PathSegment, PropError, PropPath, PropValue, Props};
pub use registry::RegistryItem;
pub use snapshot::{CodeBlob, ComponentInstance, ComponentType, Snapshot, SnapshotError, TypeKind};
pub use status::NodeStatus;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

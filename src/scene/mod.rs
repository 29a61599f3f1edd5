//! Scene Trees
//!
//! Intermediate hierarchies built from a [`SceneSnapshot`](crate::source::SceneSnapshot)
//! before the export traversal.
//!
//! - [`SceneGroupTree`]: group nesting, LOD tags and view-layer visibility
//! - [`SceneObjectTree`]: objects under their parents, with LOD-tagged
//!   groups folded into `LodRoot`/`LodLevel` nodes
//!
//! Both live only for the duration of one export and are torn down by the
//! export driver.

pub mod groups;
mod lod;
pub mod objects;

pub use groups::{GroupKey, SceneGroup, SceneGroupTree};
pub use objects::{ObjectNode, ObjectNodeKey, ObjectNodeKind, SceneObjectTree};

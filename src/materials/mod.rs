//! Materials
//!
//! Turns one welded slot buffer plus its material into a typed render node.
//!
//! # Overview
//!
//! - [`MaterialCache`]: per-run memo of resolved materials, keyed by id.
//! - [`pbr`]: Default and Glass nodes with their block stack.
//! - [`surfaces`]: Deck and Mirror nodes.
//!
//! The fake-light families carry no render node; they are exported by the
//! fake-light path from the whole object instead.

pub mod cache;
pub mod pbr;
pub mod surfaces;

pub use cache::{MaterialCache, MaterialWrap};
pub use pbr::{MAX_DECAL_ID, build_blocks, build_pbr_node};
pub use surfaces::{build_deck_node, build_mirror_node};

use crate::errors::Result;
use crate::graph::RenderNode;
use crate::mesh::VertexBuffer;
use crate::source::{MaterialFamily, SceneObject};

/// Render node of one slot, typed by the material family.
///
/// `None` for the fake-light families.
pub fn build_render_node(
    obj: &SceneObject,
    wrap: &MaterialWrap<'_>,
    buffer: &VertexBuffer,
) -> Result<Option<RenderNode>> {
    let node = match wrap.family() {
        MaterialFamily::Default | MaterialFamily::Glass => RenderNode::Pbr(build_pbr_node(obj, wrap, buffer)?),
        MaterialFamily::Deck => RenderNode::Deck(build_deck_node(obj, wrap, buffer)?),
        MaterialFamily::Mirror => RenderNode::Mirror(build_mirror_node(obj, wrap, buffer)),
        MaterialFamily::FakeOmni | MaterialFamily::FakeSpot => return Ok(None),
    };
    Ok(Some(node))
}

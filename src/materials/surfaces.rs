//! Deck and mirror render nodes.

use glam::Vec2;

use crate::errors::Result;
use crate::graph::{DeckNode, MirrorNode};
use crate::materials::MaterialWrap;
use crate::materials::pbr::{check_decal_id, texture_map};
use crate::mesh::VertexBuffer;
use crate::source::{SceneObject, TextureSlot};

fn uv_of(wrap: &MaterialWrap<'_>, buffer: &VertexBuffer, slot: TextureSlot) -> Option<Vec<Vec2>> {
    let tex = wrap.texture(slot)?;
    buffer.uv(tex.uv_map.as_deref()).map(<[Vec2]>::to_vec)
}

fn map_of(wrap: &MaterialWrap<'_>, slot: TextureSlot) -> Option<String> {
    wrap.texture(slot).map(|t| t.name.clone())
}

/// Deck node: a tiled layer over a regular decal layer.
///
/// The tiled UVs follow the base tile texture, the regular UVs follow the
/// decal texture.
pub fn build_deck_node(obj: &SceneObject, wrap: &MaterialWrap<'_>, buffer: &VertexBuffer) -> Result<DeckNode> {
    Ok(DeckNode {
        name: obj.name.clone(),
        material: wrap.name().to_string(),
        positions: buffer.positions.clone(),
        normals: buffer.normals.clone(),
        indices: buffer.indices.clone(),
        transparency: wrap.desc.blend_mode.code(),
        decal_id: check_decal_id(wrap)?,
        tiled_uv: uv_of(wrap, buffer, TextureSlot::BaseTile),
        base_tiled_map: map_of(wrap, TextureSlot::BaseTile),
        normal_tiled_map: map_of(wrap, TextureSlot::NormalTile),
        aorms_tiled_map: map_of(wrap, TextureSlot::AormsTile),
        regular_uv: uv_of(wrap, buffer, TextureSlot::Decal),
        base_map: map_of(wrap, TextureSlot::Decal),
        aorms_map: map_of(wrap, TextureSlot::DecalAorms),
        damage_map: map_of(wrap, TextureSlot::DamageColor),
        damage_mask: map_of(wrap, TextureSlot::DamageMask),
        rain_mask: map_of(wrap, TextureSlot::RainMask),
        argument: obj.props.damage_arg,
    })
}

#[must_use]
pub fn build_mirror_node(obj: &SceneObject, wrap: &MaterialWrap<'_>, buffer: &VertexBuffer) -> MirrorNode {
    MirrorNode {
        name: obj.name.clone(),
        material: wrap.name().to_string(),
        positions: buffer.positions.clone(),
        normals: buffer.normals.clone(),
        indices: buffer.indices.clone(),
        texture: texture_map(wrap, buffer, TextureSlot::Albedo, false),
    }
}

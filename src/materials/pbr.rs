//! Default and glass render nodes.
//!
//! Blocks are tried in a fixed order and each one is emitted only when the
//! material carries what it needs:
//!
//! | Block    | Emitted when                                               |
//! |----------|------------------------------------------------------------|
//! | Base     | albedo texture, non-black base colour, or additive emissive |
//! | Aorms    | aorms texture                                              |
//! | Normal   | normal texture                                             |
//! | Decal    | decal texture                                              |
//! | Emissive | emissive texture or non-black emissive colour              |
//! | Ao       | light map texture                                          |
//! | Flir     | flir texture                                               |
//! | Damage   | damage colour and mask, plus a damage argument or tags     |
//! | Bone     | the mesh is skinned                                        |

use glam::{Vec2, Vec3, Vec4};

use crate::animation::channel::{sample_float, sample_vec3, sample_vec4};
use crate::animation::{AnimationChannel, ChannelTarget, Property, PropertyPath};
use crate::errors::{ExportError, Result};
use crate::graph::{
    BaseBlock, BaseSource, Block, BoneBlock, DamageBlock, EmissiveBlock, EmissiveType, PbrNode, TextureMap,
};
use crate::materials::MaterialWrap;
use crate::mesh::VertexBuffer;
use crate::naming::argument_of;
use crate::source::{BlendMode, MaterialFamily, ObjectProps, SceneObject, TextureRef, TextureSlot};

const BLACK: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// Highest decal id the renderer's decal table holds.
pub const MAX_DECAL_ID: i32 = 8;

// ============================================================================
// Shared helpers
// ============================================================================

/// UVs of `tex` in `buffer`; empty when the layer is missing.
fn texture_uv(buffer: &VertexBuffer, tex: &TextureRef) -> Vec<Vec2> {
    buffer.uv(tex.uv_map.as_deref()).map(<[Vec2]>::to_vec).unwrap_or_default()
}

/// Texture of `slot` with its UVs. `with_shift` adds the UV mover channel.
pub(crate) fn texture_map(
    wrap: &MaterialWrap<'_>,
    buffer: &VertexBuffer,
    slot: TextureSlot,
    with_shift: bool,
) -> Option<TextureMap> {
    let tex = wrap.texture(slot)?;
    Some(bound_texture(wrap, buffer, tex, with_shift))
}

fn bound_texture(wrap: &MaterialWrap<'_>, buffer: &VertexBuffer, tex: &TextureRef, with_shift: bool) -> TextureMap {
    TextureMap {
        map: tex.name.clone(),
        uv: texture_uv(buffer, tex),
        uv_shift: if with_shift { uv_shift(wrap, tex) } else { None },
    }
}

/// UV mover animation of `tex`, keyed by the argument in the mover label.
fn uv_shift(wrap: &MaterialWrap<'_>, tex: &TextureRef) -> Option<AnimationChannel<Vec2>> {
    let arg = argument_of(tex.uv_move_label.as_deref()?);
    if arg < 0 {
        return None;
    }
    let target = ChannelTarget::texture(tex.slot.key(), PropertyPath::UvShift);
    let channel = sample_vec3(wrap.action()?, &target, arg, Vec3::ZERO)?;
    Some(channel.map(|v| Vec2::new(v.x, 1.0 - v.y)))
}

/// Scalar material value, animated when `arg` is set and the material
/// action drives `path`.
pub(crate) fn material_float(wrap: &MaterialWrap<'_>, path: PropertyPath, arg: i32, value: f32) -> Property<f32> {
    if arg < 0 {
        return Property::Constant(value);
    }
    wrap.action()
        .and_then(|action| sample_float(action, &ChannelTarget::object(path), arg))
        .map_or(Property::Constant(value), Property::Animated)
}

/// RGB of an RGBA material colour, animated like [`material_float`].
fn material_color(wrap: &MaterialWrap<'_>, path: PropertyPath, arg: i32, value: Vec4) -> Property<Vec3> {
    if arg < 0 {
        return Property::Constant(value.truncate());
    }
    wrap.action()
        .and_then(|action| sample_vec4(action, &ChannelTarget::object(path), arg, BLACK))
        .map_or(Property::Constant(value.truncate()), |c| {
            Property::Animated(c.map(Vec4::truncate))
        })
}

pub(crate) fn check_decal_id(wrap: &MaterialWrap<'_>) -> Result<u32> {
    let id = wrap.desc.decal_id;
    u32::try_from(id)
        .ok()
        .filter(|_| id <= MAX_DECAL_ID)
        .ok_or_else(|| ExportError::DecalIdOutOfRange {
            material: wrap.name().to_string(),
            id,
        })
}

#[inline]
fn is_additive_emissive(wrap: &MaterialWrap<'_>) -> bool {
    wrap.desc.blend_mode == BlendMode::SumBlendingSi && wrap.has_texture(TextureSlot::Emissive)
}

// ============================================================================
// Blocks
// ============================================================================

fn base_block(wrap: &MaterialWrap<'_>, buffer: &VertexBuffer, props: &ObjectProps) -> Option<Block> {
    let source = if is_additive_emissive(wrap) {
        BaseSource::Texture(texture_map(wrap, buffer, TextureSlot::Emissive, true)?)
    } else if let Some(map) = texture_map(wrap, buffer, TextureSlot::Albedo, true) {
        BaseSource::Texture(map)
    } else if wrap.desc.base_color == BLACK {
        return None;
    } else {
        BaseSource::Color(material_color(
            wrap,
            PropertyPath::BaseColor,
            props.color_arg,
            wrap.desc.base_color,
        ))
    };

    Some(Block::Base(BaseBlock {
        source,
        positions: buffer.positions.clone(),
        normals: buffer.normals.clone(),
    }))
}

fn emissive_block(wrap: &MaterialWrap<'_>, buffer: &VertexBuffer, props: &ObjectProps) -> Result<Option<Block>> {
    let desc = wrap.desc;
    let emissive = wrap.texture(TextureSlot::Emissive);
    if emissive.is_none() && desc.emissive_color == BLACK {
        return Ok(None);
    }

    let mask = wrap.texture(TextureSlot::EmissiveMask);
    if let (Some(emissive), Some(mask)) = (emissive, mask)
        && emissive.name != mask.name
    {
        return Err(ExportError::EmissiveMaskMismatch {
            material: wrap.name().to_string(),
            emissive: emissive.name.clone(),
            mask: mask.name.clone(),
        });
    }

    let (mut emissive_type, map, color) = match emissive {
        Some(tex) => (EmissiveType::Default, Some(bound_texture(wrap, buffer, tex, false)), None),
        None => (
            EmissiveType::SelfIllumination,
            mask.map(|tex| bound_texture(wrap, buffer, tex, false)),
            Some(material_color(
                wrap,
                PropertyPath::EmissiveColor,
                props.emissive_color_arg,
                desc.emissive_color,
            )),
        ),
    };

    if desc.blend_mode == BlendMode::SumBlendingSi {
        let albedo = wrap.has_texture(TextureSlot::Albedo);
        emissive_type = if !albedo && desc.emissive_color != BLACK {
            EmissiveType::AdditiveSelfColorIllumination
        } else if albedo && emissive.is_some() {
            EmissiveType::AdditiveSelfTexIllumination
        } else {
            EmissiveType::AdditiveSelfIllumination
        };
    }

    Ok(Some(Block::Emissive(EmissiveBlock {
        emissive_type,
        map,
        color,
        amount: material_float(wrap, PropertyPath::EmissiveValue, props.emissive_arg, desc.emissive_value),
    })))
}

fn damage_block(wrap: &MaterialWrap<'_>, buffer: &VertexBuffer, props: &ObjectProps) -> Option<Block> {
    let albedo = texture_map(wrap, buffer, TextureSlot::DamageColor, false)?;
    let mask = wrap.texture(TextureSlot::DamageMask)?;
    if props.damage_arg < 0 && !buffer.has_damage_groups {
        return None;
    }

    Some(Block::Damage(DamageBlock {
        argument: props.damage_arg,
        per_vertex_arguments: buffer.has_damage_groups.then(|| buffer.damage_arguments.clone()),
        albedo,
        normal: texture_map(wrap, buffer, TextureSlot::DamageNormal, false),
        mask: mask.name.clone(),
    }))
}

fn bone_block(buffer: &VertexBuffer) -> Option<Block> {
    let skin = buffer.skin.as_ref()?;
    Some(Block::Bone(BoneBlock {
        bone_names: skin.bone_ids.clone(),
        indices: skin.indices.clone(),
        weights: skin.weights.clone(),
        bones: Vec::new(),
        skin_box: None,
    }))
}

/// Blocks of one slot, in emission order.
pub fn build_blocks(wrap: &MaterialWrap<'_>, buffer: &VertexBuffer, props: &ObjectProps) -> Result<Vec<Block>> {
    let blocks = [
        base_block(wrap, buffer, props),
        texture_map(wrap, buffer, TextureSlot::Aorms, false).map(Block::Aorms),
        texture_map(wrap, buffer, TextureSlot::Normal, false).map(Block::Normal),
        texture_map(wrap, buffer, TextureSlot::Decal, true).map(Block::Decal),
        emissive_block(wrap, buffer, props)?,
        texture_map(wrap, buffer, TextureSlot::LightMap, true).map(Block::Ao),
        wrap.texture(TextureSlot::Flir).map(|t| Block::Flir { map: t.name.clone() }),
        damage_block(wrap, buffer, props),
        bone_block(buffer),
    ];
    Ok(blocks.into_iter().flatten().collect())
}

/// Render node of a default or glass material slot.
pub fn build_pbr_node(obj: &SceneObject, wrap: &MaterialWrap<'_>, buffer: &VertexBuffer) -> Result<PbrNode> {
    let desc = wrap.desc;
    let blocks = build_blocks(wrap, buffer, &obj.props)?;
    let decal_id = check_decal_id(wrap)?;

    let opacity = (wrap.family() != MaterialFamily::Glass).then(|| {
        material_float(
            wrap,
            PropertyPath::OpacityValue,
            obj.props.opacity_value_arg,
            desc.opacity_value,
        )
    });

    Ok(PbrNode {
        name: obj.name.clone(),
        material: wrap.name().to_string(),
        indices: buffer.indices.clone(),
        blocks,
        decal_id,
        transparency: desc.blend_mode.code(),
        shadow_caster: desc.shadow_caster.code(),
        opacity,
        two_sided: obj.props.two_sided,
    })
}

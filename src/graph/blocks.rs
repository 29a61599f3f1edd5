//! Geometry blocks of a PBR render node.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationChannel, Property};
use crate::graph::ExportKey;
use crate::math::Aabb;

/// Block discriminant, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Base,
    Aorms,
    Normal,
    Decal,
    Emissive,
    Ao,
    Flir,
    Damage,
    Bone,
}

/// Texture bound to per-vertex UVs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureMap {
    pub map: String,
    pub uv: Vec<Vec2>,
    /// UV mover animation, `(u, 1 - v)` per key.
    pub uv_shift: Option<AnimationChannel<Vec2>>,
}

/// Albedo source of a base block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BaseSource {
    Texture(TextureMap),
    Color(Property<Vec3>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseBlock {
    pub source: BaseSource,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

/// Emission model codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissiveType {
    None = 0,
    Default = 1,
    SelfIllumination = 2,
    AdditiveSelfIllumination = 4,
    AdditiveSelfColorIllumination = 5,
    AdditiveSelfTexIllumination = 6,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissiveBlock {
    pub emissive_type: EmissiveType,
    /// Emissive texture, or the emission mask of a color-driven block.
    pub map: Option<TextureMap>,
    pub color: Option<Property<Vec3>>,
    pub amount: Property<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageBlock {
    pub argument: i32,
    /// Damage argument per vertex, present when the mesh has `DMG_<n>` groups.
    pub per_vertex_arguments: Option<Vec<i32>>,
    pub albedo: TextureMap,
    pub normal: Option<TextureMap>,
    pub mask: String,
}

/// Skin data of a render node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneBlock {
    /// Bone ids in slot order.
    pub bone_names: Vec<String>,
    pub indices: Vec<[u32; 4]>,
    pub weights: Vec<[f32; 4]>,
    /// Export nodes of `bone_names`, filled by skin resolution.
    pub bones: Vec<ExportKey>,
    pub skin_box: Option<Aabb>,
}

impl BoneBlock {
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.bones.len() == self.bone_names.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Base(BaseBlock),
    Aorms(TextureMap),
    Normal(TextureMap),
    Decal(TextureMap),
    Emissive(EmissiveBlock),
    Ao(TextureMap),
    Flir { map: String },
    Damage(DamageBlock),
    Bone(BoneBlock),
}

impl Block {
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Base(_) => BlockKind::Base,
            Self::Aorms(_) => BlockKind::Aorms,
            Self::Normal(_) => BlockKind::Normal,
            Self::Decal(_) => BlockKind::Decal,
            Self::Emissive(_) => BlockKind::Emissive,
            Self::Ao(_) => BlockKind::Ao,
            Self::Flir { .. } => BlockKind::Flir,
            Self::Damage(_) => BlockKind::Damage,
            Self::Bone(_) => BlockKind::Bone,
        }
    }
}

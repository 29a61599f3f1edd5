//! Export Graph
//!
//! The immutable result of an export run, handed to a
//! [`ModelWriter`](crate::export::ModelWriter).
//!
//! # Overview
//!
//! [`ExportGraph`] is a [`Tree`] of [`ExportNode`]s. Control nodes (groups,
//! transforms, animation nodes, bones, LOD switches) form the spine; payload
//! nodes (render nodes, lights, connectors, segments, shells, fake lights)
//! hang as leaves under the control node that fixes their reference frame.
//!
//! Model-level records that are not part of the hierarchy (bounding, user
//! and light boxes) live on [`ExportModel`].

pub mod blocks;

use glam::{Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimationChannel, Keyframe, Property};
use crate::math::Aabb;
use crate::tree::Tree;

pub use blocks::{
    BaseBlock, BaseSource, Block, BlockKind, BoneBlock, DamageBlock, EmissiveBlock, EmissiveType, TextureMap,
};

slotmap::new_key_type! {
    /// Handle of a node in the [`ExportGraph`].
    pub struct ExportKey;
}

pub type ExportGraph = Tree<ExportKey, ExportNode>;

// ============================================================================
// Control nodes
// ============================================================================

/// Single animated transform component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnimatedTransform {
    Position(AnimationChannel<Vec3>),
    Rotation(AnimationChannel<Quat>),
    Scale(AnimationChannel<Vec3>),
}

// ============================================================================
// Payload nodes
// ============================================================================

/// Render node of the Default and Glass families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PbrNode {
    pub name: String,
    pub material: String,
    pub indices: Vec<u32>,
    pub blocks: Vec<Block>,
    pub decal_id: u32,
    pub transparency: u32,
    pub shadow_caster: u32,
    /// Unset on glass.
    pub opacity: Option<Property<f32>>,
    pub two_sided: bool,
}

impl PbrNode {
    #[must_use]
    pub fn block(&self, kind: BlockKind) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind() == kind)
    }

    #[inline]
    #[must_use]
    pub fn has_block(&self, kind: BlockKind) -> bool {
        self.block(kind).is_some()
    }

    #[must_use]
    pub fn bone_block(&self) -> Option<&BoneBlock> {
        self.blocks.iter().find_map(|b| match b {
            Block::Bone(bone) => Some(bone),
            _ => None,
        })
    }

    pub fn bone_block_mut(&mut self) -> Option<&mut BoneBlock> {
        self.blocks.iter_mut().find_map(|b| match b {
            Block::Bone(bone) => Some(bone),
            _ => None,
        })
    }
}

/// Tiled deck surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckNode {
    pub name: String,
    pub material: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub transparency: u32,
    pub decal_id: u32,
    pub tiled_uv: Option<Vec<Vec2>>,
    pub base_tiled_map: Option<String>,
    pub normal_tiled_map: Option<String>,
    pub aorms_tiled_map: Option<String>,
    pub regular_uv: Option<Vec<Vec2>>,
    pub base_map: Option<String>,
    pub aorms_map: Option<String>,
    pub damage_map: Option<String>,
    pub damage_mask: Option<String>,
    pub rain_mask: Option<String>,
    pub argument: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorNode {
    pub name: String,
    pub material: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub texture: Option<TextureMap>,
}

/// Renderable geometry, typed by material family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderNode {
    Pbr(PbrNode),
    Deck(DeckNode),
    Mirror(MirrorNode),
}

impl RenderNode {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Pbr(n) => &n.name,
            Self::Deck(n) => &n.name,
            Self::Mirror(n) => &n.name,
        }
    }

    #[must_use]
    pub fn as_pbr(&self) -> Option<&PbrNode> {
        match self {
            Self::Pbr(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_bones(&self) -> bool {
        self.as_pbr().is_some_and(|n| n.has_block(BlockKind::Bone))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Omni,
    Spot {
        /// Outer cone angle, radians.
        phi: Property<f32>,
        theta: Property<f32>,
    },
}

/// Dynamic light source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightNode {
    pub name: String,
    pub kind: LightKind,
    pub color: Property<Vec3>,
    pub brightness: Property<f32>,
    pub distance: Property<f32>,
    pub specular: Property<f32>,
    pub softness: Property<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectorValue {
    Float(f32),
    Text(String),
}

/// Named attachment point with free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorNode {
    pub name: String,
    pub properties: Vec<(String, ConnectorValue)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentsNode {
    pub name: String,
    pub segments: Vec<[Vec3; 2]>,
}

/// Collision geometry: positions and indices only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellNode {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

/// One billboard of a fake light node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FakeLight {
    pub position: Vec3,
    pub size: f32,
    /// Left-bottom and right-top UV corners.
    pub uv: [Vec2; 2],
    /// Back-side UVs of two-sided spot billboards.
    pub back_uv: Option<[Vec2; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FakeLightKind {
    Omni,
    Spot {
        /// `(cos inner, cos outer, min attenuation)`.
        cone_setup: Vec3,
        direction: Vec3,
    },
}

/// Per-light brightness curves offset by each light's delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedBrightness {
    pub argument: i32,
    /// Keys per light, indexed like [`FakeLightsNode::lights`].
    pub lights: Vec<Vec<Keyframe<f32>>>,
}

/// Billboard light sprites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeLightsNode {
    pub name: String,
    pub kind: FakeLightKind,
    pub texture: String,
    pub min_size_pixels: f32,
    pub max_distance: f32,
    pub shift_to_camera: f32,
    pub luminance: Property<f32>,
    pub lights: Vec<FakeLight>,
    pub animation: Option<DelayedBrightness>,
}

// ============================================================================
// Node
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Group,
    Transform { matrix: Mat4 },
    Animation(AnimatedTransform),
    ArgVisibility(AnimationChannel<f32>),
    Bone { matrix: Mat4, inverse_bind: Mat4 },
    /// Switch distances, one per child in child order.
    Lod { levels: Vec<f32> },
    Render(RenderNode),
    Light(LightNode),
    Connector(ConnectorNode),
    Segments(SegmentsNode),
    Shell(ShellNode),
    FakeLights(FakeLightsNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNode {
    pub name: String,
    pub kind: NodeKind,
}

impl ExportNode {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    #[must_use]
    pub fn transform(name: impl Into<String>, matrix: Mat4) -> Self {
        Self::new(name, NodeKind::Transform { matrix })
    }

    #[must_use]
    pub fn bone(name: impl Into<String>, matrix: Mat4, inverse_bind: Mat4) -> Self {
        Self::new(name, NodeKind::Bone { matrix, inverse_bind })
    }

    /// Whether other nodes can hang below this one.
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Group
                | NodeKind::Transform { .. }
                | NodeKind::Animation(_)
                | NodeKind::ArgVisibility(_)
                | NodeKind::Bone { .. }
                | NodeKind::Lod { .. }
        )
    }

    #[must_use]
    pub fn as_render(&self) -> Option<&RenderNode> {
        match &self.kind {
            NodeKind::Render(r) => Some(r),
            _ => None,
        }
    }

    /// Short kind tag used in graph dumps.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Group => "Node",
            NodeKind::Transform { .. } => "Transform",
            NodeKind::Animation(_) => "AnimationNode",
            NodeKind::ArgVisibility(_) => "VisibilityNode",
            NodeKind::Bone { .. } => "Bone",
            NodeKind::Lod { .. } => "Lod",
            NodeKind::Render(_) => "RenderNode",
            NodeKind::Light(_) => "Light",
            NodeKind::Connector(_) => "Connector",
            NodeKind::Segments(_) => "SegmentsNode",
            NodeKind::Shell(_) => "ShellNode",
            NodeKind::FakeLights(_) => "FakeLights",
        }
    }
}

// ============================================================================
// Model
// ============================================================================

/// Assembled export result.
#[derive(Debug, Default)]
pub struct ExportModel {
    pub graph: ExportGraph,
    /// Root transform every exported node descends from.
    pub root: Option<ExportKey>,
    pub bounding_box: Option<Aabb>,
    pub user_box: Option<Aabb>,
    pub light_box: Option<Aabb>,
}

impl ExportModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of every node matching `pred`, depth-first from the root.
    #[must_use]
    pub fn find_all(&self, mut pred: impl FnMut(&ExportNode) -> bool) -> Vec<ExportKey> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        self.graph
            .depth_first(root)
            .into_iter()
            .filter(|&k| self.graph.value(k).is_some_and(&mut pred))
            .collect()
    }

    /// First node named `name`, depth-first from the root.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ExportKey> {
        self.find_all(|n| n.name == name).into_iter().next()
    }

    /// Render nodes of the graph, depth-first.
    pub fn render_nodes(&self) -> impl Iterator<Item = &RenderNode> {
        self.find_all(|n| n.as_render().is_some())
            .into_iter()
            .filter_map(|k| self.graph.value(k).and_then(ExportNode::as_render))
    }

    /// Names from the root down to `key`, root first.
    #[must_use]
    pub fn path_of(&self, key: ExportKey) -> Vec<&str> {
        let mut path: Vec<&str> = std::iter::once(key)
            .chain(self.graph.ancestors(key))
            .filter_map(|k| self.graph.value(k).map(|n| n.name.as_str()))
            .collect();
        path.reverse();
        path
    }

    /// Graphviz dump of the whole graph.
    #[must_use]
    pub fn dump_dot(&self) -> String {
        match self.root {
            Some(root) => self
                .graph
                .dump_dot(root, |n| format!("{}: {}", n.kind_name(), n.name)),
            None => String::new(),
        }
    }

    /// Releases the graph and the model records.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.root = None;
        self.bounding_box = None;
        self.user_box = None;
        self.light_box = None;
    }
}

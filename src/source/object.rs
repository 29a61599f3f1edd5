use glam::{Mat4, Vec2};
use serde::{Deserialize, Serialize};

use super::{ArmatureData, LightData, MaterialId, MeshData};
use crate::source::action::Action;

/// Exporter role assigned to an object on top of its data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialType {
    #[default]
    #[serde(alias = "UNKNOWN_TYPE")]
    Unknown,
    /// Box covering only geometry.
    UserBox,
    /// Box covering geometry and all animations.
    BoundingBox,
    /// Limiter box for light sources.
    LightBox,
    /// Box covering the bones of the next skinned descendant.
    SkinBox,
    Connector,
    FakeLight,
    CollisionShell,
    CollisionLine,
}

impl SpecialType {
    /// Marker types recorded on the model instead of the graph.
    #[must_use]
    pub fn is_model_box(self) -> bool {
        matches!(self, Self::UserBox | Self::BoundingBox | Self::LightBox)
    }
}

/// Data block carried by an object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ObjectData {
    #[default]
    Empty,
    Mesh(MeshData),
    Curve(MeshData),
    Surface(MeshData),
    Light(LightData),
    Armature(ArmatureData),
    /// Any other authoring kind, kept by name for diagnostics.
    Other(String),
}

impl ObjectData {
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Empty => "EMPTY",
            Self::Mesh(_) => "MESH",
            Self::Curve(_) => "CURVE",
            Self::Surface(_) => "SURFACE",
            Self::Light(_) => "LIGHT",
            Self::Armature(_) => "ARMATURE",
            Self::Other(name) => name,
        }
    }

    /// Mesh-like geometry of mesh, curve and surface objects.
    #[must_use]
    pub fn geometry(&self) -> Option<&MeshData> {
        match self {
            Self::Mesh(m) | Self::Curve(m) | Self::Surface(m) => Some(m),
            _ => None,
        }
    }
}

/// Per-object exporter properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectProps {
    pub two_sided: bool,
    /// Fake lights: one light per face instead of one per vertex.
    pub surface_mode: bool,

    pub damage_arg: i32,
    pub luminance_arg: i32,
    pub color_arg: i32,
    pub emissive_arg: i32,
    pub emissive_color_arg: i32,
    pub opacity_value_arg: i32,

    pub light_color_arg: i32,
    pub light_power_arg: i32,
    pub light_distance_arg: i32,
    pub light_specular_arg: i32,
    pub light_phy_arg: i32,
    pub light_theta_arg: i32,
    pub light_softness_arg: i32,
    pub light_softness: f32,

    pub uv_lb: Vec2,
    pub uv_rt: Vec2,
    pub uv_lb_back: Vec2,
    pub uv_rt_back: Vec2,
    /// Fake light billboard size in point mode.
    pub size: f32,

    /// Connector key/value expression, e.g. `kind = "hook"; range = 2.5`.
    pub connector_ext: String,
}

impl Default for ObjectProps {
    fn default() -> Self {
        Self {
            two_sided: false,
            surface_mode: false,
            damage_arg: -1,
            luminance_arg: -1,
            color_arg: -1,
            emissive_arg: -1,
            emissive_color_arg: -1,
            opacity_value_arg: -1,
            light_color_arg: -1,
            light_power_arg: -1,
            light_distance_arg: -1,
            light_specular_arg: -1,
            light_phy_arg: -1,
            light_theta_arg: -1,
            light_softness_arg: -1,
            light_softness: 0.0,
            uv_lb: Vec2::ZERO,
            uv_rt: Vec2::ONE,
            uv_lb_back: Vec2::ZERO,
            uv_rt_back: Vec2::ONE,
            size: 3.0,
            connector_ext: String::new(),
        }
    }
}

/// One object of the authoring scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Bone of the parent armature this object hangs from.
    #[serde(default)]
    pub parent_bone: Option<String>,
    #[serde(default)]
    pub data: ObjectData,
    #[serde(default)]
    pub special: SpecialType,
    /// Names of the groups this object is linked into.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Transform relative to the parent.
    #[serde(default = "identity")]
    pub matrix_local: Mat4,
    /// Transform before parenting is applied; animation keys live in this space.
    #[serde(default = "identity")]
    pub matrix_basis: Mat4,
    #[serde(default = "identity")]
    pub matrix_world: Mat4,

    /// Active object-level action.
    #[serde(default)]
    pub animation: Option<Action>,
    #[serde(default)]
    pub material_slots: Vec<Option<MaterialId>>,
    /// Armature driving this object through a skin modifier.
    #[serde(default)]
    pub armature_modifier: Option<String>,
    #[serde(default)]
    pub props: ObjectProps,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

impl SceneObject {
    #[must_use]
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            parent: None,
            parent_bone: None,
            data,
            special: SpecialType::Unknown,
            groups: Vec::new(),
            matrix_local: Mat4::IDENTITY,
            matrix_basis: Mat4::IDENTITY,
            matrix_world: Mat4::IDENTITY,
            animation: None,
            material_slots: Vec::new(),
            armature_modifier: None,
            props: ObjectProps::default(),
        }
    }

    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, ObjectData::Empty)
    }

    #[must_use]
    pub fn mesh(name: impl Into<String>, mesh: MeshData) -> Self {
        Self::new(name, ObjectData::Mesh(mesh))
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_parent_bone(mut self, bone: impl Into<String>) -> Self {
        self.parent_bone = Some(bone.into());
        self
    }

    #[must_use]
    pub fn with_special(mut self, special: SpecialType) -> Self {
        self.special = special;
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Sets both the local and the basis matrix.
    #[must_use]
    pub fn with_transform(mut self, matrix: Mat4) -> Self {
        self.matrix_local = matrix;
        self.matrix_basis = matrix;
        self
    }

    #[must_use]
    pub fn with_animation(mut self, action: Action) -> Self {
        self.animation = Some(action);
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material_slots.push(Some(material));
        self
    }

    #[must_use]
    pub fn with_armature_modifier(mut self, armature: impl Into<String>) -> Self {
        self.armature_modifier = Some(armature.into());
        self
    }

    #[must_use]
    pub fn with_props(mut self, props: ObjectProps) -> Self {
        self.props = props;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_mesh(&self) -> bool {
        matches!(self.data, ObjectData::Mesh(_))
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.data, ObjectData::Empty)
    }

    #[must_use]
    pub fn armature(&self) -> Option<&ArmatureData> {
        match &self.data {
            ObjectData::Armature(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn light(&self) -> Option<&LightData> {
        match &self.data {
            ObjectData::Light(l) => Some(l),
            _ => None,
        }
    }
}

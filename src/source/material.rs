use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::source::action::Action;

/// Exporter shader family a material was authored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialFamily {
    #[default]
    Default,
    Glass,
    Deck,
    Mirror,
    FakeOmni,
    FakeSpot,
}

/// Texture inputs of the exporter shader families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    Albedo,
    Aorms,
    Normal,
    Decal,
    Emissive,
    EmissiveMask,
    LightMap,
    Flir,
    DamageColor,
    DamageNormal,
    DamageMask,
    BaseTile,
    NormalTile,
    AormsTile,
    DecalAorms,
    RainMask,
}

impl TextureSlot {
    /// Qualifier used in material data paths: `textures["decal"].uv_shift`.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Albedo => "albedo",
            Self::Aorms => "aorms",
            Self::Normal => "normal",
            Self::Decal => "decal",
            Self::Emissive => "emissive",
            Self::EmissiveMask => "emissive_mask",
            Self::LightMap => "light_map",
            Self::Flir => "flir",
            Self::DamageColor => "damage_color",
            Self::DamageNormal => "damage_normal",
            Self::DamageMask => "damage_mask",
            Self::BaseTile => "base_tile",
            Self::NormalTile => "normal_tile",
            Self::AormsTile => "aorms_tile",
            Self::DecalAorms => "decal_aorms",
            Self::RainMask => "rain_mask",
        }
    }
}

/// Texture bound to a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureRef {
    pub slot: TextureSlot,
    /// Image name as the model writer references it.
    pub name: String,
    /// UV layer; `None` selects the mesh's first layer.
    #[serde(default)]
    pub uv_map: Option<String>,
    /// Label of the UV mover node; its leading digits select the argument of
    /// the `uv_shift` animation.
    #[serde(default)]
    pub uv_move_label: Option<String>,
}

impl TextureRef {
    #[must_use]
    pub fn new(slot: TextureSlot, name: impl Into<String>) -> Self {
        Self {
            slot,
            name: name.into(),
            uv_map: None,
            uv_move_label: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    #[default]
    Opaque,
    AlphaBlending,
    ZTest,
    SumBlending,
    /// Additive self illumination.
    SumBlendingSi,
    ShadowedBlending,
}

impl BlendMode {
    /// Transparency mode code of the model format.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Opaque => 0,
            Self::AlphaBlending => 1,
            Self::ZTest => 2,
            Self::SumBlending | Self::SumBlendingSi => 3,
            Self::ShadowedBlending => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShadowCaster {
    #[default]
    Yes,
    No,
    Only,
}

impl ShadowCaster {
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Yes => 0,
            Self::No => 1,
            Self::Only => 2,
        }
    }
}

/// Billboard parameters of the fake-light families.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeLightParams {
    pub min_size_pixels: f32,
    pub max_distance: f32,
    pub shift_to_camera: f32,
    pub luminance: f32,
    /// Outer cone angle, degrees.
    pub phi: f32,
    /// Inner cone angle, degrees.
    pub theta: f32,
}

impl Default for FakeLightParams {
    fn default() -> Self {
        Self {
            min_size_pixels: 1.0,
            max_distance: 1000.0,
            shift_to_camera: 0.0,
            luminance: 1.0,
            phi: 60.0,
            theta: 30.0,
        }
    }
}

/// Flattened view of a material's exporter node group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDesc {
    pub name: String,
    pub family: MaterialFamily,
    pub textures: Vec<TextureRef>,
    pub base_color: Vec4,
    pub emissive_color: Vec4,
    pub emissive_value: f32,
    pub opacity_value: f32,
    pub decal_id: i32,
    pub blend_mode: BlendMode,
    pub shadow_caster: ShadowCaster,
    pub fake_light: FakeLightParams,
    /// Node-tree action (`base_color`, `emissive_value`, `textures["decal"].uv_shift`, ...).
    pub animation: Option<Action>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            family: MaterialFamily::Default,
            textures: Vec::new(),
            base_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive_value: 0.0,
            opacity_value: 1.0,
            decal_id: 0,
            blend_mode: BlendMode::Opaque,
            shadow_caster: ShadowCaster::Yes,
            fake_light: FakeLightParams::default(),
            animation: None,
        }
    }
}

impl MaterialDesc {
    #[must_use]
    pub fn new(name: impl Into<String>, family: MaterialFamily) -> Self {
        Self {
            name: name.into(),
            family,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_texture(mut self, slot: TextureSlot, image: impl Into<String>) -> Self {
        self.textures.push(TextureRef::new(slot, image));
        self
    }

    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<&TextureRef> {
        self.textures.iter().find(|t| t.slot == slot)
    }
}

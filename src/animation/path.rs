//! Property path dispatch.
//!
//! Authored curves address their property through a string data path.
//! Everything past parsing works on [`ChannelTarget`] instead.

use crate::naming::split_data_path;

/// Known animatable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Location,
    RotationQuaternion,
    RotationEuler,
    Scale,
    /// Visibility toggle channel (`VISIBLE`).
    Visible,

    // Lamp data.
    Energy,
    Color,
    CutoffDistance,
    Specular,
    SpotSize,
    SpotBlend,

    // Exporter object properties.
    AnimatedBrightness,
    LightSoftness,

    // Material values.
    BaseColor,
    EmissiveColor,
    EmissiveValue,
    OpacityValue,
    Luminance,
    UvShift,

    Other,
}

impl PropertyPath {
    /// Parses the property part of a data path.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "location" => Self::Location,
            "rotation_quaternion" => Self::RotationQuaternion,
            "rotation_euler" => Self::RotationEuler,
            "scale" => Self::Scale,
            "VISIBLE" => Self::Visible,
            "energy" => Self::Energy,
            "color" => Self::Color,
            "cutoff_distance" => Self::CutoffDistance,
            "specular_factor" => Self::Specular,
            "spot_size" => Self::SpotSize,
            "spot_blend" => Self::SpotBlend,
            "ANIMATED_BRIGHTNESS" => Self::AnimatedBrightness,
            "LIGHT_SOFTNESS" => Self::LightSoftness,
            "base_color" => Self::BaseColor,
            "emissive_color" => Self::EmissiveColor,
            "emissive_value" => Self::EmissiveValue,
            "opacity_value" => Self::OpacityValue,
            "luminance" => Self::Luminance,
            "uv_shift" => Self::UvShift,
            _ => Self::Other,
        }
    }

    /// Whether the property belongs to the object transform.
    #[inline]
    #[must_use]
    pub fn is_transform(self) -> bool {
        matches!(
            self,
            Self::Location | Self::RotationQuaternion | Self::RotationEuler | Self::Scale
        )
    }
}

/// Owner of an animated property inside the animated data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelScope<'a> {
    /// The data block itself: `location`, `EDMProps.ANIMATED_BRIGHTNESS`.
    Object,
    /// A pose bone: `pose.bones["Spine"].location`.
    Bone(&'a str),
    /// A texture slot of a material: `textures["decal"].uv_shift`.
    Texture(&'a str),
}

/// Parsed curve target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelTarget<'a> {
    pub scope: ChannelScope<'a>,
    pub property: PropertyPath,
}

impl<'a> ChannelTarget<'a> {
    #[inline]
    #[must_use]
    pub const fn object(property: PropertyPath) -> Self {
        Self {
            scope: ChannelScope::Object,
            property,
        }
    }

    #[inline]
    #[must_use]
    pub const fn bone(bone: &'a str, property: PropertyPath) -> Self {
        Self {
            scope: ChannelScope::Bone(bone),
            property,
        }
    }

    #[inline]
    #[must_use]
    pub const fn texture(slot: &'a str, property: PropertyPath) -> Self {
        Self {
            scope: ChannelScope::Texture(slot),
            property,
        }
    }

    /// Parses a data path.
    ///
    /// Unqualified paths may carry a property-group prefix
    /// (`EDMProps.LIGHT_SOFTNESS`); only the last segment names the property.
    #[must_use]
    pub fn parse(data_path: &'a str) -> Self {
        match split_data_path(data_path) {
            (Some(owner), property) => {
                let scope = if data_path.starts_with("textures[") {
                    ChannelScope::Texture(owner)
                } else {
                    ChannelScope::Bone(owner)
                };
                Self {
                    scope,
                    property: PropertyPath::parse(property),
                }
            }
            (None, path) => {
                let property = path.rsplit('.').next().unwrap_or(path);
                Self::object(PropertyPath::parse(property))
            }
        }
    }

    /// Whether `data_path` addresses this target.
    #[inline]
    #[must_use]
    pub fn matches(&self, data_path: &str) -> bool {
        let other = ChannelTarget::parse(data_path);
        self.property != PropertyPath::Other && other == *self
    }
}

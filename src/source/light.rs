use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::source::action::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LampKind {
    #[default]
    Point,
    Spot,
    Sun,
    Area,
}

/// Lamp data block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightData {
    pub kind: LampKind,
    pub color: Vec3,
    /// Radiant power in watts.
    pub energy: f32,
    pub use_custom_distance: bool,
    pub cutoff_distance: f32,
    pub specular_factor: f32,
    /// Full cone angle, radians.
    pub spot_size: f32,
    pub spot_blend: f32,
    /// Action animating the lamp data (`energy`, `color`, ...).
    pub animation: Option<Action>,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            kind: LampKind::Point,
            color: Vec3::ONE,
            energy: 10.0,
            use_custom_distance: false,
            cutoff_distance: 40.0,
            specular_factor: 1.0,
            spot_size: std::f32::consts::FRAC_PI_4,
            spot_blend: 0.15,
            animation: None,
        }
    }
}

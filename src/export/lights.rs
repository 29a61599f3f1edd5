//! Dynamic light export.

use std::f32::consts::PI;

use glam::Vec3;

use crate::animation::channel::{sample_float, sample_vec3};
use crate::animation::{ChannelTarget, Property, PropertyPath};
use crate::diagnostics::ExportLog;
use crate::errors::Result;
use crate::graph::{ExportGraph, ExportKey, ExportNode, LightKind, LightNode, NodeKind};
use crate::math::axis_rotation;
use crate::source::{Action, LampKind, LightData, SceneObject};

/// Luminous efficacy used to turn radiant watts into lumens.
pub const WATTS_TO_LUMENS: f32 = 683.0;

/// Range of a light without a custom cutoff distance.
pub const DEFAULT_LIGHT_DISTANCE: f32 = 50.0;

/// Widest exportable spot cone, degrees.
pub const MAX_SPOT_ANGLE_DEG: f32 = 170.0;

pub const LIGHT_TRANSFORM_NAME: &str = "Fake Light Transform";

#[inline]
fn brightness_of(energy: f32) -> f32 {
    energy / (4.0 * PI) * WATTS_TO_LUMENS
}

#[inline]
fn clamp_phi(angle: f32) -> f32 {
    angle.min(MAX_SPOT_ANGLE_DEG.to_radians())
}

/// Scalar property driven by `arg` when `action` has a curve on `path`.
pub(crate) fn float_property(
    action: Option<&Action>,
    path: PropertyPath,
    arg: i32,
    value: f32,
    f: impl Fn(f32) -> f32,
) -> Property<f32> {
    if arg < 0 {
        return Property::Constant(value);
    }
    action
        .and_then(|a| sample_float(a, &ChannelTarget::object(path), arg))
        .map_or(Property::Constant(value), |c| Property::Animated(c.map(f)))
}

fn color_property(data: &LightData, arg: i32) -> Property<Vec3> {
    if arg < 0 {
        return Property::Constant(data.color);
    }
    data.animation
        .as_ref()
        .and_then(|a| sample_vec3(a, &ChannelTarget::object(PropertyPath::Color), arg, data.color))
        .map_or(Property::Constant(data.color), Property::Animated)
}

/// Builds the light node of `obj`. Only point and spot lamps export.
pub fn build_light(obj: &SceneObject, data: &LightData, log: &mut ExportLog) -> Option<LightNode> {
    let props = &obj.props;
    let action = data.animation.as_ref();

    let kind = match data.kind {
        LampKind::Point => LightKind::Omni,
        LampKind::Spot => {
            let size = data.spot_size;
            LightKind::Spot {
                phi: float_property(action, PropertyPath::SpotSize, props.light_phy_arg, clamp_phi(size), clamp_phi),
                theta: float_property(
                    action,
                    PropertyPath::SpotBlend,
                    props.light_theta_arg,
                    size * data.spot_blend,
                    |blend| size * blend,
                ),
            }
        }
        LampKind::Sun | LampKind::Area => {
            log.info(&format!("{} light kind {:?} is not exported", obj.name, data.kind));
            return None;
        }
    };

    if !data.use_custom_distance {
        log.warning(&format!("{} light has no custom distance set.", obj.name));
    }
    let distance = if data.use_custom_distance {
        data.cutoff_distance
    } else {
        DEFAULT_LIGHT_DISTANCE
    };

    Some(LightNode {
        name: obj.name.clone(),
        kind,
        color: color_property(data, props.light_color_arg),
        brightness: float_property(
            action,
            PropertyPath::Energy,
            props.light_power_arg,
            brightness_of(data.energy),
            brightness_of,
        ),
        distance: float_property(
            action,
            PropertyPath::CutoffDistance,
            props.light_distance_arg,
            distance,
            |d| d,
        ),
        specular: float_property(
            action,
            PropertyPath::Specular,
            props.light_specular_arg,
            data.specular_factor,
            |s| s,
        ),
        softness: float_property(
            obj.animation.as_ref(),
            PropertyPath::LightSoftness,
            props.light_softness_arg,
            props.light_softness,
            |s| s,
        ),
    })
}

/// Emits the light of `obj` under a Y-rotated transform below `control`.
///
/// Returns `false` when the lamp kind is not exported.
pub fn export_light(
    graph: &mut ExportGraph,
    control: ExportKey,
    obj: &SceneObject,
    log: &mut ExportLog,
) -> Result<bool> {
    let Some(data) = obj.light() else {
        return Ok(false);
    };
    let Some(light) = build_light(obj, data, log) else {
        return Ok(false);
    };
    let transform = graph.insert_child(
        control,
        ExportNode::transform(LIGHT_TRANSFORM_NAME, axis_rotation(Vec3::Y, 90.0)),
    )?;
    graph.insert_child(transform, ExportNode::new(obj.name.clone(), NodeKind::Light(light)))?;
    Ok(true)
}

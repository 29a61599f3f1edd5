//! Fake light export.
//!
//! # Overview
//!
//! A fake light object turns its mesh into camera-facing light sprites:
//!
//! - **point mode**: one light per vertex, sized and mapped by the object
//!   properties. The weight of a vertex's first group is its animation
//!   delay ("rabbit lights").
//! - **surface mode**: one light per face, centred on the face, sized by
//!   its widest corner distance and mapped by the face's UV bounds. A second
//!   UV layer whose name contains `back` maps the back side.
//!
//! Brightness animation comes from the object's `ANIMATED_BRIGHTNESS`
//! curve, argument taken from the action name. With delays it becomes a
//! per-light animation; without, it replaces the luminance.

use glam::{Mat3, Vec2, Vec3};

use crate::animation::channel::sample_float;
use crate::animation::{ChannelTarget, Keyframe, Property, PropertyPath};
use crate::diagnostics::ExportLog;
use crate::errors::{ExportError, Result};
use crate::graph::{
    DelayedBrightness, ExportGraph, ExportKey, ExportNode, FakeLight, FakeLightKind, FakeLightsNode, NodeKind,
};
use crate::materials::{MaterialCache, MaterialWrap};
use crate::math::{RIGHT_TRANSFORM, rotation_3x3};
use crate::naming::{NO_ARGUMENT, is_light_direction_name};
use crate::source::{MaterialFamily, MeshData, ObjectData, SceneObject, TextureSlot};

/// Texture name used when a fake light has no emissive texture.
pub const MISSING_TEXTURE: &str = "__EMPTY__";

/// Most UV layers a surface-mode fake light may carry.
pub const MAX_UV_LAYERS: usize = 2;

/// Minimum attenuation of fake spot cones.
const SPOT_MIN_ATTENUATION: f32 = 0.05;

#[inline]
fn right_3x3() -> Mat3 {
    Mat3::from_mat4(RIGHT_TRANSFORM)
}

/// Lights sampled from the mesh, plus the per-light animation delays.
struct Samples {
    lights: Vec<FakeLight>,
    delays: Vec<f32>,
    has_delays: bool,
    /// Normal of the first face, surface mode only.
    first_normal: Option<Vec3>,
}

fn point_samples(obj: &SceneObject, mesh: &MeshData, spot: bool) -> Samples {
    let props = &obj.props;
    let back_uv = (spot && props.two_sided).then_some([props.uv_lb_back, props.uv_rt_back]);

    let mut has_delays = false;
    let delays = (0..mesh.positions.len() as u32)
        .map(|v| match mesh.weights(v).first() {
            Some(gw) => {
                has_delays = true;
                gw.weight
            }
            None => 0.0,
        })
        .collect();

    Samples {
        lights: mesh
            .positions
            .iter()
            .map(|&position| FakeLight {
                position,
                size: props.size,
                uv: [props.uv_lb, props.uv_rt],
                back_uv,
            })
            .collect(),
        delays,
        has_delays,
        first_normal: None,
    }
}

/// Front and optional back UV layer indices of a surface-mode mesh.
fn surface_layers(obj: &SceneObject, mesh: &MeshData) -> Result<(Option<usize>, Option<usize>)> {
    let layers = &mesh.uv_layers;
    let layout_error = |reason: String| ExportError::FakeLightUvLayout {
        object: obj.name.clone(),
        reason,
    };

    match layers.len() {
        0 => Ok((None, None)),
        1 => Ok((Some(0), None)),
        MAX_UV_LAYERS => {
            let back = layers
                .iter()
                .position(|l| l.name.to_lowercase().contains("back"))
                .ok_or_else(|| {
                    layout_error(
                        "Could not find texture layer for back side. Its name must contain \"back\".".into(),
                    )
                })?;
            Ok((Some(MAX_UV_LAYERS - 1 - back), Some(back)))
        }
        _ => Err(layout_error(format!(
            "Too much texture layers. {MAX_UV_LAYERS} layers is maximum"
        ))),
    }
}

fn uv_bounds(mesh: &MeshData, layer: Option<usize>, corners: &[u32]) -> [Vec2; 2] {
    let Some(layer) = layer.and_then(|i| mesh.uv_layers.get(i)) else {
        return [Vec2::ZERO; 2];
    };
    let mut uvs = corners
        .iter()
        .map(|&c| layer.uvs.get(c as usize).copied().unwrap_or(Vec2::ZERO));
    let Some(first) = uvs.next() else {
        return [Vec2::ZERO; 2];
    };
    let (min, max) = uvs.fold((first, first), |(min, max), uv| (min.min(uv), max.max(uv)));
    [min, max]
}

fn surface_samples(obj: &SceneObject, mesh: &MeshData) -> Result<Samples> {
    let (front, back) = surface_layers(obj, mesh)?;

    let lights: Vec<FakeLight> = mesh
        .polygons
        .iter()
        .map(|poly| {
            let points: Vec<Vec3> = poly
                .corners
                .iter()
                .map(|&c| mesh.position(mesh.corner_vertex(c)))
                .collect();
            let center = points.iter().copied().sum::<Vec3>() / points.len().max(1) as f32;
            let size = points
                .split_first()
                .map_or(0.0, |(p0, rest)| rest.iter().map(|p| p0.distance(*p)).fold(0.0, f32::max));
            FakeLight {
                position: center,
                size,
                uv: uv_bounds(mesh, front, &poly.corners),
                back_uv: back.map(|_| uv_bounds(mesh, back, &poly.corners)),
            }
        })
        .collect();

    let first_normal = mesh
        .polygons
        .first()
        .map(|p| (right_3x3() * Mat3::from_mat4(obj.matrix_world) * p.normal).normalize_or_zero());

    Ok(Samples {
        delays: vec![0.0; lights.len()],
        lights,
        has_delays: false,
        first_normal,
    })
}

/// Direction of a point-mode spot: +X of the first light-direction child,
/// or of the object itself, in export space.
fn spot_direction(obj: &SceneObject, children: &[&SceneObject], log: &mut ExportLog) -> Vec3 {
    let directions: Vec<&SceneObject> = children
        .iter()
        .copied()
        .filter(|c| matches!(c.data, ObjectData::Empty) && is_light_direction_name(&c.name))
        .collect();
    if directions.len() > 1 {
        log.warning(&format!(
            "{} fake spot light has more then one child direction objects.",
            obj.name
        ));
        for child in &directions {
            log.warning(&format!("{} -- fake spot light child direction.", child.name));
        }
    }
    let world = directions.first().map_or(obj.matrix_world, |c| c.matrix_world);
    right_3x3() * rotation_3x3(world) * Vec3::X
}

/// Keys of `keys` shifted by `delay`, per light.
///
/// Times are taken relative to the first key, offset by the delay, clamped
/// to `[-1, 1]` and halved.
#[must_use]
pub fn delay_keys(keys: &[Keyframe<f32>], delays: &[f32]) -> Vec<Vec<Keyframe<f32>>> {
    let Some(first) = keys.first() else {
        return Vec::new();
    };
    delays
        .iter()
        .map(|&delay| {
            keys.iter()
                .map(|k| Keyframe {
                    time: (k.time - first.time + delay).clamp(-1.0, 1.0) * 0.5,
                    value: k.value,
                })
                .collect()
        })
        .collect()
}

/// Builds the fake light node of `obj` from its material `wrap`.
///
/// `children` are the object's scene children, searched for a spot
/// direction helper.
pub fn build_fake_lights(
    obj: &SceneObject,
    wrap: &MaterialWrap<'_>,
    children: &[&SceneObject],
    log: &mut ExportLog,
) -> Result<Option<FakeLightsNode>> {
    let spot = match wrap.family() {
        MaterialFamily::FakeOmni => false,
        MaterialFamily::FakeSpot => true,
        _ => {
            log.warning(&format!("{} has no fake light material.", obj.name));
            return Ok(None);
        }
    };
    let label = if spot { "spot" } else { "omni" };
    let Some(mesh) = obj.data.geometry() else {
        return Ok(None);
    };
    let props = &obj.props;
    let params = wrap.desc.fake_light;

    let texture = match wrap.texture(TextureSlot::Emissive) {
        Some(tex) => tex.name.clone(),
        None => {
            log.warning(&format!("{} fake {label} must have emissive texture.", obj.name));
            MISSING_TEXTURE.to_string()
        }
    };

    let samples = if props.surface_mode {
        surface_samples(obj, mesh)?
    } else {
        point_samples(obj, mesh, spot)
    };

    let luminance_target = ChannelTarget::object(PropertyPath::Luminance);
    let luminance_animated = wrap
        .action()
        .is_some_and(|a| a.curves.iter().any(|c| luminance_target.matches(&c.data_path)));
    let brightness_target = ChannelTarget::object(PropertyPath::AnimatedBrightness);
    let brightness_action = obj
        .animation
        .as_ref()
        .filter(|a| a.curves.iter().any(|c| brightness_target.matches(&c.data_path)));
    let brightness_arg = brightness_action.map_or(NO_ARGUMENT, |a| a.argument());

    if luminance_animated && props.luminance_arg >= 0 && brightness_arg >= 0 && samples.has_delays {
        log.warning(&format!(
            "{} fake {label} light has material and geometry luminamce animation. Only geometry luminamce animation exported!",
            obj.name
        ));
    }
    if luminance_animated && props.luminance_arg < 0 {
        log.warning(&format!(
            "{} fake {label} light has material animation but LUMINANCE_ARG not set.",
            obj.name
        ));
    }
    if brightness_action.is_some() && brightness_arg < 0 && samples.has_delays {
        log.warning(&format!(
            "{} fake {label} light has geometry animation but brightness action name not has arg.",
            obj.name
        ));
    }

    let mut luminance = Property::Constant(params.luminance);
    if luminance_animated
        && props.luminance_arg >= 0
        && let Some(channel) = wrap
            .action()
            .and_then(|a| sample_float(a, &luminance_target, props.luminance_arg))
    {
        luminance = Property::Animated(channel);
    }

    let mut animation = None;
    if let Some(action) = brightness_action.filter(|_| brightness_arg >= 0)
        && let Some(channel) = sample_float(action, &brightness_target, brightness_arg)
    {
        if samples.has_delays {
            animation = Some(DelayedBrightness {
                argument: brightness_arg,
                lights: delay_keys(&channel.keys, &samples.delays),
            });
        } else {
            luminance = Property::Animated(channel);
        }
    }

    let kind = if spot {
        let direction = match samples.first_normal {
            Some(normal) => normal,
            None => spot_direction(obj, children, log),
        };
        FakeLightKind::Spot {
            cone_setup: Vec3::new(
                params.theta.to_radians().cos(),
                params.phi.to_radians().cos(),
                SPOT_MIN_ATTENUATION,
            ),
            direction,
        }
    } else {
        FakeLightKind::Omni
    };

    Ok(Some(FakeLightsNode {
        name: obj.name.clone(),
        kind,
        texture,
        min_size_pixels: params.min_size_pixels,
        max_distance: params.max_distance,
        shift_to_camera: params.shift_to_camera,
        luminance,
        lights: samples.lights,
        animation,
    }))
}

/// Emits the fake lights of `obj` under `control` and returns the light
/// count. The material comes from the first slot and is required.
pub fn export_fake_light(
    graph: &mut ExportGraph,
    control: ExportKey,
    obj: &SceneObject,
    children: &[&SceneObject],
    materials: &mut MaterialCache<'_>,
    log: &mut ExportLog,
) -> Result<usize> {
    let Some(wrap) = materials.slot(&obj.material_slots, 0) else {
        return Err(ExportError::MissingMaterial {
            object: obj.name.clone(),
        });
    };
    let Some(node) = build_fake_lights(obj, &wrap, children, log)? else {
        return Ok(0);
    };
    let count = node.lights.len();
    graph.insert_child(control, ExportNode::new(obj.name.clone(), NodeKind::FakeLights(node)))?;
    Ok(count)
}

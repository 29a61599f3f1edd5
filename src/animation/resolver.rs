//! Argument-driven transform and visibility animation.
//!
//! # Overview
//!
//! An object whose active action carries an argument and targets a transform
//! property is exported as a chain of nodes instead of a single transform:
//!
//! ```text
//! parent
//!  └─ <name>_mat              static local matrix
//!      └─ <name>_bmat_inv     inverse of the basis matrix
//!          └─ al_<name> | tl_<name>    position
//!              └─ as_<name> | s_<name> scale
//!                  └─ ar_<name> | tr_<name>  rotation
//! ```
//!
//! Each component is animated independently; a component without curves
//! stays a static transform taken from the basis decomposition. Animation
//! keys live in basis space, which is why the basis is undone first.

use bitflags::bitflags;
use glam::Mat4;

use crate::animation::channel::{sample_float, sample_vec3, sample_vec4};
use crate::animation::path::{ChannelScope, ChannelTarget, PropertyPath};
use crate::diagnostics::ExportLog;
use crate::errors::Result;
use crate::graph::{AnimatedTransform, ExportGraph, ExportKey, ExportNode, NodeKind};
use crate::math::{decompose, euler_xyz_to_quat, quat_from_wxyz, quat_to_euler_xyz, quat_to_wxyz};
use crate::settings::{ArgumentFilter, argument_allowed};
use crate::source::{Action, SceneObject};

bitflags! {
    /// Transform components allowed to animate.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AllowedAnimations: u32 {
        const LOCATION = 1 << 0;
        const SCALE    = 1 << 1;
        const ROTATION = 1 << 2;
    }
}

impl Default for AllowedAnimations {
    fn default() -> Self {
        Self::all()
    }
}

/// Returns the action and its argument when `action` animates a transform
/// property of `scope` and its argument passes `filter`.
#[must_use]
pub fn has_transform_anim<'a>(
    action: Option<&'a Action>,
    scope: ChannelScope<'_>,
    filter: Option<&ArgumentFilter>,
) -> Option<(&'a Action, i32)> {
    transform_anim_where(action, filter, |s| s == scope)
}

/// Like [`has_transform_anim`] with the bone qualifier stripped: any bone's
/// transform curve counts.
#[must_use]
pub fn has_bone_transform_anim<'a>(
    action: Option<&'a Action>,
    filter: Option<&ArgumentFilter>,
) -> Option<(&'a Action, i32)> {
    transform_anim_where(action, filter, |s| matches!(s, ChannelScope::Bone(_)))
}

fn transform_anim_where<'a>(
    action: Option<&'a Action>,
    filter: Option<&ArgumentFilter>,
    scope: impl Fn(ChannelScope<'_>) -> bool,
) -> Option<(&'a Action, i32)> {
    let action = action?;
    let arg = action.argument();
    if arg < 0 || !argument_allowed(filter, arg) {
        return None;
    }
    action
        .curves
        .iter()
        .map(|c| ChannelTarget::parse(&c.data_path))
        .any(|t| scope(t.scope) && t.property.is_transform())
        .then_some((action, arg))
}

/// Warns about transform or visibility curves in an action whose name
/// selects no argument. Such curves are never exported.
pub fn warn_unassigned_curves(action: Option<&Action>, log: &mut ExportLog) {
    let Some(action) = action else {
        return;
    };
    if action.argument() >= 0 {
        return;
    }
    let animated = action.curves.iter().any(|c| {
        let target = ChannelTarget::parse(&c.data_path);
        target.property.is_transform() || target.property == PropertyPath::Visible
    });
    if animated {
        log.warning(&format!(
            "action {} animates properties but has no argument in its name.",
            action.name
        ));
    }
}

/// Static and basis matrices of a node animated through a transform chain.
#[derive(Debug, Clone, Copy)]
pub struct TransformSource<'a> {
    pub name: &'a str,
    /// Matrix applied before the chain.
    pub matrix: Mat4,
    /// Space the animation keys are authored in.
    pub basis: Mat4,
    pub scope: ChannelScope<'a>,
}

/// Emits the transform chain of `source` under `parent` and returns its leaf.
pub fn extract_transform_chain(
    graph: &mut ExportGraph,
    parent: ExportKey,
    action: &Action,
    arg: i32,
    source: &TransformSource<'_>,
    allowed: AllowedAnimations,
) -> Result<ExportKey> {
    let name = source.name;
    let (bloc, brot, bsca) = decompose(source.basis);
    let target = |property| ChannelTarget {
        scope: source.scope,
        property,
    };

    let position = allowed
        .contains(AllowedAnimations::LOCATION)
        .then(|| sample_vec3(action, &target(PropertyPath::Location), arg, bloc))
        .flatten();
    let scale = allowed
        .contains(AllowedAnimations::SCALE)
        .then(|| sample_vec3(action, &target(PropertyPath::Scale), arg, bsca))
        .flatten();
    let rotation = allowed
        .contains(AllowedAnimations::ROTATION)
        .then(|| {
            // Euler curves win over quaternion curves.
            sample_vec3(action, &target(PropertyPath::RotationEuler), arg, quat_to_euler_xyz(brot))
                .map(|c| c.map(euler_xyz_to_quat))
                .or_else(|| {
                    sample_vec4(action, &target(PropertyPath::RotationQuaternion), arg, quat_to_wxyz(brot))
                        .map(|c| c.map(quat_from_wxyz))
                })
        })
        .flatten();

    let mut leaf = graph.insert_child(parent, ExportNode::transform(format!("{name}_mat"), source.matrix))?;
    leaf = graph.insert_child(
        leaf,
        ExportNode::transform(format!("{name}_bmat_inv"), source.basis.inverse()),
    )?;

    let node = match position {
        Some(channel) => ExportNode::new(
            format!("al_{name}"),
            NodeKind::Animation(AnimatedTransform::Position(channel)),
        ),
        None => ExportNode::transform(format!("tl_{name}"), Mat4::from_translation(bloc)),
    };
    leaf = graph.insert_child(leaf, node)?;

    let node = match scale {
        Some(channel) => ExportNode::new(
            format!("as_{name}"),
            NodeKind::Animation(AnimatedTransform::Scale(channel)),
        ),
        None => ExportNode::transform(format!("s_{name}"), Mat4::from_scale(bsca)),
    };
    leaf = graph.insert_child(leaf, node)?;

    let node = match rotation {
        Some(channel) => ExportNode::new(
            format!("ar_{name}"),
            NodeKind::Animation(AnimatedTransform::Rotation(channel)),
        ),
        None => ExportNode::transform(format!("tr_{name}"), Mat4::from_quat(brot)),
    };
    leaf = graph.insert_child(leaf, node)?;

    Ok(leaf)
}

/// Emits the transform of `obj` under `parent`: a full chain when the object
/// is animated, a single `Transform(name, matrix_local)` otherwise.
pub fn extract_transform_animation(
    graph: &mut ExportGraph,
    parent: ExportKey,
    obj: &SceneObject,
    filter: Option<&ArgumentFilter>,
) -> Result<ExportKey> {
    match has_transform_anim(obj.animation.as_ref(), ChannelScope::Object, filter) {
        Some((action, arg)) => {
            let source = TransformSource {
                name: &obj.name,
                matrix: obj.matrix_local,
                basis: obj.matrix_basis,
                scope: ChannelScope::Object,
            };
            extract_transform_chain(graph, parent, action, arg, &source, AllowedAnimations::all())
        }
        None => Ok(graph.insert_child(parent, ExportNode::transform(obj.name.clone(), obj.matrix_local))?),
    }
}

/// Emits `v_<name>` under `parent` when the object's action carries an
/// allowed argument and a `VISIBLE` channel. Returns the node to continue
/// from.
pub fn extract_visibility_animation(
    graph: &mut ExportGraph,
    parent: ExportKey,
    obj: &SceneObject,
    filter: Option<&ArgumentFilter>,
) -> Result<ExportKey> {
    let Some(action) = obj.animation.as_ref() else {
        return Ok(parent);
    };
    let arg = action.argument();
    if arg < 0 || !argument_allowed(filter, arg) {
        return Ok(parent);
    }
    match sample_float(action, &ChannelTarget::object(PropertyPath::Visible), arg) {
        Some(channel) => Ok(graph.insert_child(
            parent,
            ExportNode::new(format!("v_{}", obj.name), NodeKind::ArgVisibility(channel)),
        )?),
        None => Ok(parent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FCurve;

    fn graph_with_root() -> (ExportGraph, ExportKey) {
        let mut graph = ExportGraph::new();
        let root = graph.insert(ExportNode::group("root"));
        (graph, root)
    }

    fn names(graph: &ExportGraph, root: ExportKey) -> Vec<String> {
        graph
            .depth_first(root)
            .into_iter()
            .filter_map(|k| graph.value(k).map(|n| n.name.clone()))
            .collect()
    }

    #[test]
    fn unanimated_object_is_single_transform() {
        let (mut graph, root) = graph_with_root();
        let obj = SceneObject::empty("Wing");
        let leaf = extract_transform_animation(&mut graph, root, &obj, None).unwrap();
        assert_eq!(names(&graph, root), ["root", "Wing"]);
        assert_eq!(graph.parent(leaf), Some(root));
    }

    #[test]
    fn only_animated_components_are_replaced() {
        let (mut graph, root) = graph_with_root();
        let obj = SceneObject::empty("Flap").with_animation(
            Action::new("3_flap").with_curve(FCurve::linear("rotation_euler", 0, &[(0.0, 0.0), (200.0, 1.0)])),
        );
        extract_transform_animation(&mut graph, root, &obj, None).unwrap();
        assert_eq!(
            names(&graph, root),
            ["root", "Flap_mat", "Flap_bmat_inv", "tl_Flap", "s_Flap", "ar_Flap"]
        );
    }

    #[test]
    fn filtered_argument_is_static() {
        let (mut graph, root) = graph_with_root();
        let obj = SceneObject::empty("Flap")
            .with_animation(Action::new("3_flap").with_curve(FCurve::linear("location", 0, &[(0.0, 0.0)])));
        let filter = ArgumentFilter::only(4);
        extract_transform_animation(&mut graph, root, &obj, Some(&filter)).unwrap();
        assert_eq!(names(&graph, root), ["root", "Flap"]);
    }

    #[test]
    fn visibility_node_needs_argument_and_channel() {
        let (mut graph, root) = graph_with_root();
        let obj = SceneObject::empty("Gear")
            .with_animation(Action::new("7_gear").with_curve(FCurve::linear("VISIBLE", 0, &[(0.0, 1.0)])));
        let vis = extract_visibility_animation(&mut graph, root, &obj, None).unwrap();
        assert_ne!(vis, root);
        assert_eq!(graph.value(vis).unwrap().name, "v_Gear");

        let obj = SceneObject::empty("Gear")
            .with_animation(Action::new("gear").with_curve(FCurve::linear("VISIBLE", 0, &[(0.0, 1.0)])));
        assert_eq!(extract_visibility_animation(&mut graph, root, &obj, None).unwrap(), root);
    }

    #[test]
    fn unassigned_curves_warn() {
        let mut log = ExportLog::new();
        let action = Action::new("flap").with_curve(FCurve::linear("location", 0, &[(0.0, 0.0)]));
        warn_unassigned_curves(Some(&action), &mut log);
        assert_eq!(log.warnings().len(), 1);
    }
}

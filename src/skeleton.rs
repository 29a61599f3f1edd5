//! Skeleton export.
//!
//! # Overview
//!
//! Armatures arrive as flat bone lists. [`BoneForest::build`] links them
//! into a forest through a name index, and [`SkeletonGraphBuilder`] walks
//! each tree root-first, emitting one `Bone` export node per bone:
//!
//! - pose-local matrix: `parentPose⁻¹ · pose`, or `pose` for a root
//! - inverse bind matrix: `rest⁻¹`, the bone's armature-space rest matrix
//!
//! When the armature's action animates the transform of any bone, every
//! bone is emitted as a transform chain built from its rest-local matrix,
//! followed by `Bone(identity, inverse bind)` so the local transform is
//! applied once. Bones without curves of their own get a static chain.
//!
//! Emitted bones are recorded in a [`SkeletonBinding`] keyed by bone id
//! (`"<armature> : <bone>"`). Skin resolution and bone-parented objects look
//! them up there.

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::animation::{
    AllowedAnimations, ChannelScope, TransformSource, extract_transform_chain, has_bone_transform_anim,
};
use crate::diagnostics::ExportLog;
use crate::errors::{ExportError, Result};
use crate::graph::{ExportGraph, ExportKey, ExportNode};
use crate::naming::bone_id;
use crate::settings::ArgumentFilter;
use crate::source::{ArmatureData, SceneObject};
use crate::tree::Tree;

slotmap::new_key_type! {
    pub struct BoneKey;
}

/// One bone with its derived matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneNode {
    /// Export id, `"<armature> : <bone>"`.
    pub id: String,
    /// Bone name inside its armature.
    pub name: String,
    pub length: f32,
    /// `parentRest⁻¹ · rest`.
    pub rest_local: Mat4,
    /// `parentPose⁻¹ · pose`.
    pub pose_local: Mat4,
    /// `rest⁻¹`.
    pub inverse_bind: Mat4,
}

/// Bone hierarchy of one armature.
#[derive(Debug)]
pub struct BoneForest {
    armature: String,
    tree: Tree<BoneKey, BoneNode>,
    roots: Vec<BoneKey>,
}

impl BoneForest {
    /// Links the flat bone list of `armature`.
    pub fn build(armature: &str, data: &ArmatureData) -> Result<Self> {
        let by_name: FxHashMap<&str, usize> = data
            .bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.as_str(), i))
            .collect();

        let mut tree = Tree::new();
        let mut keys = Vec::with_capacity(data.bones.len());
        for bone in &data.bones {
            let parent = match bone.parent.as_deref() {
                Some(name) => {
                    let &i = by_name.get(name).ok_or_else(|| ExportError::UnresolvedReference {
                        what: "bone",
                        name: name.to_string(),
                    })?;
                    Some(&data.bones[i])
                }
                None => None,
            };
            let (rest_local, pose_local) = match parent {
                Some(p) => (
                    p.rest_matrix.inverse() * bone.rest_matrix,
                    p.pose_matrix.inverse() * bone.pose_matrix,
                ),
                None => (bone.rest_matrix, bone.pose_matrix),
            };
            keys.push(tree.insert(BoneNode {
                id: bone_id(armature, &bone.name),
                name: bone.name.clone(),
                length: bone.length,
                rest_local,
                pose_local,
                inverse_bind: bone.rest_matrix.inverse(),
            }));
        }

        let mut roots = Vec::new();
        for (bone, &key) in data.bones.iter().zip(&keys) {
            match bone.parent.as_deref().and_then(|p| by_name.get(p)) {
                Some(&i) => tree.add_child(keys[i], key)?,
                None => roots.push(key),
            }
        }

        Ok(Self {
            armature: armature.to_string(),
            tree,
            roots,
        })
    }

    #[inline]
    #[must_use]
    pub fn armature(&self) -> &str {
        &self.armature
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[BoneKey] {
        &self.roots
    }

    #[inline]
    #[must_use]
    pub fn bone(&self, key: BoneKey) -> Option<&BoneNode> {
        self.tree.value(key)
    }

    #[inline]
    #[must_use]
    pub fn children(&self, key: BoneKey) -> &[BoneKey] {
        self.tree.children(key)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Releases every bone, roots first.
    pub fn destroy(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            self.tree.destroy(root);
        }
        self.tree.clear();
    }
}

/// Emitted bone, as seen by skins and bone-parented objects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneBinding {
    pub node: ExportKey,
    pub length: f32,
}

/// Bones emitted during one run, keyed by bone id.
#[derive(Debug, Default)]
pub struct SkeletonBinding {
    bones: FxHashMap<String, BoneBinding>,
    forests: Vec<BoneForest>,
}

impl SkeletonBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BoneBinding> {
        self.bones.get(id)
    }

    #[must_use]
    pub fn node_of(&self, id: &str) -> Option<ExportKey> {
        self.bones.get(id).map(|b| b.node)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Tears down every forest and forgets the emitted bones.
    pub fn destroy(&mut self) {
        for forest in &mut self.forests {
            forest.destroy();
        }
        self.forests.clear();
        self.bones.clear();
    }
}

/// Emits the bones of one armature object.
pub struct SkeletonGraphBuilder<'a> {
    armature: &'a SceneObject,
    filter: Option<&'a ArgumentFilter>,
}

impl<'a> SkeletonGraphBuilder<'a> {
    #[must_use]
    pub fn new(armature: &'a SceneObject, filter: Option<&'a ArgumentFilter>) -> Self {
        Self { armature, filter }
    }

    /// Emits `forest` under `parent` and records each bone in `binding`.
    pub fn emit(
        &self,
        graph: &mut ExportGraph,
        parent: ExportKey,
        forest: &BoneForest,
        binding: &mut SkeletonBinding,
    ) -> Result<()> {
        let mut stack: Vec<(BoneKey, ExportKey)> = forest.roots().iter().rev().map(|&r| (r, parent)).collect();
        while let Some((key, parent)) = stack.pop() {
            let Some(bone) = forest.bone(key) else {
                continue;
            };
            let node = self.emit_bone(graph, parent, bone)?;
            binding.bones.insert(
                bone.id.clone(),
                BoneBinding {
                    node,
                    length: bone.length,
                },
            );
            stack.extend(forest.children(key).iter().rev().map(|&c| (c, node)));
        }
        Ok(())
    }

    fn emit_bone(&self, graph: &mut ExportGraph, parent: ExportKey, bone: &BoneNode) -> Result<ExportKey> {
        match has_bone_transform_anim(self.armature.animation.as_ref(), self.filter) {
            Some((action, arg)) => {
                let source = TransformSource {
                    name: &bone.id,
                    matrix: bone.rest_local,
                    basis: self.armature.matrix_local,
                    scope: ChannelScope::Bone(&bone.name),
                };
                let leaf = extract_transform_chain(graph, parent, action, arg, &source, AllowedAnimations::all())?;
                Ok(graph.insert_child(leaf, ExportNode::bone(&bone.id, Mat4::IDENTITY, bone.inverse_bind))?)
            }
            None => Ok(graph.insert_child(
                parent,
                ExportNode::bone(&bone.id, bone.pose_local, bone.inverse_bind),
            )?),
        }
    }
}

/// Emits the skeleton of `obj` under `parent`. An armature without bones
/// only warns.
pub fn export_armature(
    graph: &mut ExportGraph,
    parent: ExportKey,
    obj: &SceneObject,
    filter: Option<&ArgumentFilter>,
    binding: &mut SkeletonBinding,
    log: &mut ExportLog,
) -> Result<()> {
    let Some(data) = obj.armature() else {
        return Ok(());
    };
    if data.bones.is_empty() {
        log.warning(&format!("Armature {} is empty", obj.name));
        return Ok(());
    }

    let forest = BoneForest::build(&obj.name, data)?;
    SkeletonGraphBuilder::new(obj, filter).emit(graph, parent, &forest, binding)?;
    log::debug!("armature {} exported {} bones", obj.name, forest.len());
    binding.forests.push(forest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::source::{Action, BoneDesc, FCurve, ObjectData};
    use glam::Vec3;

    fn rig() -> ArmatureData {
        ArmatureData::new(vec![
            BoneDesc::at_rest("Tip", Some("Root"), Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)), 0.5),
            BoneDesc::at_rest("Root", None, Mat4::IDENTITY, 1.0),
        ])
    }

    #[test]
    fn forest_links_by_name() {
        let forest = BoneForest::build("Rig", &rig()).unwrap();
        assert_eq!(forest.roots().len(), 1);
        let root = forest.roots()[0];
        assert_eq!(forest.bone(root).unwrap().id, "Rig : Root");
        let tip = forest.children(root)[0];
        let tip = forest.bone(tip).unwrap();
        assert!(
            tip.pose_local
                .transform_point3(Vec3::ZERO)
                .abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6)
        );
    }

    #[test]
    fn unknown_parent_bone_is_rejected() {
        let data = ArmatureData::new(vec![BoneDesc::at_rest("Tip", Some("Nope"), Mat4::IDENTITY, 1.0)]);
        assert!(BoneForest::build("Rig", &data).is_err());
    }

    #[test]
    fn static_bones_nest_under_parent_bones() {
        let obj = SceneObject::new("Rig", ObjectData::Armature(rig()));
        let mut graph = ExportGraph::new();
        let root = graph.insert(ExportNode::group("root"));
        let mut binding = SkeletonBinding::new();
        let mut log = ExportLog::new();
        export_armature(&mut graph, root, &obj, None, &mut binding, &mut log).unwrap();

        let root_bone = binding.node_of("Rig : Root").unwrap();
        let tip_bone = binding.node_of("Rig : Tip").unwrap();
        assert_eq!(graph.parent(root_bone), Some(root));
        assert_eq!(graph.parent(tip_bone), Some(root_bone));
        assert_eq!(binding.get("Rig : Tip").unwrap().length, 0.5);

        binding.destroy();
        assert!(binding.is_empty());
    }

    #[test]
    fn empty_armature_warns() {
        let obj = SceneObject::new("Rig", ObjectData::Armature(ArmatureData::default()));
        let mut graph = ExportGraph::new();
        let root = graph.insert(ExportNode::group("root"));
        let mut binding = SkeletonBinding::new();
        let mut log = ExportLog::new();
        export_armature(&mut graph, root, &obj, None, &mut binding, &mut log).unwrap();
        assert_eq!(log.warnings(), ["Armature Rig is empty"]);
    }

    #[test]
    fn inverse_bind_comes_from_rest_matrix() {
        let mut bone = BoneDesc::at_rest("Root", None, Mat4::IDENTITY, 1.0);
        bone.pose_matrix = Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0));
        let obj = SceneObject::new("Rig", ObjectData::Armature(ArmatureData::new(vec![bone])));
        let mut graph = ExportGraph::new();
        let root = graph.insert(ExportNode::group("root"));
        let mut binding = SkeletonBinding::new();
        let mut log = ExportLog::new();
        export_armature(&mut graph, root, &obj, None, &mut binding, &mut log).unwrap();

        let node = graph.value(binding.node_of("Rig : Root").unwrap()).unwrap();
        let NodeKind::Bone { matrix, inverse_bind } = node.kind else {
            panic!("expected a bone, got {}", node.kind_name());
        };
        assert!(inverse_bind.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(
            matrix
                .transform_point3(Vec3::ZERO)
                .abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), 1e-6)
        );
    }

    #[test]
    fn one_animated_bone_gives_every_bone_a_chain() {
        let obj = SceneObject::new("Rig", ObjectData::Armature(rig())).with_animation(
            Action::new("1_bend").with_curve(FCurve::linear(
                "pose.bones[\"Tip\"].rotation_euler",
                0,
                &[(0.0, 0.0), (200.0, 1.0)],
            )),
        );
        let mut graph = ExportGraph::new();
        let root = graph.insert(ExportNode::group("root"));
        let mut binding = SkeletonBinding::new();
        let mut log = ExportLog::new();
        export_armature(&mut graph, root, &obj, None, &mut binding, &mut log).unwrap();

        let root_bone = binding.node_of("Rig : Root").unwrap();
        let names: Vec<&str> = graph
            .ancestors(root_bone)
            .filter_map(|k| graph.value(k))
            .map(|n| n.name.as_str())
            .collect();
        assert!(names.contains(&"Rig : Root_mat"), "chain missing: {names:?}");
        assert!(names.contains(&"tr_Rig : Root"), "Root has no rotation curve: {names:?}");

        let tip_bone = binding.node_of("Rig : Tip").unwrap();
        let rotation = graph.value(graph.parent(tip_bone).unwrap()).unwrap();
        assert_eq!(rotation.name, "ar_Rig : Tip");

        let NodeKind::Bone { matrix, .. } = graph.value(root_bone).unwrap().kind else {
            panic!("expected a bone");
        };
        assert_eq!(matrix, Mat4::IDENTITY);
    }
}

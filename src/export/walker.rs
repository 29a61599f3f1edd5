//! Depth-first export traversal.
//!
//! # Overview
//!
//! [`ExportGraphWalker`] walks a [`SceneObjectTree`] and assembles the
//! [`ExportModel`]:
//!
//! 1. Synthetic nodes become groups, LOD roots become LOD switches.
//! 2. Each visible object gets a control node (visibility channel, then the
//!    transform chain) and is dispatched by kind to one of the payload
//!    exporters.
//! 3. Skinned render nodes are held back and resolved against the emitted
//!    bones once the whole scene has been walked ([`build_skin`]).
//!
//! The walk context (active armature, pending skin box) is passed by value
//! down the recursion, so a sibling never sees what a subtree set.
//!
//! [`build_skin`]: ExportGraphWalker::build_skin

use glam::{Mat4, Vec3};

use crate::animation::{extract_transform_animation, extract_visibility_animation, warn_unassigned_curves};
use crate::diagnostics::ExportLog;
use crate::errors::{ExportError, Result};
use crate::export::connectors::export_connector;
use crate::export::fake_lights::export_fake_light;
use crate::export::lights::export_light;
use crate::export::segments::{export_segments, export_shell};
use crate::graph::{BlockKind, ExportKey, ExportModel, ExportNode, NodeKind, PbrNode, RenderNode};
use crate::materials::{MaterialCache, build_render_node};
use crate::math::{Aabb, ROOT_TRANSFORM};
use crate::mesh::VertexWelder;
use crate::naming::bone_id;
use crate::scene::{ObjectNodeKey, ObjectNodeKind, SceneObjectTree};
use crate::settings::{ArgumentFilter, ExportSettings};
use crate::skeleton::{SkeletonBinding, export_armature};
use crate::source::{ObjectData, SceneObject, SceneSnapshot, SpecialType};

/// Lifecycle of one walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Walking,
    SkinResolution,
    Done,
    Failed,
}

/// Counters collected while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub objects: usize,
    pub render_nodes: usize,
    pub triangles: usize,
    pub lights: usize,
    pub fake_lights: usize,
    pub skins: usize,
}

/// State threaded down the recursion.
#[derive(Debug, Clone, Copy, Default)]
struct WalkContext<'a> {
    armature: Option<&'a str>,
    skin_box: Option<Aabb>,
}

impl WalkContext<'_> {
    /// Same context with the pending skin box dropped.
    #[inline]
    fn without_skin_box(self) -> Self {
        Self { skin_box: None, ..self }
    }
}

/// Skinned render node waiting for its bones.
#[derive(Debug)]
struct PendingSkin {
    control: ExportKey,
    node: PbrNode,
}

/// Records `result`'s error as fatal before handing it on.
#[inline]
fn fatal<T>(log: &mut ExportLog, result: Result<T>) -> Result<T> {
    result.map_err(|e| log.fatal(e))
}

#[inline]
fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Builds the export graph of one snapshot.
pub struct ExportGraphWalker<'a, 'l> {
    snapshot: &'a SceneSnapshot,
    scene: &'a SceneObjectTree,
    filter: Option<ArgumentFilter>,
    apply_root_transform: bool,
    materials: MaterialCache<'a>,
    binding: SkeletonBinding,
    skins: Vec<PendingSkin>,
    model: ExportModel,
    stats: WalkStats,
    phase: ExportPhase,
    log: &'l mut ExportLog,
}

impl<'a, 'l> ExportGraphWalker<'a, 'l> {
    #[must_use]
    pub fn new(
        snapshot: &'a SceneSnapshot,
        scene: &'a SceneObjectTree,
        settings: &ExportSettings,
        log: &'l mut ExportLog,
    ) -> Self {
        Self {
            snapshot,
            scene,
            filter: settings.argument_filter(),
            apply_root_transform: settings.apply_root_transform,
            materials: MaterialCache::new(snapshot),
            binding: SkeletonBinding::new(),
            skins: Vec::new(),
            model: ExportModel::new(),
            stats: WalkStats::default(),
            phase: ExportPhase::Idle,
            log,
        }
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &ExportModel {
        &self.model
    }

    #[inline]
    #[must_use]
    pub fn binding(&self) -> &SkeletonBinding {
        &self.binding
    }

    /// Walks the scene and resolves the deferred skins.
    ///
    /// A fatal error stops the run in [`ExportPhase::Failed`] without
    /// resolving skins.
    pub fn run(&mut self) -> Result<()> {
        let result = self.walk().and_then(|()| self.build_skin());
        self.phase = match result {
            Ok(()) => ExportPhase::Done,
            Err(_) => ExportPhase::Failed,
        };
        self.log.clear_context();
        result
    }

    /// First pass: emits the root transform and walks the object tree.
    pub fn walk(&mut self) -> Result<()> {
        self.phase = ExportPhase::Walking;
        let root = if self.apply_root_transform {
            ExportNode::transform("", ROOT_TRANSFORM)
        } else {
            ExportNode::group("")
        };
        let root = self.model.graph.insert(root);
        self.model.root = Some(root);
        self.walk_node(self.scene.root(), root, "", WalkContext::default())
    }

    fn walk_node(&mut self, key: ObjectNodeKey, parent: ExportKey, path: &str, ctx: WalkContext<'a>) -> Result<()> {
        let scene = self.scene;
        let Some(node) = scene.node(key) else {
            return Ok(());
        };
        let full_name = join_path(path, &node.name);

        match node.kind {
            ObjectNodeKind::SceneRoot | ObjectNodeKind::Dummy | ObjectNodeKind::LodLevel { .. } => {
                let group = fatal(
                    self.log,
                    self.model
                        .graph
                        .insert_child(parent, ExportNode::group(node.name.clone()))
                        .map_err(ExportError::from),
                )?;
                self.walk_children(key, scene.children(key), group, &full_name, ctx.without_skin_box())
            }
            ObjectNodeKind::LodRoot => {
                let mut levels: Vec<(f32, ObjectNodeKey)> = scene
                    .children(key)
                    .iter()
                    .filter_map(|&c| match scene.node(c)?.kind {
                        ObjectNodeKind::LodLevel { distance } => Some((distance, c)),
                        _ => None,
                    })
                    .collect();
                levels.sort_by(|a, b| a.0.total_cmp(&b.0));

                let lod = ExportNode::new(
                    node.name.clone(),
                    NodeKind::Lod {
                        levels: levels.iter().map(|l| l.0).collect(),
                    },
                );
                let lod = fatal(
                    self.log,
                    self.model.graph.insert_child(parent, lod).map_err(ExportError::from),
                )?;
                let children: Vec<ObjectNodeKey> = levels.into_iter().map(|l| l.1).collect();
                self.walk_children(key, &children, lod, &full_name, ctx.without_skin_box())
            }
            ObjectNodeKind::Object { id, visible } => {
                let Some(obj) = self.snapshot.object(id) else {
                    return Err(self.log.fatal(ExportError::UnresolvedReference {
                        what: "object",
                        name: node.name.clone(),
                    }));
                };
                if !visible {
                    log::debug!("{full_name} is hidden");
                    return self.walk_children(key, scene.children(key), parent, &full_name, ctx.without_skin_box());
                }
                self.walk_object(key, obj, parent, &full_name, ctx)
            }
        }
    }

    fn walk_children(
        &mut self,
        key: ObjectNodeKey,
        children: &[ObjectNodeKey],
        parent: ExportKey,
        full_name: &str,
        ctx: WalkContext<'a>,
    ) -> Result<()> {
        if ctx.skin_box.is_some() && children.len() > 1 {
            let object = self.scene.node(key).map_or_else(String::new, |n| n.name.clone());
            return Err(self.log.fatal(ExportError::SkinBoxChildren {
                object,
                count: children.len(),
            }));
        }
        for &child in children {
            self.walk_node(child, parent, full_name, ctx)?;
        }
        Ok(())
    }

    /// Emits the control chain of a bone-parented object under the tip of
    /// its bone, or under `parent` otherwise.
    fn control_parent(&mut self, obj: &SceneObject, parent: ExportKey, ctx: WalkContext<'a>) -> Result<ExportKey> {
        let (Some(bone), Some(armature)) = (obj.parent_bone.as_deref(), ctx.armature) else {
            return Ok(parent);
        };
        let id = bone_id(armature, bone);
        let Some(binding) = self.binding.get(&id).copied() else {
            log::debug!("{} is parented to unknown bone {id}", obj.name);
            return Ok(parent);
        };
        let tip = ExportNode::transform(
            format!("End Of {id}"),
            Mat4::from_translation(Vec3::new(0.0, binding.length, 0.0)),
        );
        let tip = fatal(
            self.log,
            self.model.graph.insert_child(binding.node, tip).map_err(ExportError::from),
        )?;
        log::debug!("{bone} --> {}", obj.name);
        Ok(tip)
    }

    fn walk_object(
        &mut self,
        key: ObjectNodeKey,
        obj: &'a SceneObject,
        parent: ExportKey,
        full_name: &str,
        ctx: WalkContext<'a>,
    ) -> Result<()> {
        let scene = self.scene;
        self.log.set_context(obj.name.clone());
        self.stats.objects += 1;
        warn_unassigned_curves(obj.animation.as_ref(), self.log);

        let parent = self.control_parent(obj, parent, ctx)?;
        let filter = self.filter.as_ref();
        let graph = &mut self.model.graph;
        let control = fatal(
            self.log,
            extract_visibility_animation(graph, parent, obj, filter)
                .and_then(|node| extract_transform_animation(graph, node, obj, filter)),
        )?;

        let mut ctx = ctx;
        let mut control = control;
        let kind = obj.data.kind_name();
        let special = obj.special;

        if obj.light().is_some() {
            let result = export_light(&mut self.model.graph, control, obj, self.log);
            if fatal(self.log, result)? {
                self.stats.lights += 1;
                self.log.info(&format!("{full_name} as {kind}"));
            }
        } else if obj.is_empty() && special.is_model_box() {
            let aabb = Aabb::of_marker(obj.matrix_world);
            match special {
                SpecialType::UserBox => self.model.user_box = Some(aabb),
                SpecialType::LightBox => self.model.light_box = Some(aabb),
                _ => self.model.bounding_box = Some(aabb),
            }
            self.log.info(&format!("{full_name} as {kind} {special:?}"));
        } else if special == SpecialType::SkinBox {
            ctx.skin_box = Some(Aabb::of_marker(obj.matrix_world));
            self.log.info(&format!("{full_name} as {kind} {special:?}"));
        } else if obj.is_empty() && special == SpecialType::Connector {
            let connector = export_connector(&mut self.model.graph, control, obj, self.log);
            fatal(self.log, connector)?;
            self.log.info(&format!("{full_name} as {kind} {special:?}"));
        } else if obj.is_mesh() && special == SpecialType::FakeLight {
            let children: Vec<&SceneObject> = scene
                .children(key)
                .iter()
                .filter_map(|&c| scene.node(c)?.object_id())
                .filter_map(|id| self.snapshot.object(id))
                .collect();
            let result = export_fake_light(
                &mut self.model.graph,
                control,
                obj,
                &children,
                &mut self.materials,
                self.log,
            );
            let count = fatal(self.log, result)?;
            self.stats.fake_lights += count;
            self.log.info(&format!("{full_name} as {kind}. N lights: {count}."));
        } else if obj.is_mesh() && special == SpecialType::Unknown {
            control = self.export_mesh(obj, control, &mut ctx)?;
        } else if matches!(obj.data, ObjectData::Mesh(_) | ObjectData::Surface(_))
            && special == SpecialType::CollisionShell
        {
            let triangles = fatal(self.log, export_shell(&mut self.model.graph, control, obj))?;
            self.log.info(&format!("{full_name} as {kind} {triangles}"));
        } else if matches!(obj.data, ObjectData::Mesh(_) | ObjectData::Curve(_))
            && special == SpecialType::CollisionLine
        {
            let segments = fatal(self.log, export_segments(&mut self.model.graph, control, obj))?;
            self.log.debug(&format!("{full_name} as {kind}, {segments} segments"));
        } else if obj.armature().is_some() {
            ctx.armature = Some(obj.name.as_str());
            let result = export_armature(
                &mut self.model.graph,
                control,
                obj,
                self.filter.as_ref(),
                &mut self.binding,
                self.log,
            );
            fatal(self.log, result)?;
            self.log.info(&format!("{full_name} as {kind}"));
        } else {
            self.log.info(&format!("{full_name} as {kind}"));
        }

        self.walk_children(key, scene.children(key), control, full_name, ctx)
    }

    /// Welds `obj` and emits one render node per material slot.
    ///
    /// Skinned nodes are parked under a fake control bone until
    /// [`build_skin`](Self::build_skin). Returns the node the object's
    /// children hang under.
    fn export_mesh(&mut self, obj: &'a SceneObject, control: ExportKey, ctx: &mut WalkContext<'a>) -> Result<ExportKey> {
        let Some(mesh) = obj.data.geometry() else {
            return Ok(control);
        };
        let skin = match obj.armature_modifier.as_deref() {
            Some(name) => {
                let (armature, data) = fatal(self.log, self.snapshot.armature(name))?;
                Some((armature.name.as_str(), data))
            }
            None => None,
        };
        let buffers = fatal(self.log, VertexWelder::build(mesh, skin))?;

        let mut control = control;
        let mut triangles = 0;
        for buffer in &buffers {
            let Some(wrap) = self.materials.slot(&obj.material_slots, buffer.material_index) else {
                self.log.record(&ExportError::MissingMaterial {
                    object: obj.name.clone(),
                });
                continue;
            };
            triangles += buffer.triangle_count();

            let Some(node) = fatal(self.log, build_render_node(obj, &wrap, buffer))? else {
                self.log.warning(&format!(
                    "{} uses fake light material {} on a mesh slot.",
                    obj.name,
                    wrap.name()
                ));
                continue;
            };

            match node {
                RenderNode::Pbr(mut pbr) if pbr.has_block(BlockKind::Bone) => {
                    if let Some(skin_box) = ctx.skin_box.take()
                        && let Some(block) = pbr.bone_block_mut()
                    {
                        block.skin_box = Some(skin_box);
                    }
                    let control_name = self.model.graph.value(control).map_or("", |n| n.name.as_str());
                    let bone = ExportNode::bone(
                        format!("Fake Control Bone {control_name}"),
                        obj.matrix_local,
                        Mat4::IDENTITY,
                    );
                    control = fatal(
                        self.log,
                        self.model.graph.insert_child(control, bone).map_err(ExportError::from),
                    )?;
                    self.skins.push(PendingSkin { control, node: pbr });
                }
                node => {
                    let render = ExportNode::new(node.name().to_string(), NodeKind::Render(node));
                    fatal(
                        self.log,
                        self.model.graph.insert_child(control, render).map_err(ExportError::from),
                    )?;
                    self.stats.render_nodes += 1;
                }
            }
        }

        self.stats.triangles += triangles;
        let control_name = self.model.graph.value(control).map_or("", |n| n.name.as_str());
        self.log.info(&format!(
            "{} as {}. Control node: {control_name}. N triangles: {triangles}.",
            obj.name,
            obj.data.kind_name()
        ));
        Ok(control)
    }

    /// Second pass: binds every parked skin to its emitted bones and
    /// attaches it under its fake control bone.
    pub fn build_skin(&mut self) -> Result<()> {
        self.phase = ExportPhase::SkinResolution;
        self.log.clear_context();

        for PendingSkin { control, mut node } in std::mem::take(&mut self.skins) {
            if let Some(block) = node.bone_block_mut() {
                let mut bones = Vec::with_capacity(block.bone_names.len());
                for name in &block.bone_names {
                    match self.binding.node_of(name) {
                        Some(bone) => bones.push(bone),
                        None => {
                            return Err(self.log.fatal(ExportError::UnresolvedBone { bone: name.clone() }));
                        }
                    }
                }
                block.bones = bones;
            }

            let render = ExportNode::new(node.name.clone(), NodeKind::Render(RenderNode::Pbr(node)));
            fatal(
                self.log,
                self.model.graph.insert_child(control, render).map_err(ExportError::from),
            )?;
            self.stats.render_nodes += 1;
            self.stats.skins += 1;
        }
        Ok(())
    }

    /// Releases the bone binding and hands the model out.
    #[must_use]
    pub fn into_model(mut self) -> ExportModel {
        self.binding.destroy();
        self.skins.clear();
        self.materials.clear();
        self.model
    }
}

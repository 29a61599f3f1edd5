//! Scene Source
//!
//! Read-only snapshot of the authoring scene handed to one export run.
//!
//! # Overview
//!
//! - [`SceneSnapshot`]: objects, the group hierarchy, the active view-layer
//!   visibility and the materials.
//! - [`SceneObject`]: one object with its transforms, data block, group
//!   memberships, animation and exporter properties.
//! - [`MeshData`], [`ArmatureData`], [`LightData`]: the data blocks.
//! - [`Action`] / [`FCurve`]: authored keyframe curves.
//!
//! Every type is serde-loadable, so a snapshot can be dumped by the authoring
//! tool and replayed with [`SceneSnapshot::from_json`].

pub mod action;
pub mod armature;
pub mod light;
pub mod material;
pub mod mesh;
pub mod object;

pub use action::{Action, CurveInterpolation, CurveKey, FCurve};
pub use armature::{ArmatureData, BoneDesc};
pub use light::{LampKind, LightData};
pub use material::{
    BlendMode, FakeLightParams, MaterialDesc, MaterialFamily, ShadowCaster, TextureRef, TextureSlot,
};
pub use mesh::{GroupWeight, MeshData, Polygon, Triangle, UvLayer};
pub use object::{ObjectData, ObjectProps, SceneObject, SpecialType};

use glam::Mat4;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ExportError, Result};

/// Index of an object in [`SceneSnapshot::objects`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// Index of a material in [`SceneSnapshot::materials`]. Material identity
/// is this index, not the material's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Name of the implicit top-level group.
pub const ROOT_GROUP: &str = "Scene Collection";

/// Authoring group nesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDesc {
    pub name: String,
    #[serde(default)]
    pub children: Vec<GroupDesc>,
}

impl GroupDesc {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: GroupDesc) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for GroupDesc {
    fn default() -> Self {
        Self::new(ROOT_GROUP)
    }
}

/// Per-view visibility of a group and its nested groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDesc {
    pub group: String,
    #[serde(default = "visible")]
    pub visible: bool,
    #[serde(default)]
    pub children: Vec<LayerDesc>,
}

fn visible() -> bool {
    true
}

impl LayerDesc {
    #[must_use]
    pub fn new(group: impl Into<String>, visible: bool) -> Self {
        Self {
            group: group.into(),
            visible,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: LayerDesc) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for LayerDesc {
    fn default() -> Self {
        Self::new(ROOT_GROUP, true)
    }
}

/// Snapshot of one authoring scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub root_group: GroupDesc,
    #[serde(default)]
    pub view_layer: LayerDesc,
    #[serde(default)]
    pub materials: Vec<MaterialDesc>,
}

impl SceneSnapshot {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds a snapshot with a flat group layout: objects without explicit
    /// groups are linked into the root group, and world matrices are derived
    /// from the local ones.
    #[must_use]
    pub fn from_objects(objects: Vec<SceneObject>, materials: Vec<MaterialDesc>) -> Self {
        let mut snapshot = Self {
            objects,
            materials,
            ..Default::default()
        };
        for obj in &mut snapshot.objects {
            if obj.groups.is_empty() {
                obj.groups.push(ROOT_GROUP.to_string());
            }
        }
        snapshot.update_world_matrices();
        snapshot
    }

    #[must_use]
    pub fn with_groups(mut self, root_group: GroupDesc, view_layer: LayerDesc) -> Self {
        self.root_group = root_group;
        self.view_layer = view_layer;
        self
    }

    /// Recomputes `matrix_world` of every object from its parent chain.
    pub fn update_world_matrices(&mut self) {
        let index = self.name_index();
        let mut world: Vec<Option<Mat4>> = vec![None; self.objects.len()];

        for start in 0..self.objects.len() {
            // Walk up to the first resolved ancestor, then resolve back down.
            let mut chain = vec![start];
            let mut base = Mat4::IDENTITY;
            while let Some(&current) = chain.last() {
                let parent = self.objects[current]
                    .parent
                    .as_deref()
                    .and_then(|p| index.get(p).copied());
                match parent {
                    Some(p) if chain.contains(&p) => break,
                    Some(p) => match world[p] {
                        Some(m) => {
                            base = m;
                            break;
                        }
                        None => chain.push(p),
                    },
                    None => break,
                }
            }
            for &i in chain.iter().rev() {
                base *= self.objects[i].matrix_local;
                world[i] = Some(base);
            }
        }

        for (obj, m) in self.objects.iter_mut().zip(world) {
            obj.matrix_world = m.unwrap_or(obj.matrix_local);
        }
    }

    fn name_index(&self) -> FxHashMap<&str, usize> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.name.as_str(), i))
            .collect()
    }

    /// Iterates `(id, object)` pairs in snapshot order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i as u32), o))
    }

    #[inline]
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0 as usize)
    }

    #[must_use]
    pub fn object_id(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .position(|o| o.name == name)
            .map(|i| ObjectId(i as u32))
    }

    #[must_use]
    pub fn object_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Objects whose recorded parent is `id`, in snapshot order.
    #[must_use]
    pub fn children_of(&self, id: ObjectId) -> Vec<ObjectId> {
        let Some(parent) = self.object(id) else {
            return Vec::new();
        };
        self.objects()
            .filter(|(_, o)| o.parent.as_deref() == Some(parent.name.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn material(&self, id: MaterialId) -> Option<&MaterialDesc> {
        self.materials.get(id.0 as usize)
    }

    /// Armature object referenced by name.
    pub fn armature(&self, name: &str) -> Result<(&SceneObject, &ArmatureData)> {
        self.object_by_name(name)
            .and_then(|o| o.armature().map(|a| (o, a)))
            .ok_or_else(|| ExportError::UnresolvedReference {
                what: "armature",
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn world_matrices_follow_parent_chain() {
        let snapshot = SceneSnapshot::from_objects(
            vec![
                SceneObject::empty("child")
                    .with_parent("root")
                    .with_transform(Mat4::from_translation(Vec3::X)),
                SceneObject::empty("root").with_transform(Mat4::from_translation(Vec3::Y)),
            ],
            vec![],
        );
        let child = snapshot.object_by_name("child").unwrap();
        let p = child.matrix_world.transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
        assert_eq!(child.groups, [ROOT_GROUP]);
    }

    #[test]
    fn snapshot_loads_from_json() {
        let json = r#"{
            "objects": [
                { "name": "Wing", "data": { "type": "empty" } },
                { "name": "Wing_Mesh", "parent": "Wing", "special": "COLLISION_LINE" }
            ]
        }"#;
        let snapshot = SceneSnapshot::from_json(json).unwrap();
        let wing = snapshot.object_id("Wing").unwrap();
        assert_eq!(snapshot.children_of(wing), [ObjectId(1)]);
        assert_eq!(snapshot.objects[1].special, SpecialType::CollisionLine);
        assert_eq!(snapshot.root_group.name, ROOT_GROUP);
    }
}

//! Corner welding.
//!
//! # Overview
//!
//! Triangulated meshes store normals and UVs per corner. The welder turns
//! them into indexed vertex buffers, one per used material slot:
//!
//! 1. Vertex groups are classified once: `DMG_<n>` groups tag damage
//!    arguments, groups named after a skeleton bone carry skin weights, the
//!    rest are ignored.
//! 2. Each triangle resolves one damage argument, the first tag of its first
//!    corner shared by the other two, or `-1`.
//! 3. A corner is identified by `(vertex, corner, damage argument)`. A known
//!    key reuses its output vertex, a new key appends one.
//!
//! Bone ids are numbered through a [`BoneTable`] shared by every slot of the
//! mesh, so all buffers of one skinned mesh index the same bone list.

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{ExportError, Result};
use crate::math::normalize_weights;
use crate::naming::{NO_ARGUMENT, bone_id, damage_group_arg};
use crate::source::{ArmatureData, MeshData, Triangle};

/// Minimum weight for a bone group to influence a vertex.
pub const MIN_BONE_WEIGHT: f32 = 1.0e-3;

/// Influence slots per skinned vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Identity of a welded output vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeldKey {
    pub vertex: u32,
    pub corner: u32,
    pub damage_arg: i32,
}

/// Incrementally numbered bone ids.
#[derive(Debug, Clone, Default)]
pub struct BoneTable {
    ids: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl BoneTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `id`, appending it on first use.
    pub fn index_of(&mut self, id: &str) -> u32 {
        if let Some(&i) = self.index.get(id) {
            return i;
        }
        let i = self.ids.len() as u32;
        self.ids.push(id.to_string());
        self.index.insert(id.to_string(), i);
        i
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<u32> {
        self.index.get(id).copied()
    }

    /// Bone ids, ordered by index.
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One UV layer of a welded buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct UvChannel {
    pub name: String,
    pub coords: Vec<Vec2>,
}

/// Skin attributes of a welded buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinAttributes {
    pub indices: Vec<[u32; 4]>,
    pub weights: Vec<[f32; 4]>,
    /// Bone ids in table order, filled when the slot is finished.
    pub bone_ids: Vec<String>,
}

/// Indexed geometry of one material slot.
#[derive(Debug, Clone, Default)]
pub struct VertexBuffer {
    pub material_index: u32,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: SmallVec<[UvChannel; 2]>,
    /// Present when the mesh is driven by a skeleton.
    pub skin: Option<SkinAttributes>,
    pub damage_arguments: Vec<i32>,
    pub indices: Vec<u32>,
    /// Set once any triangle resolved a damage argument.
    pub has_damage_groups: bool,
    weld_map: FxHashMap<WeldKey, u32>,
}

impl VertexBuffer {
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// UVs of layer `name`, or of the first layer when `name` is `None`.
    #[must_use]
    pub fn uv(&self, name: Option<&str>) -> Option<&[Vec2]> {
        let channel = match name {
            Some(name) => self.uvs.iter().find(|c| c.name == name),
            None => self.uvs.first(),
        };
        channel.map(|c| c.coords.as_slice())
    }

    #[must_use]
    pub fn is_skinned(&self) -> bool {
        self.skin.is_some()
    }

    /// Trims every attribute array to what the slot actually uses.
    pub fn shrink(&mut self) {
        self.positions.shrink_to_fit();
        self.normals.shrink_to_fit();
        for channel in &mut self.uvs {
            channel.coords.shrink_to_fit();
        }
        if let Some(skin) = &mut self.skin {
            skin.indices.shrink_to_fit();
            skin.weights.shrink_to_fit();
        }
        self.damage_arguments.shrink_to_fit();
        self.indices.shrink_to_fit();
        self.weld_map = FxHashMap::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupClass {
    Damage(i32),
    Bone,
    Ignored,
}

/// Welds the triangles of one mesh.
pub struct VertexWelder<'a> {
    mesh: &'a MeshData,
    armature: Option<&'a str>,
    classes: Vec<GroupClass>,
    bones: BoneTable,
}

impl<'a> VertexWelder<'a> {
    /// `skin` is the name and data of the armature driving the mesh, if any.
    #[must_use]
    pub fn new(mesh: &'a MeshData, skin: Option<(&'a str, &'a ArmatureData)>) -> Self {
        let classes = mesh
            .vertex_groups
            .iter()
            .map(|name| {
                let dmg = damage_group_arg(name);
                if dmg >= 0 {
                    GroupClass::Damage(dmg)
                } else if skin.is_some_and(|(_, a)| a.has_bone(name)) {
                    GroupClass::Bone
                } else {
                    GroupClass::Ignored
                }
            })
            .collect();

        Self {
            mesh,
            armature: skin.map(|(name, _)| name),
            classes,
            bones: BoneTable::new(),
        }
    }

    /// Welds every triangle, one buffer per used material index, ascending.
    pub fn build(mesh: &'a MeshData, skin: Option<(&'a str, &'a ArmatureData)>) -> Result<Vec<VertexBuffer>> {
        let mut welder = Self::new(mesh, skin);

        let mut slots: Vec<u32> = mesh.triangles.iter().map(|t| t.material_index).collect();
        slots.sort_unstable();
        slots.dedup();

        let mut buffers: Vec<VertexBuffer> = slots.iter().map(|&s| welder.begin_slot(s)).collect();
        for tri in &mesh.triangles {
            if let Ok(i) = slots.binary_search(&tri.material_index) {
                welder.weld_triangle(&mut buffers[i], tri)?;
            }
        }
        for buffer in &mut buffers {
            welder.finish_slot(buffer);
        }

        log::debug!(
            "welded {} triangles into {} slot buffers, {} bones",
            mesh.triangles.len(),
            buffers.len(),
            welder.bones.len()
        );
        Ok(buffers)
    }

    #[inline]
    #[must_use]
    pub fn bone_table(&self) -> &BoneTable {
        &self.bones
    }

    /// Empty buffer for `material_index` with this mesh's UV layers.
    #[must_use]
    pub fn begin_slot(&self, material_index: u32) -> VertexBuffer {
        VertexBuffer {
            material_index,
            uvs: self
                .mesh
                .uv_layers
                .iter()
                .map(|l| UvChannel {
                    name: l.name.clone(),
                    coords: Vec::new(),
                })
                .collect(),
            skin: self.armature.map(|_| SkinAttributes::default()),
            ..Default::default()
        }
    }

    /// Stamps the bone table onto `buffer` and trims it.
    pub fn finish_slot(&self, buffer: &mut VertexBuffer) {
        if let Some(skin) = &mut buffer.skin {
            skin.bone_ids = self.bones.ids().to_vec();
        }
        buffer.shrink();
    }

    /// Damage tags of the vertex behind `corner`.
    fn damage_tags(&self, corner: u32) -> SmallVec<[i32; 4]> {
        let vertex = self.mesh.corner_vertex(corner);
        self.mesh
            .weights(vertex)
            .iter()
            .filter_map(|gw| match self.classes.get(gw.group as usize) {
                Some(GroupClass::Damage(arg)) => Some(*arg),
                _ => None,
            })
            .collect()
    }

    /// Damage argument shared by all three corners, first match in the
    /// first corner's tag order.
    fn triangle_damage_arg(&self, tri: &Triangle) -> i32 {
        let [a, b, c] = tri.corners.map(|corner| self.damage_tags(corner));
        a.iter()
            .copied()
            .find(|t| b.contains(t) && c.contains(t))
            .unwrap_or(NO_ARGUMENT)
    }

    /// Appends one triangle to `buffer`.
    pub fn weld_triangle(&mut self, buffer: &mut VertexBuffer, tri: &Triangle) -> Result<()> {
        let damage_arg = self.triangle_damage_arg(tri);
        if damage_arg >= 0 {
            buffer.has_damage_groups = true;
        }

        for corner in tri.corners {
            let key = WeldKey {
                vertex: self.mesh.corner_vertex(corner),
                corner,
                damage_arg,
            };
            if let Some(&index) = buffer.weld_map.get(&key) {
                buffer.indices.push(index);
                continue;
            }

            let index = buffer.positions.len() as u32;
            if let Some(skin) = &mut buffer.skin {
                let (indices, weights) = self.influences(key.vertex)?;
                skin.indices.push(indices);
                skin.weights.push(weights);
            }
            buffer.positions.push(self.mesh.position(key.vertex));
            buffer.normals.push(
                self.mesh
                    .corner_normals
                    .get(corner as usize)
                    .copied()
                    .unwrap_or(Vec3::ZERO),
            );
            for (channel, layer) in buffer.uvs.iter_mut().zip(&self.mesh.uv_layers) {
                let uv = layer.uvs.get(corner as usize).copied().unwrap_or(Vec2::ZERO);
                channel.coords.push(Vec2::new(uv.x, -uv.y));
            }
            buffer.damage_arguments.push(damage_arg);

            buffer.weld_map.insert(key, index);
            buffer.indices.push(index);
        }
        Ok(())
    }

    /// Bone slots of `vertex`: up to four `(table index, weight)` pairs with
    /// weights summing to one, zeros when the vertex has no bone groups.
    fn influences(&mut self, vertex: u32) -> Result<([u32; 4], [f32; 4])> {
        let Some(armature) = self.armature else {
            return Ok(([0; 4], [0.0; 4]));
        };
        let groups: SmallVec<[(u32, f32); 4]> = self
            .mesh
            .weights(vertex)
            .iter()
            .filter(|gw| {
                gw.weight >= MIN_BONE_WEIGHT && self.classes.get(gw.group as usize) == Some(&GroupClass::Bone)
            })
            .map(|gw| (gw.group, gw.weight))
            .collect();

        if groups.len() > MAX_INFLUENCES {
            return Err(ExportError::TooManyInfluences {
                vertex,
                count: groups.len(),
            });
        }

        let mut indices = [0u32; 4];
        let mut weights = [0.0f32; 4];
        for (slot, &(group, weight)) in groups.iter().enumerate() {
            let name = &self.mesh.vertex_groups[group as usize];
            indices[slot] = self.bones.index_of(&bone_id(armature, name));
            weights[slot] = weight;
        }
        normalize_weights(&mut weights);
        Ok((indices, weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BoneDesc;
    use glam::Mat4;

    fn quad() -> MeshData {
        MeshData::from_triangles(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            &[[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn uv_v_is_negated() {
        let mesh = MeshData::from_triangles(vec![Vec3::ZERO, Vec3::X, Vec3::Y], &[[0, 1, 2]])
            .with_uv_layer("UVMap", vec![Vec2::new(0.0, 0.25), Vec2::new(1.0, 0.5), Vec2::new(0.0, 1.0)]);
        let buffers = VertexWelder::build(&mesh, None).unwrap();
        assert_eq!(buffers[0].uv(None).unwrap()[1], Vec2::new(1.0, -0.5));
    }

    #[test]
    fn slots_follow_material_indices() {
        let mesh = quad().with_material_indices(&[2, 0]);
        let buffers = VertexWelder::build(&mesh, None).unwrap();
        let slots: Vec<u32> = buffers.iter().map(|b| b.material_index).collect();
        assert_eq!(slots, [0, 2]);
        assert!(buffers.iter().all(|b| b.vertex_count() == 3 && b.triangle_count() == 1));
    }

    #[test]
    fn bone_table_is_shared_across_slots() {
        let armature = ArmatureData::new(vec![
            BoneDesc::at_rest("Root", None, Mat4::IDENTITY, 1.0),
            BoneDesc::at_rest("Tip", Some("Root"), Mat4::IDENTITY, 1.0),
        ]);
        let mesh = quad()
            .with_material_indices(&[0, 1])
            .with_vertex_group("Tip", &[(3, 1.0)])
            .with_vertex_group("Root", &[(0, 1.0), (1, 1.0)]);
        let buffers = VertexWelder::build(&mesh, Some(("Rig", &armature))).unwrap();

        let first = buffers[0].skin.as_ref().unwrap();
        let second = buffers[1].skin.as_ref().unwrap();
        assert_eq!(first.bone_ids, second.bone_ids);
        assert_eq!(first.bone_ids, ["Rig : Root", "Rig : Tip"]);
        // vertex 3 is the last corner of the second triangle
        assert_eq!(second.indices[2], [1, 0, 0, 0]);
    }
}

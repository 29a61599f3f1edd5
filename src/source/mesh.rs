use glam::{Vec2, Vec3};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Membership of a vertex in a vertex group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupWeight {
    /// Index into [`MeshData::vertex_groups`].
    pub group: u32,
    pub weight: f32,
}

/// Named per-corner UV layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    /// One UV per corner. An empty layer reads as zeros.
    pub uvs: Vec<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    /// Corner ids.
    pub corners: [u32; 3],
    #[serde(default)]
    pub material_index: u32,
}

/// Source face, used where faces matter rather than triangles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    pub corners: Vec<u32>,
    pub normal: Vec3,
}

/// Triangulated mesh with per-corner attributes.
///
/// Corners (face loops) reference vertices; normals and UVs are stored per
/// corner, positions and vertex-group memberships per vertex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub vertex_groups: Vec<String>,
    /// Group memberships per vertex.
    pub vertex_weights: Vec<Vec<GroupWeight>>,

    pub corner_vertices: Vec<u32>,
    pub corner_normals: Vec<Vec3>,
    pub uv_layers: Vec<UvLayer>,

    pub triangles: Vec<Triangle>,
    pub polygons: Vec<Polygon>,
    pub edges: Vec<[u32; 2]>,
}

impl MeshData {
    /// Builds a flat-shaded mesh where every triangle owns its three corners.
    /// Each triangle is also a polygon; edges are the unique triangle sides.
    #[must_use]
    pub fn from_triangles(positions: Vec<Vec3>, triangles: &[[u32; 3]]) -> Self {
        let mut mesh = Self {
            vertex_weights: vec![Vec::new(); positions.len()],
            positions,
            ..Default::default()
        };
        let mut edges = FxHashSet::default();

        for tri in triangles {
            let p = tri.map(|v| mesh.positions.get(v as usize).copied().unwrap_or(Vec3::ZERO));
            let normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
            let base = mesh.corner_vertices.len() as u32;
            let corners = [base, base + 1, base + 2];

            mesh.corner_vertices.extend_from_slice(tri);
            mesh.corner_normals.extend([normal; 3]);
            mesh.triangles.push(Triangle {
                corners,
                material_index: 0,
            });
            mesh.polygons.push(Polygon {
                corners: corners.to_vec(),
                normal,
            });

            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if edges.insert((a.min(b), a.max(b))) {
                    mesh.edges.push([a.min(b), a.max(b)]);
                }
            }
        }
        mesh
    }

    /// Point cloud without faces (fake lights, segment helpers).
    #[must_use]
    pub fn from_points(positions: Vec<Vec3>) -> Self {
        Self {
            vertex_weights: vec![Vec::new(); positions.len()],
            positions,
            ..Default::default()
        }
    }

    /// Adds a UV layer; `uvs` holds one entry per corner.
    #[must_use]
    pub fn with_uv_layer(mut self, name: impl Into<String>, uvs: Vec<Vec2>) -> Self {
        self.uv_layers.push(UvLayer {
            name: name.into(),
            uvs,
        });
        self
    }

    /// Adds a vertex group with `(vertex, weight)` memberships.
    #[must_use]
    pub fn with_vertex_group(mut self, name: impl Into<String>, members: &[(u32, f32)]) -> Self {
        let group = self.vertex_groups.len() as u32;
        self.vertex_groups.push(name.into());
        for &(vertex, weight) in members {
            if let Some(weights) = self.vertex_weights.get_mut(vertex as usize) {
                weights.push(GroupWeight { group, weight });
            }
        }
        self
    }

    /// Assigns material slot indices per triangle, in triangle order.
    #[must_use]
    pub fn with_material_indices(mut self, indices: &[u32]) -> Self {
        for (tri, &index) in self.triangles.iter_mut().zip(indices) {
            tri.material_index = index;
        }
        self
    }

    #[must_use]
    pub fn with_edges(mut self, edges: Vec<[u32; 2]>) -> Self {
        self.edges = edges;
        self
    }

    /// Vertex referenced by `corner`.
    #[inline]
    #[must_use]
    pub fn corner_vertex(&self, corner: u32) -> u32 {
        self.corner_vertices.get(corner as usize).copied().unwrap_or(0)
    }

    #[inline]
    #[must_use]
    pub fn position(&self, vertex: u32) -> Vec3 {
        self.positions.get(vertex as usize).copied().unwrap_or(Vec3::ZERO)
    }

    /// Group memberships of `vertex`.
    #[inline]
    #[must_use]
    pub fn weights(&self, vertex: u32) -> &[GroupWeight] {
        self.vertex_weights.get(vertex as usize).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn uv_layer(&self, name: &str) -> Option<&UvLayer> {
        self.uv_layers.iter().find(|l| l.name == name)
    }
}

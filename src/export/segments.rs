//! Collision geometry: line segments and shells.

use crate::errors::{ExportError, Result};
use crate::graph::{ExportGraph, ExportKey, ExportNode, NodeKind, SegmentsNode, ShellNode};
use crate::mesh::VertexWelder;
use crate::source::{MeshData, SceneObject};

/// One segment per mesh edge, in local space.
#[must_use]
pub fn build_segments(name: &str, mesh: &MeshData) -> SegmentsNode {
    SegmentsNode {
        name: name.to_string(),
        segments: mesh
            .edges
            .iter()
            .map(|&[a, b]| [mesh.position(a), mesh.position(b)])
            .collect(),
    }
}

/// Shell nodes of `mesh`, one per material slot, without normals or skin.
pub fn build_shells(name: &str, mesh: &MeshData) -> Result<Vec<ShellNode>> {
    Ok(VertexWelder::build(mesh, None)?
        .into_iter()
        .map(|buffer| ShellNode {
            name: name.to_string(),
            positions: buffer.positions,
            indices: buffer.indices,
        })
        .collect())
}

pub fn export_segments(graph: &mut ExportGraph, control: ExportKey, obj: &SceneObject) -> Result<usize> {
    let Some(mesh) = obj.data.geometry() else {
        return Ok(0);
    };
    let node = build_segments(&obj.name, mesh);
    let count = node.segments.len();
    graph.insert_child(control, ExportNode::new(obj.name.clone(), NodeKind::Segments(node)))?;
    Ok(count)
}

/// Emits the shells of `obj`. A shell driven by a skeleton is rejected.
/// Returns the triangle count.
pub fn export_shell(graph: &mut ExportGraph, control: ExportKey, obj: &SceneObject) -> Result<usize> {
    if obj.armature_modifier.is_some() {
        return Err(ExportError::ShellWithSkeleton {
            object: obj.name.clone(),
        });
    }
    let Some(mesh) = obj.data.geometry() else {
        return Ok(0);
    };

    let mut triangles = 0;
    for shell in build_shells(&obj.name, mesh)? {
        triangles += shell.indices.len() / 3;
        graph.insert_child(control, ExportNode::new(obj.name.clone(), NodeKind::Shell(shell)))?;
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn quad() -> MeshData {
        MeshData::from_triangles(vec![Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y], &[[0, 1, 2], [0, 2, 3]])
    }

    #[test]
    fn one_segment_per_edge() {
        let node = build_segments("Wire", &quad());
        assert_eq!(node.segments.len(), 5);
        assert_eq!(node.segments[0], [Vec3::ZERO, Vec3::X]);
    }

    #[test]
    fn skinned_shell_is_fatal() {
        let obj = SceneObject::mesh("Shell", quad()).with_armature_modifier("Rig");
        let mut graph = ExportGraph::new();
        let root = graph.insert(ExportNode::group("root"));
        let err = export_shell(&mut graph, root, &obj).unwrap_err();
        assert!(matches!(err, ExportError::ShellWithSkeleton { .. }));
        assert!(graph.children(root).is_empty());
    }

    #[test]
    fn shells_carry_positions_and_indices() {
        let obj = SceneObject::mesh("Shell", quad());
        let mut graph = ExportGraph::new();
        let root = graph.insert(ExportNode::group("root"));
        assert_eq!(export_shell(&mut graph, root, &obj).unwrap(), 2);
        assert_eq!(graph.children(root).len(), 1);
    }
}

//! Vertex Welding Tests
//!
//! Tests for:
//! - Corner deduplication (idempotence, shared face corners)
//! - Damage-argument splits
//! - Skin influences: limit, normalization, unweighted vertices

use glam::{Mat4, Vec3};

use scene_export::errors::ExportError;
use scene_export::mesh::VertexWelder;
use scene_export::source::{ArmatureData, BoneDesc, MeshData, Polygon, Triangle};

const EPSILON: f32 = 1e-6;

/// One quad face triangulated into two triangles that share corners 0 and 2.
fn shared_quad() -> MeshData {
    MeshData {
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
        vertex_weights: vec![Vec::new(); 4],
        corner_vertices: vec![0, 1, 2, 3],
        corner_normals: vec![Vec3::Z; 4],
        triangles: vec![
            Triangle {
                corners: [0, 1, 2],
                material_index: 0,
            },
            Triangle {
                corners: [0, 2, 3],
                material_index: 0,
            },
        ],
        polygons: vec![Polygon {
            corners: vec![0, 1, 2, 3],
            normal: Vec3::Z,
        }],
        ..Default::default()
    }
}

fn rig(names: &[&str]) -> ArmatureData {
    ArmatureData::new(
        names
            .iter()
            .map(|n| BoneDesc::at_rest(*n, None, Mat4::IDENTITY, 1.0))
            .collect(),
    )
}

// ============================================================================
// Deduplication
// ============================================================================

#[test]
fn shared_corners_are_welded() {
    let buffers = VertexWelder::build(&shared_quad(), None).unwrap();
    assert_eq!(buffers.len(), 1);
    assert_eq!(buffers[0].vertex_count(), 4);
    assert_eq!(buffers[0].indices, [0, 1, 2, 0, 2, 3]);
}

#[test]
fn welding_a_triangle_twice_adds_no_vertices() {
    let mesh = shared_quad();
    let mut welder = VertexWelder::new(&mesh, None);
    let mut buffer = welder.begin_slot(0);

    welder.weld_triangle(&mut buffer, &mesh.triangles[0]).unwrap();
    let once = buffer.vertex_count();
    welder.weld_triangle(&mut buffer, &mesh.triangles[0]).unwrap();

    assert_eq!(buffer.vertex_count(), once);
    assert_eq!(buffer.triangle_count(), 2);
}

#[test]
fn differing_damage_arguments_split_shared_corners() {
    // Corners 0 and 2 carry both tags; the first triangle resolves to 1,
    // the second to 2, so each shared point gets one extra vertex.
    let mesh = shared_quad()
        .with_vertex_group("DMG_1", &[(0, 1.0), (1, 1.0), (2, 1.0)])
        .with_vertex_group("DMG_2", &[(0, 1.0), (2, 1.0), (3, 1.0)]);
    let buffers = VertexWelder::build(&mesh, None).unwrap();
    let buffer = &buffers[0];

    assert_eq!(buffer.vertex_count(), 4 + 2);
    assert!(buffer.has_damage_groups);
    assert_eq!(&buffer.damage_arguments[..3], [1, 1, 1]);
    assert_eq!(&buffer.damage_arguments[3..], [2, 2, 2]);
}

#[test]
fn disagreeing_corners_fall_back_to_no_damage() {
    let mesh = shared_quad().with_vertex_group("DMG_4", &[(0, 1.0), (1, 1.0)]);
    let buffers = VertexWelder::build(&mesh, None).unwrap();
    assert!(buffers[0].damage_arguments.iter().all(|&a| a == -1));
    assert!(!buffers[0].has_damage_groups);
}

// ============================================================================
// Skin influences
// ============================================================================

#[test]
fn five_influences_are_fatal() {
    let names = ["A", "B", "C", "D", "E"];
    let armature = rig(&names);
    let mut mesh = shared_quad();
    for name in names {
        mesh = mesh.with_vertex_group(name, &[(1, 0.2)]);
    }

    let err = VertexWelder::build(&mesh, Some(("Rig", &armature))).unwrap_err();
    assert!(matches!(err, ExportError::TooManyInfluences { vertex: 1, count: 5 }));
    assert!(err.is_fatal());
}

#[test]
fn influences_are_normalized() {
    let armature = rig(&["A", "B", "C"]);
    let mesh = shared_quad()
        .with_vertex_group("A", &[(0, 0.5), (1, 2.0)])
        .with_vertex_group("B", &[(0, 0.25), (2, 0.3)])
        .with_vertex_group("C", &[(0, 0.25), (2, 0.1)]);
    let buffers = VertexWelder::build(&mesh, Some(("Rig", &armature))).unwrap();
    let skin = buffers[0].skin.as_ref().unwrap();

    for weights in &skin.weights {
        let sum: f32 = weights.iter().sum();
        if weights.iter().any(|&w| w > 0.0) {
            assert!((sum - 1.0).abs() < EPSILON, "weights {weights:?} sum to {sum}");
        }
    }
    assert_eq!(skin.bone_ids, ["Rig : A", "Rig : B", "Rig : C"]);
}

#[test]
fn unweighted_vertex_has_zero_influences() {
    let armature = rig(&["A"]);
    let mesh = shared_quad().with_vertex_group("A", &[(0, 1.0)]);
    let buffers = VertexWelder::build(&mesh, Some(("Rig", &armature))).unwrap();
    let skin = buffers[0].skin.as_ref().unwrap();

    // output vertex 1 is source vertex 1, which has no bone groups
    assert_eq!(skin.indices[1], [0; 4]);
    assert_eq!(skin.weights[1], [0.0; 4]);
    assert_eq!(skin.weights[0], [1.0, 0.0, 0.0, 0.0]);
}

#[test]
fn tiny_weights_do_not_count_as_influences() {
    let names = ["A", "B", "C", "D", "E"];
    let armature = rig(&names);
    let mut mesh = shared_quad();
    for (i, name) in names.into_iter().enumerate() {
        let weight = if i == 0 { 1.0e-4 } else { 0.25 };
        mesh = mesh.with_vertex_group(name, &[(1, weight)]);
    }
    assert!(VertexWelder::build(&mesh, Some(("Rig", &armature))).is_ok());
}

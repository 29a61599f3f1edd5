//! Scene Tree Tests
//!
//! Tests for:
//! - SceneObjectTree: parent links, single-parent invariant, visibility
//! - LOD folding: LodRoot / LodLevel layout and distance bookkeeping
//! - LOD validation failures
//! - Teardown

use scene_export::ExportLog;
use scene_export::errors::ExportError;
use scene_export::scene::{ObjectNodeKey, ObjectNodeKind, SceneObjectTree};
use scene_export::source::{GroupDesc, LayerDesc, ObjectId, SceneObject, SceneSnapshot};

fn hull_groups() -> GroupDesc {
    GroupDesc::default().with_child(
        GroupDesc::new("Hull")
            .with_child(GroupDesc::new("Hull_LOD_0_0"))
            .with_child(GroupDesc::new("Hull_LOD_1_50"))
            .with_child(GroupDesc::new("Hull_LOD_2_200")),
    )
}

/// `P` with one child per LOD level.
fn lod_snapshot() -> SceneSnapshot {
    SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("P"),
            SceneObject::empty("Hull_High").with_parent("P").in_group("Hull_LOD_0_0"),
            SceneObject::empty("Hull_Mid").with_parent("P").in_group("Hull_LOD_1_50"),
            SceneObject::empty("Hull_Low").with_parent("P").in_group("Hull_LOD_2_200"),
        ],
        vec![],
    )
    .with_groups(hull_groups(), LayerDesc::default())
}

fn assert_tree_invariants(scene: &SceneObjectTree) {
    for (key, node) in scene.tree().iter() {
        if let Some(parent) = node.parent() {
            let count = scene.children(parent).iter().filter(|&&c| c == key).count();
            assert_eq!(count, 1, "node must appear exactly once under its parent");
        }
        assert!(!scene.tree().is_ancestor(key, key), "node is its own ancestor");
    }
}

// ============================================================================
// Object tree
// ============================================================================

#[test]
fn objects_without_parent_hang_under_scene_root() {
    let snapshot = SceneSnapshot::from_objects(
        vec![SceneObject::empty("A"), SceneObject::empty("B"), SceneObject::empty("C").with_parent("A")],
        vec![],
    );
    let mut log = ExportLog::new();
    let scene = SceneObjectTree::build(&snapshot, &mut log).unwrap();

    assert_eq!(scene.node(scene.root()).unwrap().kind, ObjectNodeKind::SceneRoot);
    assert_eq!(scene.children(scene.root()).len(), 2);
    let a = scene.key_of(ObjectId(0)).unwrap();
    let c = scene.key_of(ObjectId(2)).unwrap();
    assert_eq!(scene.parent(c), Some(a));
    assert_tree_invariants(&scene);
}

#[test]
fn hidden_group_hides_its_objects() {
    let snapshot = SceneSnapshot::from_objects(vec![SceneObject::empty("Ghost").in_group("Hidden")], vec![])
        .with_groups(
            GroupDesc::default().with_child(GroupDesc::new("Hidden")),
            LayerDesc::default().with_child(LayerDesc::new("Hidden", false)),
        );
    let mut log = ExportLog::new();
    let scene = SceneObjectTree::build(&snapshot, &mut log).unwrap();

    assert!(!scene.is_visible(ObjectId(0)));
    let ghost = scene.key_of(ObjectId(0)).unwrap();
    assert!(!scene.node(ghost).unwrap().is_visible());
}

// ============================================================================
// LOD folding
// ============================================================================

#[test]
fn three_lod_levels_fold_under_one_lod_root() {
    let snapshot = lod_snapshot();
    let mut log = ExportLog::new();
    let scene = SceneObjectTree::build(&snapshot, &mut log).unwrap();
    assert_tree_invariants(&scene);

    let p = scene.key_of(ObjectId(0)).unwrap();
    let children = scene.children(p);
    assert_eq!(children.len(), 1, "originals must no longer hang under P");
    let lod_root = children[0];
    assert_eq!(scene.node(lod_root).unwrap().kind, ObjectNodeKind::LodRoot);

    let levels = scene.children(lod_root);
    assert_eq!(levels.len(), 3);
    let mut distances: Vec<f32> = levels
        .iter()
        .map(|&l| match scene.node(l).unwrap().kind {
            ObjectNodeKind::LodLevel { distance } => distance,
            other => panic!("expected a LOD level, got {other:?}"),
        })
        .collect();
    distances.sort_by(f32::total_cmp);
    assert_eq!(distances, [0.0, 50.0, 200.0]);

    for (i, &level) in levels.iter().enumerate() {
        let members: Vec<ObjectNodeKey> = scene.children(level).to_vec();
        assert_eq!(members.len(), 1, "level {i} holds one object");
    }
    assert!(log.errors().is_empty());
}

#[test]
fn object_in_two_lods_is_fatal() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("P"),
            SceneObject::empty("Both")
                .with_parent("P")
                .in_group("Hull_LOD_0_0")
                .in_group("Hull_LOD_1_50"),
        ],
        vec![],
    )
    .with_groups(hull_groups(), LayerDesc::default());
    let mut log = ExportLog::new();
    let err = SceneObjectTree::build(&snapshot, &mut log).unwrap_err();

    assert!(matches!(err, ExportError::MultipleLods { .. }));
    assert!(err.is_fatal());
    assert_eq!(log.errors().len(), 1);
}

#[test]
fn lod_level_items_with_different_parents_are_fatal() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("P"),
            SceneObject::empty("Q"),
            SceneObject::empty("Hull_Left").with_parent("P").in_group("Hull_LOD_0_0"),
            SceneObject::empty("Hull_Right").with_parent("Q").in_group("Hull_LOD_0_0"),
            SceneObject::empty("Hull_Mid").with_parent("P").in_group("Hull_LOD_1_50"),
            SceneObject::empty("Hull_Low").with_parent("P").in_group("Hull_LOD_2_200"),
        ],
        vec![],
    )
    .with_groups(hull_groups(), LayerDesc::default());
    let mut log = ExportLog::new();
    let err = SceneObjectTree::build(&snapshot, &mut log).unwrap_err();

    assert!(matches!(err, ExportError::LodItemParents { .. }));
    assert!(err.is_fatal());
}

#[test]
fn lod_levels_with_different_grandparents_are_fatal() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("Left"),
            SceneObject::empty("Right"),
            SceneObject::empty("L").with_parent("Left"),
            SceneObject::empty("R").with_parent("Right"),
            SceneObject::empty("Hull_High").with_parent("L").in_group("Hull_LOD_0_0"),
            SceneObject::empty("Hull_Low").with_parent("R").in_group("Hull_LOD_1_50"),
        ],
        vec![],
    )
    .with_groups(hull_groups(), LayerDesc::default());
    let mut log = ExportLog::new();
    let err = SceneObjectTree::build(&snapshot, &mut log).unwrap_err();
    assert!(matches!(err, ExportError::LodRootParents { .. }));
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn destroy_releases_every_node() {
    let snapshot = lod_snapshot();
    let mut log = ExportLog::new();
    let mut scene = SceneObjectTree::build(&snapshot, &mut log).unwrap();
    assert!(!scene.tree().is_empty());

    scene.destroy();
    assert!(scene.tree().is_empty());
    assert!(scene.key_of(ObjectId(0)).is_none());
}

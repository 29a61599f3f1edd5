//! Export Integration Tests
//!
//! Tests for:
//! - End-to-end export of a plain mesh hierarchy
//! - Writer gating: recorded errors, fatal errors, writer failures
//! - Skins: deferred binding, skin boxes, unresolved bones
//! - Bone-parented objects, LOD switches, model boxes, connectors, lights
//! - JSON model writer

use glam::{Mat4, Vec2, Vec3};

use scene_export::errors::ExportError;
use scene_export::export::{ExportGraphWalker, ExportPhase, JsonModelWriter, ModelWriter, export};
use scene_export::graph::{Block, BlockKind, ConnectorValue, ExportModel, NodeKind, RenderNode};
use scene_export::scene::SceneObjectTree;
use scene_export::source::{
    ArmatureData, BoneDesc, GroupDesc, LayerDesc, LightData, MaterialDesc, MaterialFamily, MaterialId, MeshData,
    ObjectData, SceneObject, SceneSnapshot, SpecialType, TextureSlot,
};
use scene_export::{ExportLog, ExportSettings};

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct RecordingWriter {
    written: Vec<(String, u32, usize)>,
    fail: Option<String>,
}

impl ModelWriter for RecordingWriter {
    fn serialize(&mut self, model: &ExportModel, path: &str, format_version: u32) -> Result<(), String> {
        if let Some(reason) = &self.fail {
            return Err(reason.clone());
        }
        self.written
            .push((path.to_string(), format_version, model.render_nodes().count()));
        Ok(())
    }
}

struct Walked {
    result: scene_export::Result<()>,
    phase: ExportPhase,
    model: ExportModel,
    log: ExportLog,
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn walk(snapshot: &SceneSnapshot) -> Walked {
    init_logger();
    let mut log = ExportLog::new();
    let scene = SceneObjectTree::build(snapshot, &mut log).unwrap();
    let mut walker = ExportGraphWalker::new(snapshot, &scene, &ExportSettings::default(), &mut log);
    let result = walker.run();
    let phase = walker.phase();
    let model = walker.into_model();
    Walked {
        result,
        phase,
        model,
        log,
    }
}

fn triangle() -> MeshData {
    MeshData::from_triangles(vec![Vec3::ZERO, Vec3::X, Vec3::Y], &[[0, 1, 2]])
        .with_uv_layer("UVMap", vec![Vec2::ZERO, Vec2::X, Vec2::Y])
}

fn albedo_material() -> MaterialDesc {
    MaterialDesc::new("wing", MaterialFamily::Default).with_texture(TextureSlot::Albedo, "wing.dds")
}

fn wing_snapshot() -> SceneSnapshot {
    SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("Wing"),
            SceneObject::mesh("Wing_Mesh", triangle())
                .with_parent("Wing")
                .with_material(MaterialId(0)),
        ],
        vec![albedo_material()],
    )
}

fn rig() -> SceneObject {
    SceneObject::new(
        "Rig",
        ObjectData::Armature(ArmatureData::new(vec![
            BoneDesc::at_rest("Root", None, Mat4::IDENTITY, 1.0),
            BoneDesc::at_rest("Tip", Some("Root"), Mat4::from_translation(Vec3::Y), 0.5),
        ])),
    )
}

fn skinned_body(parent: &str) -> SceneObject {
    let mesh = triangle()
        .with_vertex_group("Root", &[(0, 1.0), (1, 0.5)])
        .with_vertex_group("Tip", &[(1, 0.5), (2, 1.0)]);
    SceneObject::mesh("Body", mesh)
        .with_parent(parent)
        .with_armature_modifier("Rig")
        .with_material(MaterialId(0))
}

fn names(model: &ExportModel, kind: impl Fn(&NodeKind) -> bool) -> Vec<String> {
    model
        .find_all(|n| kind(&n.kind))
        .into_iter()
        .filter_map(|k| model.graph.value(k).map(|n| n.name.clone()))
        .collect()
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn wing_exports_one_render_node_with_base_block() {
    let walked = walk(&wing_snapshot());
    walked.result.unwrap();
    assert_eq!(walked.phase, ExportPhase::Done);

    let model = &walked.model;
    let renders = model.find_all(|n| matches!(n.kind, NodeKind::Render(_)));
    assert_eq!(renders.len(), 1);
    assert_eq!(model.path_of(renders[0]), ["", "_SceneRoot_", "Wing", "Wing_Mesh", "Wing_Mesh"]);

    let Some(RenderNode::Pbr(pbr)) = model.graph.value(renders[0]).and_then(|n| n.as_render()) else {
        panic!("expected a PBR render node");
    };
    let kinds: Vec<BlockKind> = pbr.blocks.iter().map(Block::kind).collect();
    assert_eq!(kinds, [BlockKind::Base]);
    assert!(!pbr.has_block(BlockKind::Bone));
    assert!(!pbr.has_block(BlockKind::Damage));
    assert!(!pbr.has_block(BlockKind::Emissive));
}

#[test]
fn export_hands_model_to_writer() {
    let mut writer = RecordingWriter::default();
    let settings = ExportSettings {
        format_version: 12,
        ..Default::default()
    };
    let report = export(&wing_snapshot(), &settings, &mut writer, "wing.edm").unwrap();

    assert_eq!(writer.written, [("wing.edm".to_string(), 12, 1)]);
    assert_eq!(report.stats.objects, 2);
    assert_eq!(report.stats.render_nodes, 1);
    assert_eq!(report.stats.triangles, 1);
    assert!(report.warnings.is_empty());
}

#[test]
fn root_transform_can_be_disabled() {
    let snapshot = wing_snapshot();
    let mut log = ExportLog::new();
    let scene = SceneObjectTree::build(&snapshot, &mut log).unwrap();
    let settings = ExportSettings {
        apply_root_transform: false,
        ..Default::default()
    };
    let mut walker = ExportGraphWalker::new(&snapshot, &scene, &settings, &mut log);
    walker.run().unwrap();
    let model = walker.into_model();
    let root = model.graph.value(model.root.unwrap()).unwrap();
    assert_eq!(root.kind, NodeKind::Group);
}

#[test]
fn hidden_parent_passes_its_export_parent_to_visible_children() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("Wing").in_group("Hidden"),
            SceneObject::mesh("Wing_Mesh", triangle())
                .with_parent("Wing")
                .with_material(MaterialId(0)),
        ],
        vec![albedo_material()],
    )
    .with_groups(
        GroupDesc::default().with_child(GroupDesc::new("Hidden")),
        LayerDesc::default().with_child(LayerDesc::new("Hidden", false)),
    );
    let walked = walk(&snapshot);
    walked.result.unwrap();

    let model = &walked.model;
    assert!(model.find_all(|n| n.name == "Wing").is_empty());
    let renders = model.find_all(|n| matches!(n.kind, NodeKind::Render(_)));
    assert_eq!(renders.len(), 1);
    assert_eq!(model.path_of(renders[0]), ["", "_SceneRoot_", "Wing_Mesh", "Wing_Mesh"]);
}

// ============================================================================
// Writer gating
// ============================================================================

#[test]
fn missing_material_is_recorded_and_blocks_writer() {
    let snapshot = SceneSnapshot::from_objects(
        vec![SceneObject::mesh("Bare", triangle()), SceneObject::empty("After")],
        vec![],
    );
    let walked = walk(&snapshot);
    walked.result.unwrap();
    assert_eq!(walked.log.errors().len(), 1);
    assert!(walked.model.find("After").is_some(), "traversal continues");

    let mut writer = RecordingWriter::default();
    let err = export(&snapshot, &ExportSettings::default(), &mut writer, "bare.edm").unwrap_err();
    assert!(matches!(err, ExportError::RecordedErrors(1)));
    assert!(writer.written.is_empty());
}

#[test]
fn fatal_error_fails_run_without_writing() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            rig(),
            SceneObject::mesh("Hull", triangle())
                .with_special(SpecialType::CollisionShell)
                .with_armature_modifier("Rig"),
        ],
        vec![],
    );
    let walked = walk(&snapshot);
    assert!(matches!(walked.result, Err(ExportError::ShellWithSkeleton { .. })));
    assert_eq!(walked.phase, ExportPhase::Failed);
    assert_eq!(walked.log.errors(), ["Obj: Hull | Shell Hull has bones."]);

    let mut writer = RecordingWriter::default();
    assert!(export(&snapshot, &ExportSettings::default(), &mut writer, "hull.edm").is_err());
    assert!(writer.written.is_empty());
}

#[test]
fn writer_failure_is_reported() {
    let mut writer = RecordingWriter {
        fail: Some("disk full".into()),
        ..Default::default()
    };
    let err = export(&wing_snapshot(), &ExportSettings::default(), &mut writer, "wing.edm").unwrap_err();
    let ExportError::WriteFailed { path, reason } = err else {
        panic!("expected a write failure, got {err}");
    };
    assert_eq!(path, "wing.edm");
    assert_eq!(reason, "disk full");
}

// ============================================================================
// Skins
// ============================================================================

#[test]
fn skinned_mesh_binds_after_walk() {
    let snapshot = SceneSnapshot::from_objects(vec![rig(), skinned_body("Rig")], vec![albedo_material()]);
    let walked = walk(&snapshot);
    walked.result.unwrap();
    let model = &walked.model;

    let renders = model.find_all(|n| matches!(n.kind, NodeKind::Render(_)));
    assert_eq!(renders.len(), 1);
    let control = model.graph.parent(renders[0]).unwrap();
    let control = model.graph.value(control).unwrap();
    assert_eq!(control.name, "Fake Control Bone Body");
    assert!(matches!(control.kind, NodeKind::Bone { .. }));

    let pbr = model.graph.value(renders[0]).unwrap().as_render().unwrap().as_pbr().unwrap();
    let bones = pbr.bone_block().unwrap();
    assert_eq!(bones.bone_names, ["Rig : Root", "Rig : Tip"]);
    assert!(bones.is_resolved());
    for &bone in &bones.bones {
        assert!(matches!(model.graph.value(bone).unwrap().kind, NodeKind::Bone { .. }));
    }
}

#[test]
fn hidden_armature_leaves_skin_unresolved() {
    let snapshot = SceneSnapshot::from_objects(
        vec![rig().in_group("Hidden"), skinned_body("Rig")],
        vec![albedo_material()],
    )
    .with_groups(
        GroupDesc::default().with_child(GroupDesc::new("Hidden")),
        LayerDesc::default().with_child(LayerDesc::new("Hidden", false)),
    );
    let walked = walk(&snapshot);
    assert!(matches!(walked.result, Err(ExportError::UnresolvedBone { .. })));
    assert_eq!(walked.phase, ExportPhase::Failed);
}

#[test]
fn skin_box_reaches_its_single_skinned_child() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            rig(),
            SceneObject::empty("SkinBox")
                .with_parent("Rig")
                .with_special(SpecialType::SkinBox),
            skinned_body("SkinBox"),
        ],
        vec![albedo_material()],
    );
    let walked = walk(&snapshot);
    walked.result.unwrap();
    let pbr = walked.model.render_nodes().next().unwrap().as_pbr().unwrap();
    assert!(pbr.bone_block().unwrap().skin_box.is_some());
    assert!(walked.model.bounding_box.is_none());
}

#[test]
fn skin_box_with_two_children_is_fatal() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("SkinBox").with_special(SpecialType::SkinBox),
            SceneObject::empty("A").with_parent("SkinBox"),
            SceneObject::empty("B").with_parent("SkinBox"),
        ],
        vec![],
    );
    let walked = walk(&snapshot);
    assert!(matches!(
        walked.result,
        Err(ExportError::SkinBoxChildren { count: 2, .. })
    ));
}

#[test]
fn bone_parented_object_starts_at_bone_tip() {
    let snapshot = SceneSnapshot::from_objects(
        vec![rig(), SceneObject::empty("Pod").with_parent("Rig").with_parent_bone("Tip")],
        vec![],
    );
    let walked = walk(&snapshot);
    walked.result.unwrap();
    let model = &walked.model;

    let pod = model.find("Pod").unwrap();
    let tip = model.graph.parent(pod).unwrap();
    let tip_node = model.graph.value(tip).unwrap();
    assert_eq!(tip_node.name, "End Of Rig : Tip");
    let NodeKind::Transform { matrix } = tip_node.kind else {
        panic!("expected the bone tip offset");
    };
    assert!(matrix.w_axis.truncate().abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-6));
    assert_eq!(model.graph.value(model.graph.parent(tip).unwrap()).unwrap().name, "Rig : Tip");
}

// ============================================================================
// LOD, markers, payloads
// ============================================================================

#[test]
fn lod_switch_sorts_levels_by_distance() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("P"),
            SceneObject::empty("Far").with_parent("P").in_group("Hull_LOD_2_200"),
            SceneObject::empty("Near").with_parent("P").in_group("Hull_LOD_0_0"),
            SceneObject::empty("Mid").with_parent("P").in_group("Hull_LOD_1_50"),
        ],
        vec![],
    )
    .with_groups(
        GroupDesc::default().with_child(
            GroupDesc::new("Hull")
                .with_child(GroupDesc::new("Hull_LOD_0_0"))
                .with_child(GroupDesc::new("Hull_LOD_1_50"))
                .with_child(GroupDesc::new("Hull_LOD_2_200")),
        ),
        LayerDesc::default(),
    );
    let walked = walk(&snapshot);
    walked.result.unwrap();
    let model = &walked.model;

    let lods = model.find_all(|n| matches!(n.kind, NodeKind::Lod { .. }));
    assert_eq!(lods.len(), 1);
    let NodeKind::Lod { levels } = &model.graph.value(lods[0]).unwrap().kind else {
        unreachable!();
    };
    assert_eq!(levels, &[0.0, 50.0, 200.0]);

    let first_level = model.graph.children(lods[0])[0];
    let near = model.graph.children(first_level)[0];
    assert_eq!(model.graph.value(near).unwrap().name, "Near");
}

#[test]
fn model_boxes_are_recorded_on_the_model() {
    let snapshot = SceneSnapshot::from_objects(
        vec![
            SceneObject::empty("BBox").with_special(SpecialType::BoundingBox),
            SceneObject::empty("UBox")
                .with_special(SpecialType::UserBox)
                .with_transform(Mat4::from_scale(Vec3::splat(2.0))),
        ],
        vec![],
    );
    let walked = walk(&snapshot);
    walked.result.unwrap();

    let bbox = walked.model.bounding_box.unwrap();
    assert!(bbox.min.abs_diff_eq(Vec3::splat(-1.0), 1e-5));
    assert!(bbox.max.abs_diff_eq(Vec3::splat(1.0), 1e-5));
    let ubox = walked.model.user_box.unwrap();
    assert!(ubox.max.abs_diff_eq(Vec3::splat(2.0), 1e-5));
    assert!(walked.model.light_box.is_none());
}

#[test]
fn connector_carries_parsed_properties() {
    let mut hook = SceneObject::empty("Hook").with_special(SpecialType::Connector);
    hook.props.connector_ext = "kind = \"tow\"; range = 4".into();
    let walked = walk(&SceneSnapshot::from_objects(vec![hook], vec![]));
    walked.result.unwrap();

    let connectors = walked
        .model
        .find_all(|n| matches!(n.kind, NodeKind::Connector(_)));
    let NodeKind::Connector(connector) = &walked.model.graph.value(connectors[0]).unwrap().kind else {
        unreachable!();
    };
    assert_eq!(
        connector.properties,
        [
            ("kind".to_string(), ConnectorValue::Text("tow".into())),
            ("range".to_string(), ConnectorValue::Float(4.0)),
        ]
    );
    assert_eq!(
        walked.model.path_of(connectors[0]),
        ["", "_SceneRoot_", "Hook", "Connector Transform", "Hook"]
    );
}

#[test]
fn light_without_custom_distance_warns() {
    let snapshot = SceneSnapshot::from_objects(
        vec![SceneObject::new("Lamp", ObjectData::Light(LightData::default()))],
        vec![],
    );
    let mut writer = RecordingWriter::default();
    let report = export(&snapshot, &ExportSettings::default(), &mut writer, "lamp.edm").unwrap();

    assert_eq!(report.stats.lights, 1);
    assert_eq!(report.warnings, ["Obj: Lamp | Lamp light has no custom distance set."]);
}

#[test]
fn fake_light_without_material_is_fatal() {
    let snapshot = SceneSnapshot::from_objects(
        vec![SceneObject::mesh("Flare", MeshData::from_points(vec![Vec3::ZERO])).with_special(SpecialType::FakeLight)],
        vec![],
    );
    let walked = walk(&snapshot);
    assert!(matches!(walked.result, Err(ExportError::MissingMaterial { .. })));
}

#[test]
fn collision_lines_and_segments() {
    let snapshot = SceneSnapshot::from_objects(
        vec![SceneObject::mesh("Wire", triangle()).with_special(SpecialType::CollisionLine)],
        vec![],
    );
    let walked = walk(&snapshot);
    walked.result.unwrap();
    assert_eq!(
        names(&walked.model, |k| matches!(k, NodeKind::Segments(_))),
        ["Wire"]
    );
}

// ============================================================================
// JSON writer
// ============================================================================

#[test]
fn json_writer_dumps_nested_graph() -> anyhow::Result<()> {
    init_logger();
    let path = std::env::temp_dir().join(format!("scene_export_{}.json", std::process::id()));
    let path = path.to_string_lossy().into_owned();

    let mut writer = JsonModelWriter::new();
    export(&wing_snapshot(), &ExportSettings::default(), &mut writer, &path)?;

    let text = std::fs::read_to_string(&path)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(json["format_version"], 10);
    assert_eq!(json["root"]["children"][0]["name"], "_SceneRoot_");
    assert_eq!(json["root"]["children"][0]["children"][0]["name"], "Wing");
    std::fs::remove_file(&path)?;
    Ok(())
}

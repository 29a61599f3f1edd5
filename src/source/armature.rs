use glam::Mat4;
use serde::{Deserialize, Serialize};

/// One bone of an armature, flat.
///
/// Both matrices are in armature space: `rest_matrix` is the bind pose,
/// `pose_matrix` the currently posed bone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDesc {
    pub name: String,
    /// Name of the parent bone in the pose hierarchy.
    #[serde(default)]
    pub parent: Option<String>,
    pub rest_matrix: Mat4,
    pub pose_matrix: Mat4,
    /// Head to tail length; children parented to the bone start at its tail.
    #[serde(default)]
    pub length: f32,
}

impl BoneDesc {
    /// Bone whose pose equals its rest matrix.
    #[must_use]
    pub fn at_rest(name: impl Into<String>, parent: Option<&str>, rest: Mat4, length: f32) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            rest_matrix: rest,
            pose_matrix: rest,
            length,
        }
    }
}

/// Flat bone list of an armature object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArmatureData {
    pub bones: Vec<BoneDesc>,
}

impl ArmatureData {
    #[must_use]
    pub fn new(bones: Vec<BoneDesc>) -> Self {
        Self { bones }
    }

    #[must_use]
    pub fn bone(&self, name: &str) -> Option<&BoneDesc> {
        self.bones.iter().find(|b| b.name == name)
    }

    #[must_use]
    pub fn has_bone(&self, name: &str) -> bool {
        self.bones.iter().any(|b| b.name == name)
    }
}

//! Object tree with synthetic root and LOD nodes.

use rustc_hash::FxHashMap;

use crate::animation::{ChannelScope, has_transform_anim};
use crate::diagnostics::ExportLog;
use crate::errors::{ExportError, Result};
use crate::scene::groups::SceneGroupTree;
use crate::source::{ObjectId, SceneSnapshot};
use crate::tree::Tree;

slotmap::new_key_type! {
    pub struct ObjectNodeKey;
}

pub const SCENE_ROOT_NAME: &str = "_SceneRoot_";
pub const DUMMY_NAME: &str = "_Dummy_";
pub const LOD_ROOT_NAME: &str = "_LodRoot_";
pub const LOD_LEVEL_NAME: &str = "_LodLeaf_";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectNodeKind {
    SceneRoot,
    /// Pass-through grouping node.
    Dummy,
    /// Switch over its [`LodLevel`](Self::LodLevel) children.
    LodRoot,
    LodLevel { distance: f32 },
    Object { id: ObjectId, visible: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub name: String,
    pub kind: ObjectNodeKind,
}

impl ObjectNode {
    #[must_use]
    pub fn synthetic(kind: ObjectNodeKind) -> Self {
        let name = match kind {
            ObjectNodeKind::SceneRoot => SCENE_ROOT_NAME,
            ObjectNodeKind::Dummy => DUMMY_NAME,
            ObjectNodeKind::LodRoot => LOD_ROOT_NAME,
            ObjectNodeKind::LodLevel { .. } => LOD_LEVEL_NAME,
            ObjectNodeKind::Object { .. } => "",
        };
        Self {
            name: name.to_string(),
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn object_id(&self) -> Option<ObjectId> {
        match self.kind {
            ObjectNodeKind::Object { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Synthetic nodes are always visible.
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        match self.kind {
            ObjectNodeKind::Object { visible, .. } => visible,
            _ => true,
        }
    }
}

/// Hierarchy the export traversal walks.
///
/// Objects hang under their recorded parent, or under the synthetic scene
/// root. LOD-tagged groups are folded into `LodRoot`/`LodLevel` nodes by
/// [`SceneObjectTree::build`].
#[derive(Debug)]
pub struct SceneObjectTree {
    pub(super) tree: Tree<ObjectNodeKey, ObjectNode>,
    pub(super) root: ObjectNodeKey,
    pub(super) objects: FxHashMap<ObjectId, ObjectNodeKey>,
    pub(super) groups: SceneGroupTree,
    pub(super) has_transform_anim: bool,
}

impl SceneObjectTree {
    /// Builds the object tree of `snapshot` and resolves its LOD layout.
    pub fn build(snapshot: &SceneSnapshot, log: &mut ExportLog) -> Result<Self> {
        let groups = SceneGroupTree::build(snapshot)?;

        let mut tree = Tree::new();
        let root = tree.insert(ObjectNode::synthetic(ObjectNodeKind::SceneRoot));

        let mut objects = FxHashMap::default();
        let mut by_name: FxHashMap<&str, ObjectNodeKey> = FxHashMap::default();
        for (id, obj) in snapshot.objects() {
            let visible = obj.groups.iter().any(|g| groups.is_visible(g));
            let key = tree.insert(ObjectNode {
                name: obj.name.clone(),
                kind: ObjectNodeKind::Object { id, visible },
            });
            objects.insert(id, key);
            by_name.insert(obj.name.as_str(), key);
        }

        for (id, obj) in snapshot.objects() {
            let parent = match obj.parent.as_deref() {
                Some(name) => *by_name.get(name).ok_or_else(|| ExportError::UnresolvedReference {
                    what: "parent",
                    name: name.to_string(),
                })?,
                None => root,
            };
            if let Some(&key) = objects.get(&id) {
                tree.add_child(parent, key)?;
            }
        }

        let mut scene = Self {
            tree,
            root,
            objects,
            groups,
            has_transform_anim: false,
        };
        scene.resolve_lods(snapshot, log)?;

        log::debug!("object tree built with {} nodes", scene.tree.len());
        Ok(scene)
    }

    /// Sets the animation flag when `id` carries a transform animation.
    pub(super) fn note_transform_anim(&mut self, snapshot: &SceneSnapshot, id: ObjectId) {
        let animated = snapshot
            .object(id)
            .and_then(|o| has_transform_anim(o.animation.as_ref(), ChannelScope::Object, None))
            .is_some();
        self.has_transform_anim |= animated;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn root(&self) -> ObjectNodeKey {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn tree(&self) -> &Tree<ObjectNodeKey, ObjectNode> {
        &self.tree
    }

    #[inline]
    #[must_use]
    pub fn groups(&self) -> &SceneGroupTree {
        &self.groups
    }

    #[inline]
    #[must_use]
    pub fn node(&self, key: ObjectNodeKey) -> Option<&ObjectNode> {
        self.tree.value(key)
    }

    #[inline]
    #[must_use]
    pub fn children(&self, key: ObjectNodeKey) -> &[ObjectNodeKey] {
        self.tree.children(key)
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, key: ObjectNodeKey) -> Option<ObjectNodeKey> {
        self.tree.parent(key)
    }

    #[inline]
    #[must_use]
    pub fn key_of(&self, id: ObjectId) -> Option<ObjectNodeKey> {
        self.objects.get(&id).copied()
    }

    #[must_use]
    pub fn is_visible(&self, id: ObjectId) -> bool {
        self.key_of(id)
            .and_then(|k| self.node(k))
            .is_some_and(ObjectNode::is_visible)
    }

    /// Whether a visible LOD member carries a transform animation.
    #[inline]
    #[must_use]
    pub fn has_transform_anim(&self) -> bool {
        self.has_transform_anim
    }

    /// Keys matching `kind`, depth-first from the root.
    #[must_use]
    pub fn find_kind(&self, mut pred: impl FnMut(&ObjectNodeKind) -> bool) -> Vec<ObjectNodeKey> {
        self.tree
            .depth_first(self.root)
            .into_iter()
            .filter(|&k| self.node(k).is_some_and(|n| pred(&n.kind)))
            .collect()
    }

    #[must_use]
    pub fn dump_dot(&self) -> String {
        self.tree.dump_dot(self.root, |n| n.name.clone())
    }

    /// Tears the object tree and the group tree down.
    pub fn destroy(&mut self) {
        let released = self.tree.destroy(self.root);
        self.tree.clear();
        self.objects.clear();
        self.groups.destroy();
        log::debug!("object tree released {released} nodes");
    }
}

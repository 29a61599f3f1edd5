//! Group hierarchy with LOD tags and view-layer visibility.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::naming::{LodMarker, parse_lod_marker};
use crate::source::{GroupDesc, LayerDesc, SceneSnapshot};
use crate::tree::Tree;

slotmap::new_key_type! {
    pub struct GroupKey;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneGroup {
    pub name: String,
    /// Cleared when the view layer hides the group.
    pub visible: bool,
    /// Set on LOD-leaf groups.
    pub lod: Option<LodMarker>,
}

impl SceneGroup {
    #[inline]
    #[must_use]
    pub fn is_lod_leaf(&self) -> bool {
        self.lod.is_some()
    }
}

/// Mirror of the authoring group nesting.
#[derive(Debug, Default)]
pub struct SceneGroupTree {
    tree: Tree<GroupKey, SceneGroup>,
    root: Option<GroupKey>,
    by_name: FxHashMap<String, GroupKey>,
}

impl SceneGroupTree {
    /// Builds the tree from the snapshot's root group, then applies the view
    /// layer. Groups the layer never mentions stay visible.
    pub fn build(snapshot: &SceneSnapshot) -> Result<Self> {
        let mut groups = Self::default();
        let root = groups.tree.insert(SceneGroup {
            name: snapshot.root_group.name.clone(),
            visible: true,
            lod: None,
        });
        groups.by_name.insert(snapshot.root_group.name.clone(), root);
        groups.root = Some(root);

        for child in &snapshot.root_group.children {
            groups.add_group(child, root)?;
        }
        groups.apply_layer(&snapshot.view_layer);

        Ok(groups)
    }

    fn add_group(&mut self, desc: &GroupDesc, parent: GroupKey) -> Result<()> {
        let key = self.tree.insert_child(
            parent,
            SceneGroup {
                name: desc.name.clone(),
                visible: true,
                lod: parse_lod_marker(&desc.name),
            },
        )?;
        self.by_name.insert(desc.name.clone(), key);
        for child in &desc.children {
            self.add_group(child, key)?;
        }
        Ok(())
    }

    fn apply_layer(&mut self, layer: &LayerDesc) {
        if !layer.visible
            && let Some(group) = self
                .by_name
                .get(&layer.group)
                .and_then(|&k| self.tree.value_mut(k))
        {
            group.visible = false;
        }
        for child in &layer.children {
            self.apply_layer(child);
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn root(&self) -> Option<GroupKey> {
        self.root
    }

    #[must_use]
    pub fn tree(&self) -> &Tree<GroupKey, SceneGroup> {
        &self.tree
    }

    #[must_use]
    pub fn key(&self, name: &str) -> Option<GroupKey> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&SceneGroup> {
        self.key(name).and_then(|k| self.tree.value(k))
    }

    /// Visibility of a group; unknown groups are not visible.
    #[must_use]
    pub fn is_visible(&self, name: &str) -> bool {
        self.group(name).is_some_and(|g| g.visible)
    }

    #[must_use]
    pub fn lod_of(&self, name: &str) -> Option<LodMarker> {
        self.group(name).and_then(|g| g.lod)
    }

    #[must_use]
    pub fn parent_name(&self, name: &str) -> Option<&str> {
        let parent = self.tree.parent(self.key(name)?)?;
        self.tree.value(parent).map(|g| g.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    #[must_use]
    pub fn dump_dot(&self) -> String {
        self.root
            .map(|root| self.tree.dump_dot(root, |g| g.name.clone()))
            .unwrap_or_default()
    }

    /// Tears the tree down.
    pub fn destroy(&mut self) {
        if let Some(root) = self.root.take() {
            self.tree.destroy(root);
        }
        self.tree.clear();
        self.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SceneSnapshot {
        SceneSnapshot::default().with_groups(
            GroupDesc::default().with_child(
                GroupDesc::new("Hull")
                    .with_child(GroupDesc::new("Hull_LOD_0_0"))
                    .with_child(GroupDesc::new("Hull_LOD_1_50")),
            ),
            LayerDesc::default().with_child(
                LayerDesc::new("Hull", true).with_child(LayerDesc::new("Hull_LOD_1_50", false)),
            ),
        )
    }

    #[test]
    fn lod_leaves_are_tagged() {
        let groups = SceneGroupTree::build(&snapshot()).unwrap();
        assert_eq!(groups.len(), 4);
        assert_eq!(groups.lod_of("Hull_LOD_1_50").map(|l| l.distance), Some(50.0));
        assert!(groups.lod_of("Hull").is_none());
        assert_eq!(groups.parent_name("Hull_LOD_0_0"), Some("Hull"));
    }

    #[test]
    fn layer_hides_groups() {
        let groups = SceneGroupTree::build(&snapshot()).unwrap();
        assert!(groups.is_visible("Hull"));
        assert!(groups.is_visible("Hull_LOD_0_0"));
        assert!(!groups.is_visible("Hull_LOD_1_50"));
        assert!(!groups.is_visible("Missing"));
    }
}

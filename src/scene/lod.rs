//! LOD folding.
//!
//! Objects linked into a LOD-leaf group (`<name>_LOD_<index>_<distance>`)
//! form one level; sibling leaf groups under the same parent group form one
//! family. Each family becomes
//!
//! ```text
//! P
//! └─ _LodRoot_
//!     ├─ _LodLeaf_ (distance a)
//!     │   └─ level roots ...
//!     └─ _LodLeaf_ (distance b)
//!         └─ level roots ...
//! ```
//!
//! where a level's roots are its members not below another member of the
//! same level.

use crate::diagnostics::ExportLog;
use crate::errors::{ExportError, Result};
use crate::scene::objects::{ObjectNode, ObjectNodeKey, ObjectNodeKind, SceneObjectTree};
use crate::source::SceneSnapshot;

/// Members of one LOD-leaf group.
#[derive(Debug)]
struct LodLevel {
    group: String,
    distance: f32,
    members: Vec<ObjectNodeKey>,
}

/// Leaf groups sharing one parent group.
#[derive(Debug)]
struct LodFamily {
    parent_group: String,
    levels: Vec<LodLevel>,
}

impl SceneObjectTree {
    /// Folds LOD-tagged groups into `LodRoot`/`LodLevel` nodes.
    pub(super) fn resolve_lods(&mut self, snapshot: &SceneSnapshot, log: &mut ExportLog) -> Result<()> {
        let families = self.collect_families(snapshot, log)?;
        for family in families {
            self.fold_family(family, log)?;
        }
        Ok(())
    }

    fn collect_families(&mut self, snapshot: &SceneSnapshot, log: &mut ExportLog) -> Result<Vec<LodFamily>> {
        let mut families: Vec<LodFamily> = Vec::new();

        for (id, obj) in snapshot.objects() {
            if !self.is_visible(id) {
                continue;
            }
            self.note_transform_anim(snapshot, id);

            let Some(key) = self.key_of(id) else {
                continue;
            };
            let mut lod_groups = obj
                .groups
                .iter()
                .filter_map(|g| self.groups.lod_of(g).map(|marker| (g, marker)));
            let Some((group, marker)) = lod_groups.next() else {
                continue;
            };
            if lod_groups.next().is_some() {
                return Err(log.fatal(ExportError::MultipleLods {
                    object: obj.name.clone(),
                }));
            }

            let parent_group = self.groups.parent_name(group).unwrap_or_default().to_string();
            let family = match families.iter().position(|f| f.parent_group == parent_group) {
                Some(i) => &mut families[i],
                None => {
                    families.push(LodFamily {
                        parent_group,
                        levels: Vec::new(),
                    });
                    let last = families.len() - 1;
                    &mut families[last]
                }
            };
            match family.levels.iter_mut().find(|l| l.group == *group) {
                Some(level) => level.members.push(key),
                None => family.levels.push(LodLevel {
                    group: group.clone(),
                    distance: marker.distance,
                    members: vec![key],
                }),
            }
        }

        Ok(families)
    }

    /// Members of `level` not below another member.
    fn level_roots(&self, level: &LodLevel, log: &mut ExportLog) -> Result<Vec<ObjectNodeKey>> {
        let roots: Vec<ObjectNodeKey> = level
            .members
            .iter()
            .copied()
            .filter(|&m| !level.members.iter().any(|&o| o != m && self.tree.is_ancestor(o, m)))
            .collect();

        for &member in &level.members {
            let covered = roots
                .iter()
                .any(|&r| r == member || self.tree.is_ancestor(r, member));
            if !covered {
                return Err(log.fatal(ExportError::NotInLod {
                    object: self.name_of(member),
                    level: level.group.clone(),
                }));
            }
        }
        if roots.is_empty() {
            return Err(log.fatal(ExportError::EmptyLod {
                level: level.group.clone(),
            }));
        }
        Ok(roots)
    }

    fn fold_family(&mut self, family: LodFamily, log: &mut ExportLog) -> Result<()> {
        log::debug!(
            "folding lod family under group {} with {} levels",
            family.parent_group,
            family.levels.len()
        );

        let mut level_parents: Vec<ObjectNodeKey> = Vec::with_capacity(family.levels.len());
        let mut grandparent: Option<Option<ObjectNodeKey>> = None;
        let mut level_nodes = Vec::with_capacity(family.levels.len());

        for level in &family.levels {
            let roots = self.level_roots(level, log)?;

            let parent = self.parent(roots[0]).unwrap_or(self.root);
            if let Some(&other) = roots.iter().find(|&&r| self.parent(r).unwrap_or(self.root) != parent) {
                return Err(log.fatal(ExportError::LodItemParents {
                    expected: self.name_of(parent),
                    found: self.name_of(self.parent(other).unwrap_or(self.root)),
                }));
            }

            let this_grandparent = self.parent(parent);
            match grandparent {
                Some(expected) if expected != this_grandparent => {
                    return Err(log.fatal(ExportError::LodRootParents {
                        expected: self.name_of_opt(expected),
                        found: self.name_of_opt(this_grandparent),
                    }));
                }
                _ => grandparent = Some(this_grandparent),
            }

            self.tree.remove_children(parent, &roots)?;
            let node = self.tree.insert_child(
                parent,
                ObjectNode::synthetic(ObjectNodeKind::LodLevel {
                    distance: level.distance,
                }),
            )?;
            self.tree.add_children(node, &roots)?;

            level_parents.push(parent);
            level_nodes.push(node);
        }

        let Some(&first_parent) = level_parents.first() else {
            return Ok(());
        };
        let anchor = if level_parents.iter().all(|&p| p == first_parent) {
            first_parent
        } else {
            grandparent.flatten().unwrap_or(self.root)
        };

        let lod_root = self
            .tree
            .insert_child(anchor, ObjectNode::synthetic(ObjectNodeKind::LodRoot))?;
        self.tree.add_children(lod_root, &level_nodes)?;
        Ok(())
    }

    fn name_of(&self, key: ObjectNodeKey) -> String {
        self.node(key).map(|n| n.name.clone()).unwrap_or_default()
    }

    fn name_of_opt(&self, key: Option<ObjectNodeKey>) -> String {
        key.map_or_else(|| "None".to_string(), |k| self.name_of(k))
    }
}

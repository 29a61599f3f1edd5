//! Arena Tree
//!
//! [`Tree`] is the ownership tree shared by the group tree, the object tree,
//! the bone forest and the export graph.
//!
//! # Overview
//!
//! Nodes live in a [`SlotMap`]; a node owns the ordered list of its children
//! and keeps a non-owning key back to its parent. Keys are generational, so a
//! key that outlives [`Tree::destroy`] simply stops resolving.
//!
//! # Invariants
//!
//! - a node has at most one parent;
//! - a node appears exactly once in its parent's child list;
//! - no node is its own ancestor.
//!
//! Every mutating operation keeps these invariants or fails with a
//! [`TreeError`] without touching the tree.

use std::fmt::Write as _;

use slotmap::{Key, SlotMap};
use thiserror::Error;

/// Structural failures of [`Tree`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("tree node does not exist")]
    MissingNode,
    #[error("node is already a child of this parent")]
    DuplicateChild,
    #[error("linking would create a cycle")]
    Cycle,
    #[error("node is not a child of this parent")]
    NotAChild,
}

/// One node of a [`Tree`].
#[derive(Debug, Clone)]
pub struct TreeNode<K: Key, T> {
    parent: Option<K>,
    children: Vec<K>,
    pub value: T,
}

impl<K: Key, T> TreeNode<K, T> {
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<K> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[K] {
        &self.children
    }
}

/// Arena-backed ownership tree keyed by `K`.
#[derive(Debug, Clone)]
pub struct Tree<K: Key, T> {
    nodes: SlotMap<K, TreeNode<K, T>>,
}

impl<K: Key, T> Default for Tree<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, T> Tree<K, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
        }
    }

    /// Inserts a detached node.
    pub fn insert(&mut self, value: T) -> K {
        self.nodes.insert(TreeNode {
            parent: None,
            children: Vec::new(),
            value,
        })
    }

    /// Inserts a node directly under `parent`.
    pub fn insert_child(&mut self, parent: K, value: T) -> Result<K, TreeError> {
        if !self.nodes.contains_key(parent) {
            return Err(TreeError::MissingNode);
        }
        let key = self.insert(value);
        self.nodes[parent].children.push(key);
        self.nodes[key].parent = Some(parent);
        Ok(key)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.nodes.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: K) -> Option<&TreeNode<K, T>> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut TreeNode<K, T>> {
        self.nodes.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub fn value(&self, key: K) -> Option<&T> {
        self.nodes.get(key).map(|n| &n.value)
    }

    #[inline]
    pub fn value_mut(&mut self, key: K) -> Option<&mut T> {
        self.nodes.get_mut(key).map(|n| &mut n.value)
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, key: K) -> Option<K> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    /// Children of `key`, empty for a missing node.
    #[inline]
    #[must_use]
    pub fn children(&self, key: K) -> &[K] {
        self.nodes.get(key).map_or(&[], |n| n.children.as_slice())
    }

    /// Iterates `(key, node)` pairs in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &TreeNode<K, T>)> {
        self.nodes.iter()
    }

    /// First child of `parent` whose value satisfies `pred`.
    pub fn child_by(&self, parent: K, mut pred: impl FnMut(&T) -> bool) -> Option<K> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.value(c).is_some_and(&mut pred))
    }

    /// Parent chain of `key`, nearest first.
    pub fn ancestors(&self, key: K) -> impl Iterator<Item = K> + '_ {
        std::iter::successors(self.parent(key), move |&k| self.parent(k))
    }

    /// Whether `ancestor` lies strictly above `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: K, node: K) -> bool {
        self.ancestors(node).any(|k| k == ancestor)
    }

    /// Pre-order keys of the subtree rooted at `root`.
    #[must_use]
    pub fn depth_first(&self, root: K) -> Vec<K> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        out
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Appends `child` to `parent`, moving it away from a previous parent.
    pub fn add_child(&mut self, parent: K, child: K) -> Result<(), TreeError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(TreeError::MissingNode);
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle);
        }
        if self.nodes[parent].children.contains(&child) {
            return Err(TreeError::DuplicateChild);
        }

        if let Some(old) = self.nodes[child].parent {
            self.nodes[old].children.retain(|&c| c != child);
        }
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    pub fn add_children(&mut self, parent: K, children: &[K]) -> Result<(), TreeError> {
        for &child in children {
            self.add_child(parent, child)?;
        }
        Ok(())
    }

    /// Unlinks `child` from `parent`. The child stays in the arena, detached.
    pub fn remove_child(&mut self, parent: K, child: K) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(parent).ok_or(TreeError::MissingNode)?;
        let pos = node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(TreeError::NotAChild)?;
        node.children.remove(pos);
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        Ok(())
    }

    pub fn remove_children(&mut self, parent: K, children: &[K]) -> Result<(), TreeError> {
        for &child in children {
            self.remove_child(parent, child)?;
        }
        Ok(())
    }

    /// Unlinks `key` from its parent, if any.
    pub fn detach(&mut self, key: K) {
        if let Some(parent) = self.parent(key) {
            let removed = self.remove_child(parent, key);
            debug_assert!(removed.is_ok(), "parent link without child entry");
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Unlinks every descendant of `root` bottom-up, then releases the whole
    /// subtree. Returns the number of released nodes.
    pub fn destroy(&mut self, root: K) -> usize {
        let order = self.depth_first(root);
        self.detach(root);
        for &key in order.iter().rev() {
            if let Some(node) = self.nodes.get_mut(key) {
                node.children.clear();
                node.parent = None;
            }
        }
        order
            .into_iter()
            .filter(|&key| self.nodes.remove(key).is_some())
            .count()
    }

    /// Releases every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Graphviz dump of the subtree rooted at `root`.
    pub fn dump_dot(&self, root: K, label: impl Fn(&T) -> String) -> String {
        let mut out = String::from("graph {\n");
        for key in self.depth_first(root) {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            let name = label(&node.value);
            match node.parent.and_then(|p| self.value(p)) {
                Some(parent) if key != root => {
                    let _ = writeln!(out, "\t\"{}\" -- \"{name}\"", label(parent));
                }
                _ => {
                    let _ = writeln!(out, "\tROOT -- \"{name}\"");
                }
            }
        }
        out.push('}');
        out
    }
}

//! Per-run material memo.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::source::{Action, MaterialDesc, MaterialFamily, MaterialId, SceneSnapshot, TextureRef, TextureSlot};

/// Resolved view of one material.
#[derive(Debug)]
pub struct MaterialWrap<'a> {
    pub id: MaterialId,
    pub desc: &'a MaterialDesc,
    textures: FxHashMap<TextureSlot, &'a TextureRef>,
}

impl<'a> MaterialWrap<'a> {
    /// Indexes the textures of `desc`. Textures without an image name are
    /// treated as unbound.
    #[must_use]
    pub fn new(id: MaterialId, desc: &'a MaterialDesc) -> Self {
        let mut textures = FxHashMap::default();
        for tex in &desc.textures {
            if tex.name.is_empty() {
                log::debug!("material {}: {} slot has no image", desc.name, tex.slot.key());
                continue;
            }
            textures.entry(tex.slot).or_insert(tex);
        }
        Self { id, desc, textures }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.desc.name
    }

    #[inline]
    #[must_use]
    pub fn family(&self) -> MaterialFamily {
        self.desc.family
    }

    #[inline]
    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<&'a TextureRef> {
        self.textures.get(&slot).copied()
    }

    #[inline]
    #[must_use]
    pub fn has_texture(&self, slot: TextureSlot) -> bool {
        self.textures.contains_key(&slot)
    }

    /// Node-tree action of the material.
    #[inline]
    #[must_use]
    pub fn action(&self) -> Option<&'a Action> {
        self.desc.animation.as_ref()
    }
}

/// Lazily resolved materials, keyed by id.
///
/// An id that does not resolve is remembered as `None`.
#[derive(Debug)]
pub struct MaterialCache<'a> {
    materials: &'a [MaterialDesc],
    entries: FxHashMap<MaterialId, Option<Rc<MaterialWrap<'a>>>>,
}

impl<'a> MaterialCache<'a> {
    #[must_use]
    pub fn new(snapshot: &'a SceneSnapshot) -> Self {
        Self {
            materials: &snapshot.materials,
            entries: FxHashMap::default(),
        }
    }

    pub fn get(&mut self, id: MaterialId) -> Option<Rc<MaterialWrap<'a>>> {
        let materials = self.materials;
        self.entries
            .entry(id)
            .or_insert_with(|| {
                materials
                    .get(id.0 as usize)
                    .map(|desc| Rc::new(MaterialWrap::new(id, desc)))
            })
            .clone()
    }

    /// Material of slot `slot` of an object's slot list.
    pub fn slot(&mut self, slots: &[Option<MaterialId>], slot: u32) -> Option<Rc<MaterialWrap<'a>>> {
        let id = slots.get(slot as usize).copied().flatten()?;
        self.get(id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

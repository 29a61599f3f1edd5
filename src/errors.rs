//! Error Types
//!
//! This module defines the error types used throughout the exporter.
//!
//! # Overview
//!
//! The main error type [`ExportError`] covers every failure of an export run:
//! - Validation failures (ambiguous LOD layout, over-influenced skin vertices,
//!   unresolved skin bones, malformed connector expressions, ...). These are
//!   always fatal and abort the traversal.
//! - Reference failures (an object without a usable material). These are
//!   recorded and the run continues, but it finishes as failed.
//! - Input failures (a snapshot that references objects, groups or materials
//!   it does not contain).
//! - Writer failures reported by the [`ModelWriter`](crate::export::ModelWriter).
//!
//! # Usage
//!
//! Fallible APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, ExportError>`.
//!
//! ```rust,ignore
//! use scene_export::errors::{ExportError, Result};
//!
//! fn check_decal(id: i32) -> Result<()> {
//!     if !(0..=8).contains(&id) {
//!         return Err(ExportError::DecalIdOutOfRange { material: "hull".into(), id });
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::tree::TreeError;

/// Broad class of an [`ExportError`], used by the log to decide whether a
/// failure aborts the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Always fatal; the writer is never invoked.
    Validation,
    /// Recoverable; the offending output is skipped and the run fails at the end.
    Reference,
    /// The snapshot itself is inconsistent or unreadable.
    Input,
    /// The model writer refused the assembled model.
    Writer,
}

/// The main error type for the exporter.
#[derive(Error, Debug)]
pub enum ExportError {
    // ========================================================================
    // LOD Layout Errors
    // ========================================================================
    /// An object belongs to more than one LOD-leaf group.
    #[error("Object {object} is in multiple lods.")]
    MultipleLods { object: String },

    /// A LOD level member is neither a level root nor below one.
    #[error("Object {object} doesn't belong to lod {level}.")]
    NotInLod { object: String, level: String },

    /// The roots of one LOD level hang under different tree parents.
    #[error("Multiple parents of lod items. Expected {expected} got {found}.")]
    LodItemParents { expected: String, found: String },

    /// The levels of one LOD family hang under different grandparents.
    #[error("Multiple parents of lod root. Expected {expected} got {found}.")]
    LodRootParents { expected: String, found: String },

    /// A LOD level resolved to no roots at all.
    #[error("Lod item {level} is empty.")]
    EmptyLod { level: String },

    // ========================================================================
    // Geometry & Skinning Errors
    // ========================================================================
    /// A vertex is influenced by more bones than a skin slot can hold.
    #[error("Skin vertex {vertex} has more than 4 influencing bones ({count}).")]
    TooManyInfluences { vertex: u32, count: usize },

    /// A skinned render node names a bone the active skeleton does not have.
    #[error("Bone '{bone}' doesn't exist, please remove vertex group with the same name.")]
    UnresolvedBone { bone: String },

    /// A collision shell carries a skeleton modifier.
    #[error("Shell {object} has bones.")]
    ShellWithSkeleton { object: String },

    /// A skin-box marker may capture only a single descendant.
    #[error("SKIN_BOX can not have more then one child, but {object} has {count} children.")]
    SkinBoxChildren { object: String, count: usize },

    // ========================================================================
    // Marker & Material Validation Errors
    // ========================================================================
    /// The per-object connector key/value expression could not be parsed.
    #[error("Connector {object} has invalid format: {reason}")]
    MalformedConnector { object: String, reason: String },

    /// Decal ids must stay inside the renderer's decal table.
    #[error("{material} material has wrong value {id}. Decal id must be in 0 to 8 range.")]
    DecalIdOutOfRange { material: String, id: i32 },

    /// The emissive texture and its alpha mask must come from one image.
    #[error(
        "Emissive texture has different alpha source on material {material}. Emissive texure is {emissive} and alpha mask is {mask}"
    )]
    EmissiveMaskMismatch { material: String, emissive: String, mask: String },

    /// A surface-mode fake light mesh has an unusable UV layout.
    #[error("Fake light {object}: {reason}")]
    FakeLightUvLayout { object: String, reason: String },

    /// A mesh or fake light has no usable material.
    #[error("{object} has no material.")]
    MissingMaterial { object: String },

    // ========================================================================
    // Input Errors
    // ========================================================================
    /// A name or id in the snapshot does not resolve.
    #[error("Unresolved {what} reference: {name}")]
    UnresolvedReference { what: &'static str, name: String },

    /// A tree link was rejected (cycle, duplicate child, stale key).
    #[error("Tree structure error: {0}")]
    Tree(#[from] TreeError),

    /// The snapshot or the settings could not be decoded.
    #[error("Invalid snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    // ========================================================================
    // Writer Errors
    // ========================================================================
    /// The model writer reported a failure.
    #[error("Can't save model {path}. Reason: {reason}")]
    WriteFailed { path: String, reason: String },

    /// The run recorded errors, so the model was never handed to the writer.
    #[error("Export failed with {0} recorded error(s).")]
    RecordedErrors(usize),
}

impl ExportError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingMaterial { .. } => ErrorKind::Reference,
            Self::UnresolvedReference { .. } | Self::Tree(_) | Self::Decode(_) => ErrorKind::Input,
            Self::WriteFailed { .. } | Self::RecordedErrors(_) => ErrorKind::Writer,
            _ => ErrorKind::Validation,
        }
    }

    /// Whether this error aborts the traversal.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Reference
    }
}

/// Alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;

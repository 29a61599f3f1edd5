#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod diagnostics;
pub mod settings;
pub mod tree;
pub mod math;
pub mod naming;
pub mod source;
pub mod animation;
pub mod graph;
pub mod scene;
pub mod mesh;
pub mod skeleton;
pub mod materials;
pub mod export;

pub use errors::{ErrorKind, ExportError, Result};
pub use diagnostics::ExportLog;
pub use settings::{ArgumentFilter, ExportSettings};
pub use tree::{Tree, TreeError};
pub use source::{MaterialId, ObjectId, SceneObject, SceneSnapshot};
pub use graph::{ExportGraph, ExportKey, ExportModel, ExportNode, NodeKind, RenderNode};
pub use scene::SceneObjectTree;
pub use mesh::{VertexBuffer, VertexWelder};
pub use skeleton::SkeletonBinding;
pub use export::{ExportGraphWalker, ExportPhase, ExportReport, JsonModelWriter, ModelWriter, export};

//! Export
//!
//! Drives one export run from a [`SceneSnapshot`] to a [`ModelWriter`].
//!
//! # Overview
//!
//! [`export`] builds the scene trees, walks them with
//! [`ExportGraphWalker`], resolves skins and hands the model to the writer.
//! The writer is skipped when anything was recorded as an error, and every
//! tree is torn down on both the success and the failure path.
//!
//! ```rust,ignore
//! let report = export(&snapshot, &ExportSettings::default(), &mut JsonModelWriter::new(), "out.json")?;
//! println!("{} render nodes", report.stats.render_nodes);
//! ```
//!
//! Payload exporters live in their own modules:
//!
//! - [`lights`]: omni and spot lights
//! - [`fake_lights`]: billboard light sprites
//! - [`connectors`]: attachment points with key/value properties
//! - [`segments`]: collision lines and shells

pub mod connectors;
pub mod fake_lights;
pub mod lights;
pub mod segments;
pub mod walker;
pub mod writer;

pub use connectors::parse_connector_ext;
pub use walker::{ExportGraphWalker, ExportPhase, WalkStats};
pub use writer::{JsonModelWriter, ModelWriter, model_to_json};

use crate::diagnostics::ExportLog;
use crate::errors::{ExportError, Result};
use crate::scene::SceneObjectTree;
use crate::settings::ExportSettings;
use crate::source::SceneSnapshot;

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub stats: WalkStats,
    /// Export graph nodes handed to the writer.
    pub nodes: usize,
    pub bones: usize,
    pub warnings: Vec<String>,
}

/// Exports `snapshot` through `writer` to `path`.
///
/// Fails with the first fatal error, with [`ExportError::RecordedErrors`]
/// when recoverable errors were recorded, or with
/// [`ExportError::WriteFailed`] when the writer rejects the model.
pub fn export(
    snapshot: &SceneSnapshot,
    settings: &ExportSettings,
    writer: &mut dyn ModelWriter,
    path: &str,
) -> Result<ExportReport> {
    let mut log = ExportLog::new();

    let mut scene = match SceneObjectTree::build(snapshot, &mut log) {
        Ok(scene) => scene,
        Err(err) => {
            if !log.has_errors() {
                log.record(&err);
            }
            return Err(err);
        }
    };

    let mut walker = ExportGraphWalker::new(snapshot, &scene, settings, &mut log);
    let outcome = walker.run();
    let stats = walker.stats();
    let bones = walker.binding().len();
    let mut model = walker.into_model();

    let result = outcome.and_then(|()| {
        if log.has_errors() {
            return Err(ExportError::RecordedErrors(log.errors().len()));
        }
        writer
            .serialize(&model, path, settings.format_version)
            .map_err(|reason| ExportError::WriteFailed {
                path: path.to_string(),
                reason,
            })?;
        Ok(ExportReport {
            stats,
            nodes: model.graph.len(),
            bones,
            warnings: log.warnings().to_vec(),
        })
    });

    model.clear();
    scene.destroy();

    match &result {
        Ok(report) => log::info!(
            "export finished: {} objects, {} render nodes, {} warnings",
            report.stats.objects,
            report.stats.render_nodes,
            report.warnings.len()
        ),
        Err(err) => log::error!("export failed: {err}"),
    }
    result
}

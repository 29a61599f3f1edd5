//! Model writers.
//!
//! The binary model layout is owned by the consumer; this crate only hands
//! the assembled [`ExportModel`] over through [`ModelWriter`].
//! [`JsonModelWriter`] is a debug writer that dumps the graph as nested JSON.

use serde::Serialize;

use crate::graph::{ExportGraph, ExportKey, ExportModel, NodeKind};
use crate::math::Aabb;

/// Output collaborator of an export run.
pub trait ModelWriter {
    /// Writes `model` to `path`. The error is a human-readable reason.
    fn serialize(&mut self, model: &ExportModel, path: &str, format_version: u32) -> Result<(), String>;
}

#[derive(Serialize)]
struct NodeView<'a> {
    name: &'a str,
    kind: &'a NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeView<'a>>,
}

impl<'a> NodeView<'a> {
    fn build(graph: &'a ExportGraph, key: ExportKey) -> Option<Self> {
        let node = graph.value(key)?;
        Some(Self {
            name: &node.name,
            kind: &node.kind,
            children: graph
                .children(key)
                .iter()
                .filter_map(|&c| Self::build(graph, c))
                .collect(),
        })
    }
}

#[derive(Serialize)]
struct ModelDocument<'a> {
    format_version: u32,
    bounding_box: Option<Aabb>,
    user_box: Option<Aabb>,
    light_box: Option<Aabb>,
    root: Option<NodeView<'a>>,
}

/// Renders `model` as a JSON document.
pub fn model_to_json(model: &ExportModel, format_version: u32, pretty: bool) -> serde_json::Result<String> {
    let document = ModelDocument {
        format_version,
        bounding_box: model.bounding_box,
        user_box: model.user_box,
        light_box: model.light_box,
        root: model.root.and_then(|root| NodeView::build(&model.graph, root)),
    };
    if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
}

/// Writes the model as JSON to the given path.
#[derive(Debug, Clone, Default)]
pub struct JsonModelWriter {
    pub pretty: bool,
}

impl JsonModelWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ModelWriter for JsonModelWriter {
    fn serialize(&mut self, model: &ExportModel, path: &str, format_version: u32) -> Result<(), String> {
        let text = model_to_json(model, format_version, self.pretty).map_err(|e| e.to_string())?;
        std::fs::write(path, text).map_err(|e| e.to_string())?;
        log::info!("model written to {path}");
        Ok(())
    }
}

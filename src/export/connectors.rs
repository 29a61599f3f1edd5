//! Connector export.
//!
//! A connector carries free-form properties written as a small expression
//! on the object:
//!
//! ```text
//! kind = "hook"; range = 2.5
//! slot = 3
//! ```
//!
//! Statements are separated by `;` or newlines. Values are numbers or
//! quoted strings. Other values (`True`, `0x10`, `2*3`) are skipped with a
//! warning; a statement that is not an assignment rejects the connector.

use glam::Vec3;

use crate::diagnostics::ExportLog;
use crate::errors::{ExportError, Result};
use crate::graph::{ConnectorNode, ConnectorValue, ExportGraph, ExportKey, ExportNode, NodeKind};
use crate::math::axis_rotation;
use crate::source::SceneObject;

pub const CONNECTOR_TRANSFORM_NAME: &str = "Connector Transform";

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_unterminated(raw: &str) -> bool {
    match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => raw.len() < 2 || !raw.ends_with(quote),
        _ => false,
    }
}

fn parse_value(raw: &str) -> Option<ConnectorValue> {
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return (!inner.contains(quote)).then(|| ConnectorValue::Text(inner.to_string()));
        }
    }
    raw.parse::<f32>().ok().filter(|v| v.is_finite()).map(ConnectorValue::Float)
}

/// Parses a connector expression. Later assignments to a name replace
/// earlier ones in place.
pub fn parse_connector_ext(object: &str, text: &str, log: &mut ExportLog) -> Result<Vec<(String, ConnectorValue)>> {
    let malformed = |reason: String| ExportError::MalformedConnector {
        object: object.to_string(),
        reason,
    };

    let mut properties: Vec<(String, ConnectorValue)> = Vec::new();
    for statement in text.split([';', '\n']).map(str::trim).filter(|s| !s.is_empty()) {
        let (name, value) = statement
            .split_once('=')
            .ok_or_else(|| malformed(format!("expected `name = value`, got `{statement}`")))?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(malformed(format!("`{name}` is not a property name")));
        }
        let raw = value.trim();
        if raw.is_empty() || is_unterminated(raw) {
            return Err(malformed(format!("`{name}` has no complete value")));
        }
        let Some(value) = parse_value(raw) else {
            log.warning(&format!("Connector property {name} = {raw} is neither a number nor a string, skipped."));
            continue;
        };

        match properties.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => properties.push((name.to_string(), value)),
        }
    }
    Ok(properties)
}

/// Emits the connector of `obj` under an X-rotated transform below `control`.
pub fn export_connector(
    graph: &mut ExportGraph,
    control: ExportKey,
    obj: &SceneObject,
    log: &mut ExportLog,
) -> Result<ExportKey> {
    let properties = parse_connector_ext(&obj.name, &obj.props.connector_ext, log)?;
    let transform = graph.insert_child(
        control,
        ExportNode::transform(CONNECTOR_TRANSFORM_NAME, axis_rotation(Vec3::X, 90.0)),
    )?;
    let connector = ConnectorNode {
        name: obj.name.clone(),
        properties,
    };
    Ok(graph.insert_child(transform, ExportNode::new(obj.name.clone(), NodeKind::Connector(connector)))?)
}

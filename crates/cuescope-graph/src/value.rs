//! Graph from an evaluated value
//!
//! Only a top-level object produces nodes. Key order is the value's own
//! enumeration order (serde_json is built with `preserve_order`).

use crate::node::{GraphNode, NodeKind};
use crate::violations::ViolationIndex;
use crate::MAX_TOP_LEVEL_KEYS;
use cuescope_diagnostics::Diagnostic;
use serde_json::Value;

/// Kind of a JSON value as rendered in the graph
#[inline]
#[must_use]
pub fn kind_of(value: &Value) -> NodeKind {
    match value {
        Value::Array(_) => NodeKind::Array,
        Value::Object(_) => NodeKind::Object,
        _ => NodeKind::Value,
    }
}

/// Build the node list for an evaluated value
///
/// - non-objects (null, scalars, arrays) yield no nodes
/// - more than [`MAX_TOP_LEVEL_KEYS`] keys collapse into the `summary` node
/// - object nodes list their first [`crate::MAX_CHILDREN`] child keys
#[must_use]
pub fn build_graph(value: &Value, diagnostics: &[Diagnostic]) -> Vec<GraphNode> {
    let Value::Object(map) = value else {
        return Vec::new();
    };

    if map.len() > MAX_TOP_LEVEL_KEYS {
        return vec![GraphNode::summary(map.len())];
    }

    let index = ViolationIndex::build(diagnostics);

    map.iter()
        .map(|(key, child)| {
            let node = GraphNode::new(key.as_str(), kind_of(child));
            let node = match child {
                Value::Object(fields) => node.with_children(fields.keys().map(String::as_str)),
                _ => node,
            };
            node.with_violations(index.summarize(key, None))
        })
        .collect()
}

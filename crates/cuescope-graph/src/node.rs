//! Graph node types

use cuescope_diagnostics::{Diagnostic, Severity};
use serde::{Deserialize, Serialize};

/// Identifier of the node that replaces oversized graphs
pub const SUMMARY_NODE_ID: &str = "summary";

/// Identifier of the catch-all node emitted for unparseable text
pub const DOCUMENT_NODE_ID: &str = "document";

/// Structural kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Structured value with keys
    Object,
    /// List
    Array,
    /// Scalar
    Value,
}

/// Violations correlated onto one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationSummary {
    /// Highest severity present
    pub severity: Severity,
    /// Contributing violation identifiers, in diagnostic order
    pub ids: Vec<String>,
    /// Number of contributing diagnostics
    pub count: usize,
}

impl ViolationSummary {
    /// Summarize a set of matched diagnostics, `None` when empty
    #[must_use]
    pub fn from_matches<'a, I>(matches: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Diagnostic>,
    {
        let mut severity: Option<Severity> = None;
        let mut ids = Vec::new();
        for diag in matches {
            severity = Some(severity.map_or(diag.severity(), |s| s.max(diag.severity())));
            ids.push(diag.violation_id().to_string());
        }
        severity.map(|severity| Self {
            severity,
            count: ids.len(),
            ids,
        })
    }
}

/// One renderable structural element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Field key
    pub id: String,
    /// Display label
    pub label: String,
    /// Structural kind
    pub kind: NodeKind,
    /// First child keys (objects only, bounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    /// Correlated violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<ViolationSummary>,
}

impl GraphNode {
    /// Create node labelled with its own key
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            children: None,
            violations: None,
        }
    }

    /// With display label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// With child keys, truncated to [`crate::MAX_CHILDREN`]
    #[must_use]
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = Some(
            children
                .into_iter()
                .take(crate::MAX_CHILDREN)
                .map(Into::into)
                .collect(),
        );
        self
    }

    /// With violation summary
    #[inline]
    #[must_use]
    pub fn with_violations(mut self, violations: Option<ViolationSummary>) -> Self {
        self.violations = violations;
        self
    }

    /// The node that stands in for an object with too many keys
    #[must_use]
    pub fn summary(key_count: usize) -> Self {
        Self::new(SUMMARY_NODE_ID, NodeKind::Object).with_label(format!(
            "{key_count} top-level fields (too many to display individually)"
        ))
    }

    /// The node that carries every diagnostic when no field was found
    #[must_use]
    pub fn document(diagnostics: &[Diagnostic]) -> Self {
        Self::new(DOCUMENT_NODE_ID, NodeKind::Object)
            .with_label("Document")
            .with_violations(ViolationSummary::from_matches(diagnostics))
    }

    /// Whether any violation is attached
    #[inline]
    #[must_use]
    pub fn has_violations(&self) -> bool {
        self.violations.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuescope_diagnostics::parse_diagnostics;

    #[test]
    fn children_are_capped() {
        let node = GraphNode::new("config", NodeKind::Object)
            .with_children((0..15).map(|i| format!("k{i}")));
        assert_eq!(node.children.as_ref().map(Vec::len), Some(10));
    }

    #[test]
    fn summary_takes_highest_severity() {
        let diags = parse_diagnostics("value may be stale\nconflicting values 1 and 2");
        let summary = ViolationSummary::from_matches(&diags).unwrap();
        assert_eq!(summary.severity, Severity::Error);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.ids.len(), 2);
    }

    #[test]
    fn no_matches_no_summary() {
        assert!(ViolationSummary::from_matches(&[] as &[Diagnostic]).is_none());
    }

    #[test]
    fn summary_node_has_no_children() {
        let node = GraphNode::summary(250);
        assert_eq!(node.id, SUMMARY_NODE_ID);
        assert!(node.label.contains("250"));
        assert!(node.children.is_none());
    }

    #[test]
    fn serialized_node_omits_empty_parts() {
        let json = serde_json::to_value(GraphNode::new("a", NodeKind::Value)).unwrap();
        assert_eq!(json, serde_json::json!({"id": "a", "label": "a", "kind": "value"}));
    }
}

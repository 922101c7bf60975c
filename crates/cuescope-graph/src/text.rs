//! Heuristic graph from raw source text
//!
//! Used only when no evaluation produced a value. Each line starting with
//! `identifier:` becomes a node; the kind is guessed from the first
//! character of the value that follows the colon.

use crate::node::{GraphNode, NodeKind};
use crate::violations::ViolationIndex;
use cuescope_diagnostics::Diagnostic;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

#[allow(clippy::expect_used)]
static FIELD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:(?P<ident>[A-Za-z_$#][\w$#-]*)|"(?P<quoted>[^"]+)")[?!]?\s*:\s*(?P<rest>.*)$"#)
        .expect("static field-line pattern")
});

/// A field detected in raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField<'t> {
    /// Field name (quotes stripped)
    pub name: &'t str,
    /// 1-based line the field starts on
    pub line: u32,
    /// Kind guessed from the value token
    pub kind: NodeKind,
}

/// Guess a kind from the text after the colon
#[inline]
#[must_use]
pub fn kind_of_token(rest: &str) -> NodeKind {
    match rest.trim_start().chars().next() {
        Some('{') => NodeKind::Object,
        Some('[') => NodeKind::Array,
        _ => NodeKind::Value,
    }
}

/// Scan source for `identifier:` lines, first occurrence of each name wins
#[must_use]
pub fn scan_fields(text: &str) -> Vec<TextField<'_>> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let Some(caps) = FIELD_LINE.captures(line) else {
            continue;
        };
        let Some(name) = caps.name("ident").or_else(|| caps.name("quoted")) else {
            continue;
        };
        let name = name.as_str();
        if !seen.insert(name) {
            continue;
        }
        let rest = caps.name("rest").map_or("", |m| m.as_str());
        fields.push(TextField {
            name,
            line: u32::try_from(idx + 1).unwrap_or(u32::MAX),
            kind: kind_of_token(rest),
        });
    }

    fields
}

/// Build nodes from raw text
///
/// When no field is found but diagnostics exist, a single `document` node
/// carries all of them so the caller always has somewhere to render.
#[must_use]
pub fn build_graph_from_text(text: &str, diagnostics: &[Diagnostic]) -> Vec<GraphNode> {
    let fields = scan_fields(text);

    if fields.is_empty() {
        return if diagnostics.is_empty() {
            Vec::new()
        } else {
            vec![GraphNode::document(diagnostics)]
        };
    }

    let index = ViolationIndex::build(diagnostics);
    fields
        .into_iter()
        .map(|field| {
            GraphNode::new(field.name, field.kind)
                .with_violations(index.summarize(field.name, Some(field.line)))
        })
        .collect()
}

//! Diagnostic → node correlation
//!
//! The index is heuristic and deliberately permissive: a node collects every
//! diagnostic whose message names it (quoted, after the word "field", as a
//! dotted-path fragment, or merely as a substring). It can attach unrelated
//! diagnostics and miss ones that never mention a field; renderers rely on
//! that permissiveness.

use crate::node::ViolationSummary;
use cuescope_diagnostics::Diagnostic;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

#[allow(clippy::expect_used)]
static FIELD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""([^"]+)""#,
        r"'([^']+)'",
        r"`([^`]+)`",
        r"\bfield\s+([A-Za-z_$#][\w$#]*)",
        r"\.([A-Za-z_$#][\w$#]*)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static field pattern"))
    .collect()
});

/// Key under which a located diagnostic is also indexed
#[inline]
#[must_use]
pub fn line_key(line: u32) -> String {
    format!("line_{line}")
}

/// Field-name candidates mentioned in a message, in order of appearance
/// per pattern
#[must_use]
pub fn extract_field_names(message: &str) -> Vec<&str> {
    FIELD_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(message))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Diagnostics indexed by the field names and line keys they mention
#[derive(Debug, Clone)]
pub struct ViolationIndex<'a> {
    diagnostics: &'a [Diagnostic],
    by_key: IndexMap<String, Vec<usize>>,
}

impl<'a> ViolationIndex<'a> {
    /// Scan every diagnostic once
    #[must_use]
    pub fn build(diagnostics: &'a [Diagnostic]) -> Self {
        let mut by_key: IndexMap<String, Vec<usize>> = IndexMap::new();

        for (idx, diag) in diagnostics.iter().enumerate() {
            let mut push = |key: String| {
                let slot = by_key.entry(key).or_default();
                if slot.last() != Some(&idx) {
                    slot.push(idx);
                }
            };
            for name in extract_field_names(diag.message()) {
                push(name.to_string());
            }
            if let Some(line) = diag.line() {
                push(line_key(line));
            }
        }

        Self { diagnostics, by_key }
    }

    /// Number of distinct keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether nothing was indexed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Indexed keys, in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    /// Diagnostics matching a node identifier, deduplicated, in diagnostic order
    ///
    /// Exact key hit, then keys containing the identifier, then messages
    /// containing it. `line` additionally pulls in the `line_<N>` bucket.
    #[must_use]
    pub fn lookup(&self, id: &str, line: Option<u32>) -> Vec<&'a Diagnostic> {
        let mut hits = BTreeSet::new();

        if let Some(line) = line {
            if let Some(idxs) = self.by_key.get(&line_key(line)) {
                hits.extend(idxs.iter().copied());
            }
        }

        // An empty key would be a substring of everything
        if !id.is_empty() {
            if let Some(idxs) = self.by_key.get(id) {
                hits.extend(idxs.iter().copied());
            }
            for (key, idxs) in &self.by_key {
                if key.contains(id) {
                    hits.extend(idxs.iter().copied());
                }
            }
            for (idx, diag) in self.diagnostics.iter().enumerate() {
                if diag.message().contains(id) {
                    hits.insert(idx);
                }
            }
        }

        let diagnostics = self.diagnostics;
        hits.into_iter().map(|idx| &diagnostics[idx]).collect()
    }

    /// Violation summary for a node, `None` without matches
    #[inline]
    #[must_use]
    pub fn summarize(&self, id: &str, line: Option<u32>) -> Option<ViolationSummary> {
        ViolationSummary::from_matches(self.lookup(id, line))
    }
}

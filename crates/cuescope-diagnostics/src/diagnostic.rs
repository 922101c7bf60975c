//! Diagnostic types
//!
//! A [`Diagnostic`] is one problem reported by the configuration compiler.
//! It is immutable once built: the classifier fills in severity, violation
//! identifier and the human-facing explanation at construction time.

use crate::classify::IssueCategory;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Severity of a diagnostic
///
/// Ordering follows rank: `Info < Warning < Error`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note
    Info,
    /// Non-blocking issue
    Warning,
    /// Blocking issue (also the default when classification is ambiguous)
    #[default]
    Error,
}

impl Severity {
    /// Lower-case wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position reported by the compiler (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// File name, `None` when the compiler printed an empty one
    pub file: Option<String>,
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl SourceLocation {
    /// Create new location
    #[inline]
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        let file = file.into();
        Self {
            file: if file.is_empty() { None } else { Some(file) },
            line,
            column,
        }
    }
}

/// One compiler-reported problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
    message: String,
    severity: Severity,
    violation_id: String,
    friendly_message: String,
    suggested_fix: String,
}

impl Diagnostic {
    /// Build a classified diagnostic
    ///
    /// `now` only feeds the coarse tie-breaker of the violation identifier.
    #[must_use]
    pub fn new(location: Option<SourceLocation>, message: impl Into<String>, now: SystemTime) -> Self {
        let message = message.into();
        let category = IssueCategory::detect(&message);
        let line = location.as_ref().map(|l| l.line);
        let violation_id = crate::violation_id(&message, line, now);

        let (file, line, column) = match location {
            Some(loc) => (loc.file, Some(loc.line), Some(loc.column)),
            None => (None, None, None),
        };

        Self {
            file,
            line,
            column,
            severity: IssueCategory::severity_of(category),
            friendly_message: IssueCategory::friendly_message_of(category).to_string(),
            suggested_fix: IssueCategory::suggested_fix_of(category).to_string(),
            violation_id,
            message,
        }
    }

    /// Unlocated diagnostic produced by the service itself
    /// (timeouts, rejected input, internal failures)
    #[inline]
    #[must_use]
    pub fn synthetic(message: impl Into<String>) -> Self {
        Self::new(None, message, SystemTime::now())
    }

    /// Source file name
    #[inline]
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// 1-based line
    #[inline]
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// 1-based column
    #[inline]
    #[must_use]
    pub fn column(&self) -> Option<u32> {
        self.column
    }

    /// Raw compiler message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Classified severity
    #[inline]
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Deterministic violation identifier
    #[inline]
    #[must_use]
    pub fn violation_id(&self) -> &str {
        &self.violation_id
    }

    /// Human-readable explanation
    #[inline]
    #[must_use]
    pub fn friendly_message(&self) -> &str {
        &self.friendly_message
    }

    /// Suggested remediation
    #[inline]
    #[must_use]
    pub fn suggested_fix(&self) -> &str {
        &self.suggested_fix
    }

    /// Whether the compiler attached a line/column
    #[inline]
    #[must_use]
    pub fn is_located(&self) -> bool {
        self.line.is_some()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.file.as_deref(), self.line, self.column) {
            (file, Some(line), Some(column)) => write!(
                f,
                "{}:{}:{}: {}: {}",
                file.unwrap_or(""),
                line,
                column,
                self.severity,
                self.message
            ),
            _ => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

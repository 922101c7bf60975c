//! cuescope diagnostics
//!
//! Turns the free-form stderr of a configuration compiler into structured
//! [`Diagnostic`]s:
//! - source location (`file:line:column`) when the compiler printed one
//! - severity from fixed phrase tables
//! - a friendly explanation and a suggested fix
//! - a deterministic violation identifier used to correlate graph nodes
//!
//! Nothing in this crate fails: unparseable lines degrade to unlocated
//! diagnostics instead of being dropped.
//!
//! # Example
//!
//! ```rust
//! use cuescope_diagnostics::{parse_diagnostics, Severity};
//!
//! let diags = parse_diagnostics("doc.cue:2:5: undefined field \"foo\"");
//! assert_eq!(diags[0].line(), Some(2));
//! assert_eq!(diags[0].severity(), Severity::Error);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod classify;
pub mod diagnostic;
pub mod parse;

pub use classify::IssueCategory;
pub use diagnostic::{Diagnostic, Severity, SourceLocation};
pub use parse::{parse_diagnostics, parse_diagnostics_at, parse_line};

use std::time::{SystemTime, UNIX_EPOCH};

/// Characters of the normalized message that feed the violation identifier
pub const VIOLATION_PREFIX_LEN: usize = 48;

/// Width of the coarse time bucket mixed into violation identifiers
pub const VIOLATION_TIME_BUCKET_SECS: u64 = 60;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Derive a violation identifier
///
/// Inputs: whitespace-collapsed, lower-cased message prefix, the line number
/// (0 when unlocated) and the current minute. Identical messages on the same
/// line within the same minute share an identifier.
#[must_use]
pub fn violation_id(message: &str, line: Option<u32>, now: SystemTime) -> String {
    let normalized: String = message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(VIOLATION_PREFIX_LEN)
        .collect();
    let bucket = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / VIOLATION_TIME_BUCKET_SECS)
        .unwrap_or(0);

    let mut hasher = blake3::Hasher::new();
    hasher.update(normalized.as_bytes());
    hasher.update(&[0]);
    hasher.update(&line.unwrap_or(0).to_le_bytes());
    hasher.update(&bucket.to_le_bytes());
    let digest = hasher.finalize();

    format!("v_{}", hex::encode(&digest.as_bytes()[..6]))
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with diagnostics
    pub use crate::{parse_diagnostics, Diagnostic, IssueCategory, Severity, SourceLocation};
}

//! Compiler stderr → diagnostics
//!
//! Each non-blank line becomes exactly one diagnostic. Lines shaped like
//! `<file>:<line>:<column>: <message>` are located; everything else is kept
//! verbatim as an unlocated message.

use crate::diagnostic::{Diagnostic, SourceLocation};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::SystemTime;

#[allow(clippy::expect_used)]
static LOCATED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<file>.*?):(?P<line>[1-9][0-9]*):(?P<column>[1-9][0-9]*): (?P<message>.+)$")
        .expect("static located-line pattern")
});

/// Parse compiler stderr into diagnostics, in emission order
#[inline]
#[must_use]
pub fn parse_diagnostics(stderr: &str) -> Vec<Diagnostic> {
    parse_diagnostics_at(stderr, SystemTime::now())
}

/// Same as [`parse_diagnostics`] with an explicit clock for the violation
/// identifier tie-breaker
#[must_use]
pub fn parse_diagnostics_at(stderr: &str, now: SystemTime) -> Vec<Diagnostic> {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_line(line, now))
        .collect()
}

/// Parse one non-blank line
#[must_use]
pub fn parse_line(line: &str, now: SystemTime) -> Diagnostic {
    match locate(line) {
        Some((location, message)) => Diagnostic::new(Some(location), message, now),
        None => Diagnostic::new(None, line, now),
    }
}

fn locate(line: &str) -> Option<(SourceLocation, &str)> {
    let caps = LOCATED_LINE.captures(line)?;
    // Out-of-range numbers degrade to an unlocated diagnostic
    let line_no = caps.name("line")?.as_str().parse::<u32>().ok()?;
    let column = caps.name("column")?.as_str().parse::<u32>().ok()?;
    let file = caps.name("file").map_or("", |m| m.as_str());
    let message = caps.name("message")?.as_str();
    Some((SourceLocation::new(file, line_no, column), message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use proptest::prelude::*;

    fn epoch() -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_diagnostics("").is_empty());
        assert!(parse_diagnostics("\n\n  \n").is_empty());
    }

    #[test]
    fn located_undefined_field() {
        let diags = parse_diagnostics("doc.cue:2:5: undefined field \"foo\"");
        assert_eq!(diags.len(), 1);

        let d = &diags[0];
        assert_eq!(d.file(), Some("doc.cue"));
        assert_eq!(d.line(), Some(2));
        assert_eq!(d.column(), Some(5));
        assert_eq!(d.message(), "undefined field \"foo\"");
        assert_eq!(d.severity(), Severity::Error);
        assert!(!d.friendly_message().is_empty());
        assert!(!d.suggested_fix().is_empty());
    }

    #[test]
    fn empty_file_name_is_still_located() {
        let diags = parse_diagnostics_at(":7:1: field extra not allowed", epoch());
        assert_eq!(diags[0].file(), None);
        assert_eq!(diags[0].line(), Some(7));
        assert_eq!(diags[0].column(), Some(1));
    }

    #[test]
    fn unmatched_line_is_kept_whole() {
        let diags = parse_diagnostics_at("a.b: incomplete value string", epoch());
        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_located());
        assert_eq!(diags[0].message(), "a.b: incomplete value string");
        assert_eq!(diags[0].severity(), Severity::Warning);
    }

    #[test]
    fn zero_line_is_not_a_location() {
        let diags = parse_diagnostics_at("doc.cue:0:3: oops", epoch());
        assert!(!diags[0].is_located());
        assert_eq!(diags[0].message(), "doc.cue:0:3: oops");
    }

    #[test]
    fn blank_lines_are_skipped_and_order_kept() {
        let input = "doc.cue:1:1: first\n\n   \nsecond\r\ndoc.cue:3:2: third\n";
        let diags = parse_diagnostics_at(input, epoch());
        let messages: Vec<_> = diags.iter().map(Diagnostic::message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn windows_style_path() {
        let diags = parse_diagnostics_at(r"C:\work\doc.cue:4:9: conflicting values", epoch());
        assert_eq!(diags[0].file(), Some(r"C:\work\doc.cue"));
        assert_eq!(diags[0].line(), Some(4));
    }

    #[test]
    fn same_clock_same_ids() {
        let input = "doc.cue:2:5: undefined field \"foo\"\nother";
        let a = parse_diagnostics_at(input, epoch());
        let b = parse_diagnostics_at(input, epoch());
        assert_eq!(a, b);
        assert_ne!(a[0].violation_id(), a[1].violation_id());
    }

    proptest! {
        #[test]
        fn prop_one_diagnostic_per_non_blank_line(lines in proptest::collection::vec(".{0,40}", 0..20)) {
            let input = lines.join("\n");
            let expected = input.lines().filter(|l| !l.trim().is_empty()).count();
            let diags = parse_diagnostics_at(&input, epoch());
            prop_assert_eq!(diags.len(), expected);
            for d in &diags {
                prop_assert!(!d.message().is_empty());
                prop_assert!(!d.violation_id().is_empty());
            }
        }
    }
}

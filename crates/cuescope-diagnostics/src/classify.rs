//! Phrase tables for severity and remediation
//!
//! Compiler messages are classified by literal phrase matching. Blocking
//! phrases are checked first, then non-blocking ones; the first hit wins.
//! Messages that match nothing fall back to [`Severity::Error`] with a
//! generic explanation.

use crate::diagnostic::Severity;
use once_cell::sync::Lazy;
use regex::Regex;

/// Phrase category recognized in a compiler message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCategory {
    /// Two declarations disagree
    ConflictingValues,
    /// Reference to a field that does not exist
    UndefinedField,
    /// Types that cannot be combined
    CannotUnify,
    /// Parse failure
    SyntaxError,
    /// Field or construct rejected by a closed definition or policy
    NotAllowed,
    /// Constraint violation
    Invalid,
    /// Non-concrete value
    Incomplete,
    /// Deprecated construct
    Deprecated,
    /// Advice phrased with "may" / "should"
    Advisory,
}

const GENERIC_FRIENDLY: &str = "The compiler reported a problem with this document.";
const GENERIC_FIX: &str = "Review the message and the referenced location for details.";

static BLOCKING: Lazy<Vec<(IssueCategory, Regex)>> = Lazy::new(|| {
    table(&[
        (IssueCategory::ConflictingValues, r"(?i)conflicting values"),
        (IssueCategory::UndefinedField, r"(?i)undefined field"),
        (IssueCategory::CannotUnify, r"(?i)cannot unify"),
        (IssueCategory::SyntaxError, r"(?i)syntax error"),
        (IssueCategory::NotAllowed, r"(?i)not allowed"),
        (IssueCategory::Invalid, r"(?i)\binvalid\b"),
    ])
});

static NON_BLOCKING: Lazy<Vec<(IssueCategory, Regex)>> = Lazy::new(|| {
    table(&[
        (IssueCategory::Incomplete, r"(?i)\bincomplete\b"),
        (IssueCategory::Deprecated, r"(?i)\bdeprecated\b"),
        (IssueCategory::Advisory, r"(?i)\b(?:may|should)\b"),
    ])
});

#[allow(clippy::expect_used)]
fn table(entries: &[(IssueCategory, &str)]) -> Vec<(IssueCategory, Regex)> {
    entries
        .iter()
        .map(|(category, pattern)| {
            (
                *category,
                Regex::new(pattern).expect("static classifier pattern"),
            )
        })
        .collect()
}

impl IssueCategory {
    /// Classify a raw message
    #[must_use]
    pub fn detect(message: &str) -> Option<Self> {
        BLOCKING
            .iter()
            .chain(NON_BLOCKING.iter())
            .find(|(_, re)| re.is_match(message))
            .map(|(category, _)| *category)
    }

    /// Whether this category blocks validation
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Self::ConflictingValues
                | Self::UndefinedField
                | Self::CannotUnify
                | Self::SyntaxError
                | Self::NotAllowed
                | Self::Invalid
        )
    }

    /// Severity for a (possibly unrecognized) category
    #[inline]
    #[must_use]
    pub fn severity_of(category: Option<Self>) -> Severity {
        match category {
            Some(c) if !c.is_blocking() => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Friendly explanation, generic when unrecognized
    #[inline]
    #[must_use]
    pub fn friendly_message_of(category: Option<Self>) -> &'static str {
        category.map_or(GENERIC_FRIENDLY, |c| c.friendly_message())
    }

    /// Suggested fix, generic when unrecognized
    #[inline]
    #[must_use]
    pub fn suggested_fix_of(category: Option<Self>) -> &'static str {
        category.map_or(GENERIC_FIX, |c| c.suggested_fix())
    }

    /// Human-readable explanation
    #[must_use]
    pub fn friendly_message(&self) -> &'static str {
        match self {
            Self::ConflictingValues => {
                "Two declarations assign incompatible values to the same field."
            }
            Self::UndefinedField => "The document refers to a field that is not defined.",
            Self::CannotUnify => "Two values have types that cannot be combined.",
            Self::SyntaxError => "The document could not be parsed.",
            Self::NotAllowed => "This field or construct is not permitted here.",
            Self::Invalid => "A value does not satisfy its declared constraint.",
            Self::Incomplete => "Some values are not concrete yet.",
            Self::Deprecated => "This construct is deprecated.",
            Self::Advisory => "The compiler reported advice that does not block validation.",
        }
    }

    /// Suggested remediation
    #[must_use]
    pub fn suggested_fix(&self) -> &'static str {
        match self {
            Self::ConflictingValues => {
                "Make the values agree, or relax one of the constraints so both can hold."
            }
            Self::UndefinedField => {
                "Define the field, correct the spelling of the reference, or remove it."
            }
            Self::CannotUnify => {
                "Check that both sides use compatible types (for example string and int)."
            }
            Self::SyntaxError => {
                "Look for unbalanced braces, missing colons or stray characters near the reported position."
            }
            Self::NotAllowed => {
                "Remove it, or open the definition explicitly (for example with `...`)."
            }
            Self::Invalid => "Adjust the value to match the constraint, or update the constraint.",
            Self::Incomplete => {
                "Give every field a concrete value, or add a default with `*`."
            }
            Self::Deprecated => "Migrate to the recommended replacement.",
            Self::Advisory => "Review the message and apply the recommendation if it fits.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_phrases() {
        for (msg, expected) in [
            ("a: conflicting values 1 and 2", IssueCategory::ConflictingValues),
            ("undefined field \"foo\"", IssueCategory::UndefinedField),
            ("cannot unify int and string", IssueCategory::CannotUnify),
            ("Syntax Error: unexpected '}'", IssueCategory::SyntaxError),
            ("field extra not allowed", IssueCategory::NotAllowed),
            ("invalid value 5 (out of bound <3)", IssueCategory::Invalid),
        ] {
            let category = IssueCategory::detect(msg);
            assert_eq!(category, Some(expected), "{msg}");
            assert_eq!(IssueCategory::severity_of(category), Severity::Error);
        }
    }

    #[test]
    fn non_blocking_phrases() {
        for (msg, expected) in [
            ("incomplete value string", IssueCategory::Incomplete),
            ("this form is deprecated", IssueCategory::Deprecated),
            ("value may be truncated", IssueCategory::Advisory),
            ("you should quote this label", IssueCategory::Advisory),
        ] {
            let category = IssueCategory::detect(msg);
            assert_eq!(category, Some(expected), "{msg}");
            assert_eq!(IssueCategory::severity_of(category), Severity::Warning);
        }
    }

    #[test]
    fn blocking_wins_over_non_blocking() {
        let category = IssueCategory::detect("incomplete: field x not allowed");
        assert_eq!(category, Some(IssueCategory::NotAllowed));
    }

    #[test]
    fn short_words_need_boundaries() {
        // "mayday" and "invalidate" are not the phrases themselves
        assert_eq!(IssueCategory::detect("mayday"), None);
        assert_eq!(IssueCategory::detect("invalidated cache"), None);
    }

    #[test]
    fn unknown_defaults_to_error_with_generic_text() {
        let category = IssueCategory::detect("something went sideways");
        assert_eq!(category, None);
        assert_eq!(IssueCategory::severity_of(category), Severity::Error);
        assert_eq!(IssueCategory::friendly_message_of(category), GENERIC_FRIENDLY);
        assert_eq!(IssueCategory::suggested_fix_of(category), GENERIC_FIX);
    }
}

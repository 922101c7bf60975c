//! Request and response types
//!
//! Wire names are camelCase; optional parts are omitted rather than null.

use crate::error::AdmissionError;
use cuescope_diagnostics::Diagnostic;
use cuescope_graph::GraphNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Inbound validation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    /// Caller-chosen identifier, echoed back unchanged
    pub request_id: String,
    /// Source document
    pub text: String,
    /// Per-call timeout override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ValidateRequest {
    /// Create request without timeout override
    #[inline]
    #[must_use]
    pub fn new(request_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            text: text.into(),
            timeout_ms: None,
        }
    }

    /// With timeout override
    #[inline]
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Timeout override as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Outcome of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Identifier from the request
    pub request_id: String,
    /// Diagnostics in compiler emission order (empty on clean success)
    pub diagnostics: Vec<Diagnostic>,
    /// Evaluated value, only on full success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Structural graph, whenever any structure could be derived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<Vec<GraphNode>>,
}

impl AnalysisResult {
    /// Clean success
    #[inline]
    #[must_use]
    pub fn success(request_id: impl Into<String>, value: Value, graph: Vec<GraphNode>) -> Self {
        Self {
            request_id: request_id.into(),
            diagnostics: Vec::new(),
            value: Some(value),
            graph: Some(graph),
        }
    }

    /// Failure with whatever structure was recovered
    #[inline]
    #[must_use]
    pub fn recovered(
        request_id: impl Into<String>,
        diagnostics: Vec<Diagnostic>,
        graph: Option<Vec<GraphNode>>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            diagnostics,
            value: None,
            graph,
        }
    }

    /// Failure explained by a single service-generated diagnostic
    #[inline]
    #[must_use]
    pub fn single(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::recovered(request_id, vec![Diagnostic::synthetic(message)], None)
    }

    /// Whether the document validated cleanly
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value.is_some() && self.diagnostics.is_empty()
    }
}

/// Error body returned for requests refused at admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable error tag
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl From<&AdmissionError> for ErrorBody {
    fn from(err: &AdmissionError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// One line of the `serve` protocol's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServeResponse {
    /// Analysis ran
    Analysis(AnalysisResult),
    /// Request refused
    Refused {
        /// Identifier from the request (empty when unreadable)
        #[serde(rename = "requestId")]
        request_id: String,
        /// Why it was refused
        error: ErrorBody,
    },
}

impl ServeResponse {
    /// Build a refusal for an admission error
    #[must_use]
    pub fn refused(request_id: impl Into<String>, err: &AdmissionError) -> Self {
        Self::Refused {
            request_id: request_id.into(),
            error: ErrorBody::from(err),
        }
    }
}

/// One line of the `serve` protocol's input
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeRequest {
    /// Rate-limit key; requests without one share the `anonymous` bucket
    #[serde(default = "anonymous_client")]
    pub client_id: String,
    /// The validation request itself
    #[serde(flatten)]
    pub request: ValidateRequest,
}

fn anonymous_client() -> String {
    "anonymous".to_string()
}

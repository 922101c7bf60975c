//! Error types for cuescope core
//!
//! Provides error handling for:
//! - Request admission (size, shape, rate limit)
//! - Compiler invocation failures
//! - Work queue failures
//! - Configuration loading
//!
//! Only admission errors reach callers. Everything that happens inside an
//! analysis is folded into diagnostics by the [`crate::Analyzer`].

use std::path::PathBuf;

/// Errors raised before any analysis work starts
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// Source text exceeds the configured size limit
    #[error("payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Client exhausted its token bucket
    #[error("rate limit exceeded for client '{client_id}'")]
    RateLimited { client_id: String },

    /// Request is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Work queue could not run the analysis
    #[error("analysis queue unavailable: {0}")]
    QueueClosed(#[from] QueueError),
}

impl AdmissionError {
    /// Stable snake_case tag used on the wire and in metrics
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidRequest(_) => "invalid_request",
            Self::QueueClosed(_) => "queue_closed",
        }
    }

    /// Whether retrying later can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::QueueClosed(QueueError::TaskAborted)
        )
    }
}

/// Errors from a single compiler invocation
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Compiler could not be started
    #[error("failed to spawn compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on or reading from the compiler failed
    #[error("compiler i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Isolated input could not be prepared
    #[error("failed to prepare input in {path}: {source}")]
    TempDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compiler succeeded but its stdout is not JSON
    #[error("compiler output is not valid JSON: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

impl EvalError {
    /// Create spawn error for program
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Create temp dir error for path
    pub fn temp_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::TempDir {
            path: path.into(),
            source,
        }
    }
}

/// Work queue errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Task was dropped or panicked before producing a result
    #[error("queued task aborted before completion")]
    TaskAborted,
    /// Submitted outside a tokio runtime, so nothing could run it
    #[error("no tokio runtime available to run queued work")]
    NoRuntime,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

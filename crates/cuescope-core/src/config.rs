//! Service configuration
//!
//! Loaded from TOML (every field optional) and adjusted with builder-style
//! `with_*` methods. Defaults match a production deployment against the
//! `cue` binary on `PATH`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default admission limit on source text (64 KiB)
pub const DEFAULT_MAX_TEXT_BYTES: usize = 64 * 1024;

/// Default token bucket size per client
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// Default number of analyses allowed to run at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default per-request compiler timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Maximum accepted source size in UTF-8 bytes
    pub max_text_bytes: usize,
    /// Tokens per client bucket; one token is refilled per second
    pub rate_limit: u32,
    /// Work queue concurrency cap
    pub max_concurrency: usize,
    /// Timeout applied when a request does not carry one
    pub default_timeout_ms: u64,
    /// External compiler settings
    pub compiler: CompilerConfig,
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check values that would make the service unusable or unsafe
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.program.trim().is_empty() {
            return Err(ConfigError::Invalid("compiler.program is empty".to_string()));
        }
        let file = &self.compiler.input_file;
        if file.is_empty() || file.contains('/') || file.contains('\\') || file.contains("..") {
            return Err(ConfigError::Invalid(format!(
                "compiler.input_file must be a bare file name, got '{file}'"
            )));
        }
        if self.max_text_bytes == 0 {
            return Err(ConfigError::Invalid("max_text_bytes must be positive".to_string()));
        }
        Ok(())
    }

    /// With admission size limit
    #[inline]
    #[must_use]
    pub fn with_max_text_bytes(mut self, bytes: usize) -> Self {
        self.max_text_bytes = bytes;
        self
    }

    /// With per-client rate limit
    #[inline]
    #[must_use]
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = limit;
        self
    }

    /// With work queue concurrency
    #[inline]
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// With default timeout
    #[inline]
    #[must_use]
    pub fn with_default_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    /// With compiler settings
    #[inline]
    #[must_use]
    pub fn with_compiler(mut self, compiler: CompilerConfig) -> Self {
        self.compiler = compiler;
        self
    }

    /// Default timeout as a duration
    #[inline]
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            rate_limit: DEFAULT_RATE_LIMIT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            compiler: CompilerConfig::default(),
        }
    }
}

/// How to invoke the external compiler
///
/// The isolated input file name is appended after the mode arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Executable name or path
    pub program: String,
    /// Arguments for strict ("export") evaluation
    pub export_args: Vec<String>,
    /// Arguments for permissive ("eval") evaluation
    pub eval_args: Vec<String>,
    /// Name of the single file written into each request's temp directory
    pub input_file: String,
}

impl CompilerConfig {
    /// Create config for a compiler executable with default arguments
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "cue".to_string(),
            export_args: vec!["export".into(), "--out".into(), "json".into()],
            eval_args: vec!["eval".into(), "--out".into(), "json".into()],
            input_file: "doc.cue".to_string(),
        }
    }
}

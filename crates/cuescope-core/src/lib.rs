//! cuescope core
//!
//! The validation pipeline around an external configuration compiler:
//! - Admission: size check and per-client token buckets
//! - A bounded FIFO work queue capping concurrent analyses
//! - Subprocess orchestration with hard timeouts
//! - Recovery of partial structure when validation fails
//!
//! # Example
//!
//! ```rust,ignore
//! use cuescope_core::{ServiceConfig, ValidateRequest, ValidationService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ValidationService::from_config(ServiceConfig::new());
//! let result = service
//!     .handle("client-1", ValidateRequest::new("req-1", "replicas: 3"))
//!     .await?;
//!
//! println!("{} diagnostics", result.diagnostics.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analyzer;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod rate_limit;
pub mod service;
pub mod telemetry;
pub mod types;
pub mod work_queue;

pub use analyzer::{Analyzer, IMPORTS_NOT_ALLOWED};
pub use config::{CompilerConfig, ServiceConfig};
pub use error::{AdmissionError, ConfigError, EvalError, QueueError};
pub use evaluator::{CompilerOutput, CueCli, EvalMode, EvalOutcome, Evaluator};
pub use rate_limit::{RateBucket, RateLimiter};
pub use service::ValidationService;
pub use types::{AnalysisResult, ErrorBody, ServeRequest, ServeResponse, ValidateRequest};
pub use work_queue::{QueueStats, WorkQueue};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the validation service
    pub use crate::{
        AdmissionError, AnalysisResult, ServiceConfig, ValidateRequest, ValidationService,
    };
    pub use cuescope_diagnostics::{Diagnostic, Severity};
    pub use cuescope_graph::{GraphNode, NodeKind};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

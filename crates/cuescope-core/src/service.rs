//! Admission facade
//!
//! Owns the per-process shared state (rate buckets and the work queue) and
//! applies the admission checks before any compiler work is queued.

use crate::analyzer::Analyzer;
use crate::config::ServiceConfig;
use crate::error::AdmissionError;
use crate::evaluator::{CueCli, Evaluator};
use crate::rate_limit::RateLimiter;
use crate::telemetry::{REQUESTS_ADMITTED, REQUESTS_REFUSED};
use crate::types::{AnalysisResult, ValidateRequest};
use crate::work_queue::{QueueStats, WorkQueue};
use std::sync::Arc;
use tracing::debug;

/// Validation service
pub struct ValidationService<E> {
    config: ServiceConfig,
    limiter: RateLimiter,
    queue: WorkQueue,
    analyzer: Arc<Analyzer<E>>,
}

impl ValidationService<CueCli> {
    /// Service backed by the configured compiler binary
    #[must_use]
    pub fn from_config(config: ServiceConfig) -> Self {
        let cli = CueCli::new(config.compiler.clone());
        Self::with_evaluator(config, cli)
    }
}

impl<E: Evaluator + 'static> ValidationService<E> {
    /// Service backed by an arbitrary evaluator
    #[must_use]
    pub fn with_evaluator(config: ServiceConfig, evaluator: E) -> Self {
        let analyzer = Analyzer::new(evaluator, config.compiler.input_file.clone());
        Self {
            limiter: RateLimiter::new(config.rate_limit),
            queue: WorkQueue::new(config.max_concurrency),
            analyzer: Arc::new(analyzer),
            config,
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Admit `request` for `client_id` and run its analysis
    ///
    /// Checks run in order: size, then rate. An oversized request does not
    /// consume a token.
    ///
    /// # Errors
    /// [`AdmissionError`] when the request is refused or the queue drops it.
    /// Compiler problems are reported inside the [`AnalysisResult`].
    pub async fn handle(
        &self,
        client_id: &str,
        request: ValidateRequest,
    ) -> Result<AnalysisResult, AdmissionError> {
        if let Err(err) = self.admit(client_id, &request) {
            debug!(client_id, reason = err.kind(), "request refused");
            metrics::counter!(REQUESTS_REFUSED, "reason" => err.kind()).increment(1);
            return Err(err);
        }
        metrics::counter!(REQUESTS_ADMITTED).increment(1);

        let timeout = request
            .timeout()
            .unwrap_or_else(|| self.config.default_timeout());
        let analyzer = Arc::clone(&self.analyzer);
        let ValidateRequest {
            request_id, text, ..
        } = request;

        self.queue
            .submit(async move { analyzer.analyze(&text, &request_id, timeout).await })
            .await
            .map_err(AdmissionError::from)
    }

    fn admit(&self, client_id: &str, request: &ValidateRequest) -> Result<(), AdmissionError> {
        if request.request_id.is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "requestId must not be empty".to_string(),
            ));
        }

        let size = request.text.len();
        let limit = self.config.max_text_bytes;
        if size > limit {
            return Err(AdmissionError::PayloadTooLarge { size, limit });
        }

        if !self.limiter.admit(client_id) {
            return Err(AdmissionError::RateLimited {
                client_id: client_id.to_string(),
            });
        }
        Ok(())
    }

    /// Work queue counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.queue.stats()
    }
}

impl<E> std::fmt::Debug for ValidationService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationService")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

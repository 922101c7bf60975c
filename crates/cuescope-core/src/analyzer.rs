//! Analysis orchestration
//!
//! Runs one document through the compiler and turns whatever comes back into
//! an [`AnalysisResult`]:
//!
//! 1. reject any text containing `import`
//! 2. write the text to a fresh temp directory
//! 3. strict evaluation, raced against the timeout
//! 4. on success, graph the value
//! 5. on failure, classify stderr, then recover structure from a permissive
//!    evaluation or, failing that, from the raw text
//!
//! Both evaluations share one deadline. The permissive run only gets what
//! the strict run left over.
//!
//! Nothing inside an analysis escapes as an error. Every path produces a
//! result carrying the request id, and every failure at least one diagnostic.

use crate::error::EvalError;
use crate::evaluator::{EvalMode, EvalOutcome, Evaluator};
use crate::telemetry::{EVALUATIONS, TIMEOUTS};
use crate::types::AnalysisResult;
use cuescope_diagnostics::{parse_diagnostics, Diagnostic};
use cuescope_graph::{build_graph, build_graph_from_text, GraphNode};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info_span, warn, Instrument};

/// Message for rejected imports
pub const IMPORTS_NOT_ALLOWED: &str =
    "Imports are not allowed: remove import declarations and inline the definitions instead";

/// Drives the compiler through the validation and recovery sequence
#[derive(Debug)]
pub struct Analyzer<E> {
    evaluator: E,
    input_file: String,
}

impl<E: Evaluator> Analyzer<E> {
    /// Create analyzer writing each request to `input_file`
    #[inline]
    #[must_use]
    pub fn new(evaluator: E, input_file: impl Into<String>) -> Self {
        Self {
            evaluator,
            input_file: input_file.into(),
        }
    }

    /// Underlying evaluator
    #[inline]
    #[must_use]
    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Validate `text` and recover as much structure as possible
    pub async fn analyze(&self, text: &str, request_id: &str, timeout: Duration) -> AnalysisResult {
        let span = info_span!("analyze", request_id);
        async move {
            if text.contains("import") {
                debug!("rejecting input containing imports");
                return AnalysisResult::single(request_id, IMPORTS_NOT_ALLOWED);
            }

            match self.run(text, request_id, timeout).await {
                Ok(result) => result,
                Err(err) => {
                    error!(error = %err, "analysis failed");
                    AnalysisResult::single(request_id, format!("Internal error: {err}"))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        text: &str,
        request_id: &str,
        timeout: Duration,
    ) -> Result<AnalysisResult, EvalError> {
        let deadline = Instant::now() + timeout;
        let workdir = tempfile::Builder::new()
            .prefix("cuescope-")
            .tempdir()
            .map_err(|e| EvalError::temp_dir(std::env::temp_dir(), e))?;
        tokio::fs::write(workdir.path().join(&self.input_file), text)
            .await
            .map_err(|e| EvalError::temp_dir(workdir.path(), e))?;

        debug!(timeout_ms = timeout.as_millis(), "primary evaluation");
        let outcome = match self
            .evaluator
            .evaluate(EvalMode::Export, workdir.path(), &self.input_file, timeout)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                record(EvalMode::Export, "error");
                return Err(err);
            }
        };

        let output = match outcome {
            EvalOutcome::Completed(output) => output,
            EvalOutcome::TimedOut => {
                record(EvalMode::Export, "timeout");
                warn!(timeout_ms = timeout.as_millis(), "primary evaluation timed out");
                return Ok(AnalysisResult::single(
                    request_id,
                    format!("Evaluation timed out after {}ms", timeout.as_millis()),
                ));
            }
        };

        if output.success {
            record(EvalMode::Export, "success");
            let value: Value = serde_json::from_str(&output.stdout)?;
            let graph = build_graph(&value, &[]);
            return Ok(AnalysisResult::success(request_id, value, graph));
        }
        record(EvalMode::Export, "failure");

        let mut diagnostics = parse_diagnostics(&output.stderr);
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic::synthetic(format!(
                "Compiler failed with {} and reported no diagnostics",
                output.status_description()
            )));
        }
        debug!(count = diagnostics.len(), "primary evaluation failed");

        let graph = self.recover(workdir.path(), text, &diagnostics, deadline).await;
        let graph = (!graph.is_empty()).then_some(graph);
        Ok(AnalysisResult::recovered(request_id, diagnostics, graph))
    }

    /// Graph from the permissive value, else from the text
    async fn recover(
        &self,
        workdir: &Path,
        text: &str,
        diagnostics: &[Diagnostic],
        deadline: Instant,
    ) -> Vec<GraphNode> {
        if let Some(value) = self.secondary(workdir, deadline).await {
            let graph = build_graph(&value, diagnostics);
            if !graph.is_empty() {
                return graph;
            }
            debug!("secondary value has no top-level fields");
        }

        debug!("falling back to text scan");
        build_graph_from_text(text, diagnostics)
    }

    async fn secondary(&self, workdir: &Path, deadline: Instant) -> Option<Value> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        if timeout.is_zero() {
            record(EvalMode::Eval, "timeout");
            warn!("no time left for secondary evaluation");
            return None;
        }
        debug!(timeout_ms = timeout.as_millis(), "secondary evaluation");
        let outcome = self
            .evaluator
            .evaluate(EvalMode::Eval, workdir, &self.input_file, timeout)
            .await;

        match outcome {
            Ok(EvalOutcome::Completed(output)) if output.success => {
                match serde_json::from_str(&output.stdout) {
                    Ok(value) => {
                        record(EvalMode::Eval, "success");
                        Some(value)
                    }
                    Err(err) => {
                        record(EvalMode::Eval, "error");
                        debug!(error = %err, "secondary output is not JSON");
                        None
                    }
                }
            }
            Ok(EvalOutcome::Completed(output)) => {
                record(EvalMode::Eval, "failure");
                debug!(status = %output.status_description(), "secondary evaluation failed");
                None
            }
            Ok(EvalOutcome::TimedOut) => {
                record(EvalMode::Eval, "timeout");
                warn!(timeout_ms = timeout.as_millis(), "secondary evaluation timed out");
                None
            }
            Err(err) => {
                record(EvalMode::Eval, "error");
                warn!(error = %err, "secondary evaluation could not run");
                None
            }
        }
    }
}

fn record(mode: EvalMode, outcome: &'static str) {
    metrics::counter!(EVALUATIONS, "mode" => mode.as_str(), "outcome" => outcome).increment(1);
    if outcome == "timeout" {
        metrics::counter!(TIMEOUTS).increment(1);
    }
}

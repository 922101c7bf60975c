//! Compiler invocation
//!
//! [`Evaluator`] is the seam between the analyzer's state machine and the
//! external compiler. [`CueCli`] runs the real binary; tests substitute a
//! mock or a scripted fake.

use crate::config::CompilerConfig;
use crate::error::EvalError;
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Compiler invocation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Strict evaluation; requires fully concrete output
    Export,
    /// Permissive evaluation; tolerates incomplete values
    Eval,
}

impl EvalMode {
    /// Lowercase name used in logs and metric labels
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Eval => "eval",
        }
    }
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured result of a compiler run that exited on its own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOutput {
    /// Exit status was zero
    pub success: bool,
    /// Exit code, absent when terminated by a signal
    pub code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CompilerOutput {
    /// Successful run with the given stdout
    #[must_use]
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed run with the given exit code and stderr
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Exit status in words
    #[must_use]
    pub fn status_description(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

/// How a compiler run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    /// Process exited before the deadline
    Completed(CompilerOutput),
    /// Deadline won the race; the process was killed
    TimedOut,
}

/// Runs the compiler against one isolated input
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate `file` inside `workdir` in `mode`, giving up after `timeout`
    ///
    /// # Errors
    /// Returns [`EvalError`] when the process cannot be started or its
    /// output cannot be collected. Timeouts are an [`EvalOutcome`], not an
    /// error.
    async fn evaluate(
        &self,
        mode: EvalMode,
        workdir: &Path,
        file: &str,
        timeout: Duration,
    ) -> Result<EvalOutcome, EvalError>;
}

/// Subprocess-backed evaluator
#[derive(Debug, Clone)]
pub struct CueCli {
    config: CompilerConfig,
}

impl CueCli {
    /// Create evaluator from compiler settings
    #[inline]
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compiler settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn command(&self, mode: EvalMode, workdir: &Path, file: &str) -> Command {
        let args = match mode {
            EvalMode::Export => &self.config.export_args,
            EvalMode::Eval => &self.config.eval_args,
        };

        let mut cmd = Command::new(&self.config.program);
        cmd.args(args)
            .arg(file)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for CueCli {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

#[async_trait]
impl Evaluator for CueCli {
    async fn evaluate(
        &self,
        mode: EvalMode,
        workdir: &Path,
        file: &str,
        timeout: Duration,
    ) -> Result<EvalOutcome, EvalError> {
        let mut child = self
            .command(mode, workdir, file)
            .spawn()
            .map_err(|e| EvalError::spawn(&self.config.program, e))?;
        debug!(mode = %mode, pid = ?child.id(), "compiler started");

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());
        let readers = [stdout.abort_handle(), stderr.abort_handle()];

        // The deadline covers collecting output too: a grandchild can keep
        // the pipes open after the compiler itself has exited.
        tokio::select! {
            output = async {
                let status = child.wait().await?;
                Ok::<_, EvalError>(CompilerOutput {
                    success: status.success(),
                    code: status.code(),
                    stdout: collect(stdout).await?,
                    stderr: collect(stderr).await?,
                })
            } => Ok(EvalOutcome::Completed(output?)),
            () = tokio::time::sleep(timeout) => {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        debug!(mode = %mode, %status, "compiler exited but its output is still open");
                    }
                    _ => {
                        if let Err(err) = child.kill().await {
                            warn!(mode = %mode, error = %err, "failed to kill timed-out compiler");
                        }
                    }
                }
                for reader in &readers {
                    reader.abort();
                }
                Ok(EvalOutcome::TimedOut)
            }
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

async fn collect(handle: JoinHandle<std::io::Result<String>>) -> Result<String, EvalError> {
    handle.await.map_err(std::io::Error::other)?.map_err(EvalError::from)
}

//! Testing utilities for cuescope workspace
//!
//! Shared fixtures and a scriptable stand-in for the compiler binary.

#![allow(missing_docs)]

use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A clean document and the value the compiler would export for it
pub const CLEAN_DOC: &str = "name: \"web\"\nreplicas: 3\nserver: {\n\tport: 8080\n}\n";

pub fn clean_value() -> Value {
    serde_json::json!({"name": "web", "replicas": 3, "server": {"port": 8080}})
}

/// Document that only passes permissive evaluation
pub const INCOMPLETE_DOC: &str = "name: \"web\"\nreplicas: int\n";

pub const INCOMPLETE_STDERR: &str =
    "doc.cue:2:11: incomplete value for field replicas: int\n";

/// Document that cannot be parsed at all
pub const BROKEN_DOC: &str = "name: \"web\"\nserver: {\n\tport: 8080\n";

pub const BROKEN_STDERR: &str = "doc.cue:4:1: syntax error: expected '}', found EOF\n";

/// What the fake compiler does for one mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Print text on stdout and exit 0
    Succeed(String),
    /// Print text on stderr and exit with a code
    Fail { code: i32, stderr: String },
    /// Record the shell's pid in `<mode>.pid`, then sleep far past any
    /// test timeout under that same pid
    Hang,
}

impl Behavior {
    pub fn json(value: &Value) -> Self {
        Self::Succeed(value.to_string())
    }

    pub fn fail(stderr: impl Into<String>) -> Self {
        Self::Fail {
            code: 1,
            stderr: stderr.into(),
        }
    }

    fn script(&self, pid_file: &Path) -> String {
        match self {
            Self::Succeed(stdout) => format!("cat <<'CUESCOPE_EOF'\n{stdout}\nCUESCOPE_EOF\nexit 0\n"),
            Self::Fail { code, stderr } => {
                format!("cat >&2 <<'CUESCOPE_EOF'\n{stderr}\nCUESCOPE_EOF\nexit {code}\n")
            }
            Self::Hang => format!("echo $$ > '{}'\nexec sleep 30\n", pid_file.display()),
        }
    }
}

/// Builder for [`FakeCompiler`]
#[derive(Debug, Clone)]
pub struct FakeCompilerBuilder {
    export: Behavior,
    eval: Behavior,
}

impl FakeCompilerBuilder {
    pub fn export(mut self, behavior: Behavior) -> Self {
        self.export = behavior;
        self
    }

    pub fn eval(mut self, behavior: Behavior) -> Self {
        self.eval = behavior;
        self
    }

    /// Write the script into a fresh temp directory
    pub fn build(self) -> std::io::Result<FakeCompiler> {
        let dir = tempfile::Builder::new().prefix("fake-cue-").tempdir()?;
        let script = dir.path().join("fake-cue.sh");
        let calls = dir.path().join("calls.log");

        let mut body = String::from("#!/bin/sh\n");
        let _ = writeln!(body, "echo \"$1\" >> '{}'", calls.display());
        body.push_str("case \"$1\" in\nexport)\n");
        body.push_str(&self.export.script(&dir.path().join("export.pid")));
        body.push_str(";;\neval)\n");
        body.push_str(&self.eval.script(&dir.path().join("eval.pid")));
        body.push_str(";;\nesac\necho \"unknown mode $1\" >&2\nexit 64\n");

        std::fs::write(&script, body)?;
        Ok(FakeCompiler { dir, script, calls })
    }
}

/// Shell script standing in for the compiler
///
/// The script is run through `sh` rather than executed directly, so tests
/// never race a freshly written executable.
#[derive(Debug)]
pub struct FakeCompiler {
    dir: TempDir,
    script: PathBuf,
    calls: PathBuf,
}

impl FakeCompiler {
    pub fn builder() -> FakeCompilerBuilder {
        FakeCompilerBuilder {
            export: Behavior::Succeed("{}".to_string()),
            eval: Behavior::Succeed("{}".to_string()),
        }
    }

    /// Program to run
    pub fn program(&self) -> String {
        "sh".to_string()
    }

    /// Arguments for the strict mode; the input file is appended after them
    pub fn export_args(&self) -> Vec<String> {
        vec![self.script.display().to_string(), "export".to_string()]
    }

    /// Arguments for the permissive mode
    pub fn eval_args(&self) -> Vec<String> {
        vec![self.script.display().to_string(), "eval".to_string()]
    }

    /// Modes invoked so far, in order
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.calls)
            .map(|log| log.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Pid recorded by a hanging `mode` ("export" or "eval"), if it ran
    pub fn pid(&self, mode: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(format!("{mode}.pid")))
            .ok()
            .map(|pid| pid.trim().to_string())
    }

    /// Whether a recorded pid still names a live process
    pub fn is_alive(pid: &str) -> bool {
        std::process::Command::new("kill")
            .args(["-0", pid])
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

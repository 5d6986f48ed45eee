//! The optional pre-run build step.
//!
//! Runs `<tool> build -o <output> <target>` synchronously and captures its
//! output. A failing build ends the run before any server is launched.

use miette::Diagnostic;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the build step.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// The build tool could not be started.
    #[error("failed to run build tool '{tool}': {source}")]
    #[diagnostic(
        code(mcpcheck::build::spawn),
        help("Is the build tool installed and on PATH?")
    )]
    Spawn {
        /// The tool that was invoked.
        tool: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The build tool ran and reported failure.
    #[error("build failed ({status})\n{stderr}")]
    #[diagnostic(code(mcpcheck::build::failed))]
    Failed {
        /// Exit status of the tool.
        status: ExitStatus,
        /// What the tool wrote to stderr.
        stderr: String,
    },
}

/// One invocation of the build tool.
#[derive(Debug, Clone)]
pub struct BuildStep {
    tool: String,
    target: String,
    output: PathBuf,
    dir: Option<PathBuf>,
}

impl BuildStep {
    /// Build `target` with `tool`, writing the executable to `output`.
    pub fn new(
        tool: impl Into<String>,
        target: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.into(),
            target: target.into(),
            output: output.into(),
            dir: None,
        }
    }

    /// Run the tool in `dir` instead of the current directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// The build tool.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Where the executable is written.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Arguments passed to the tool.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "build".into(),
            "-o".into(),
            self.output.clone().into_os_string(),
            self.target.clone().into(),
        ]
    }

    /// Run the build and wait for it.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be started or exits unsuccessfully.
    pub fn run(&self) -> Result<(), BuildError> {
        info!(
            tool = %self.tool,
            target = %self.target,
            output = %self.output.display(),
            "building server"
        );

        let mut command = Command::new(&self.tool);
        command.args(self.args());
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|source| BuildError::Spawn {
            tool: self.tool.clone(),
            source,
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        if !output.status.success() {
            return Err(BuildError::Failed {
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            debug!(target: "mcpcheck::build", "{stderr}");
        }
        info!("build succeeded");
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("build-tool.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_successful_build_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(
            dir.path(),
            r#"[ "$1" = build ] && [ "$2" = -o ] && touch "$3""#,
        );
        let output = dir.path().join("server");

        BuildStep::new(tool.to_string_lossy(), "./cmd/server", &output)
            .run()
            .unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_failed_build_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "echo \"cannot build $4\" >&2\nexit 2");

        let err = BuildStep::new(tool.to_string_lossy(), "./cmd/server", "server")
            .current_dir(dir.path())
            .run()
            .unwrap_err();
        match err {
            BuildError::Failed { status, stderr } => {
                assert_eq!(status.code(), Some(2));
                assert_eq!(stderr, "cannot build ./cmd/server");
            }
            other => panic!("expected build failure, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_tool() {
        let err = BuildStep::new("/nonexistent/build-tool", "t", "o").run().unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }
}

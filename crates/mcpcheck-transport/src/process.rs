//! Lifecycle of the server process under test.
//!
//! [`ServerProcess`] owns the child and its three redirected streams. stdin
//! and stdout form the protocol channel; stderr is drained in the background
//! into the log and a bounded tail kept for diagnostics.
//!
//! # Example
//!
//! ```no_run
//! use mcpcheck_transport::process::ServerProcess;
//!
//! # async fn example() -> Result<(), mcpcheck_transport::TransportError> {
//! let mut server = ServerProcess::builder("./gemara-mcp-server")
//!     .env("LOG_LEVEL", "debug")
//!     .spawn()
//!     .await?;
//!
//! // ... exchange frames ...
//!
//! server.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Teardown
//!
//! [`ServerProcess::stop`] closes stdin and gives the server a quarter of the
//! shutdown timeout to exit on its own. After that it sends SIGTERM on unix,
//! waits out the rest of the timeout and then kills. It never fails and may be called any
//! number of times. The child is also spawned with `kill_on_drop`, so a
//! process that is dropped without being stopped is killed rather than
//! orphaned.

use crate::error::TransportError;
use crate::stdio::LineChannel;
use crate::traits::Transport;
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long a server gets to exit after being asked to.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of stderr lines kept for diagnostics.
pub const STDERR_TAIL_LINES: usize = 50;

type ServerChannel = LineChannel<BufReader<ChildStdout>, ChildStdin>;
type StderrTail = Arc<Mutex<VecDeque<String>>>;

/// A server process connected through its standard streams.
#[derive(Debug)]
pub struct ServerProcess {
    channel: Option<ServerChannel>,
    child: Option<Child>,
    stderr_tail: StderrTail,
    stderr_task: Option<JoinHandle<()>>,
    exit_status: Option<ExitStatus>,
    shutdown_timeout: Duration,
    command: String,
}

impl ServerProcess {
    /// Create a builder for the given program.
    #[must_use]
    pub fn builder<S: AsRef<OsStr>>(program: S) -> ServerProcessBuilder {
        ServerProcessBuilder::new(program)
    }

    /// Get the process ID, or `None` once the process has been reaped.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Check if the child process is still running.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// The last lines the server wrote to stderr, oldest first.
    #[must_use]
    pub fn stderr_tail(&self) -> Vec<String> {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stop the process: close stdin, let it exit on EOF, ask it to
    /// terminate, then kill it once the shutdown timeout is spent.
    ///
    /// Safe to call repeatedly and on a process that already exited. Never
    /// fails; problems are logged. Returns the exit status if one could be
    /// collected.
    pub async fn stop(&mut self) -> Option<ExitStatus> {
        // Dropping the channel closes stdin.
        self.channel = None;

        let Some(mut child) = self.child.take() else {
            return self.exit_status;
        };

        // A quarter of the shutdown timeout to exit on EOF, the rest after
        // SIGTERM.
        let eof_grace = self.shutdown_timeout / 4;
        let status = match tokio::time::timeout(eof_grace, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            _ => {
                debug!(grace = ?eof_grace, "server still running after stdin closed");
                request_terminate(&child);
                let remaining = self.shutdown_timeout.saturating_sub(eof_grace);
                match tokio::time::timeout(remaining, child.wait()).await {
                    Ok(Ok(status)) => Some(status),
                    Ok(Err(e)) => {
                        warn!(error = %e, "failed waiting for server exit, killing");
                        force_kill(&mut child).await
                    }
                    Err(_) => {
                        warn!(
                            timeout = ?self.shutdown_timeout,
                            "server did not exit in time, killing"
                        );
                        force_kill(&mut child).await
                    }
                }
            }
        };

        if let Some(mut task) = self.stderr_task.take() {
            // stderr reaches EOF once the child is gone; give the drain a
            // moment to flush the last lines into the tail.
            if tokio::time::timeout(Duration::from_millis(250), &mut task)
                .await
                .is_err()
            {
                debug!("stderr drain did not finish, abandoning it");
                task.abort();
            }
        }

        match status {
            Some(status) => info!(command = %self.command, %status, "server stopped"),
            None => warn!(command = %self.command, "server stopped without an exit status"),
        }
        self.exit_status = status;
        status
    }
}

#[cfg(unix)]
fn request_terminate(child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let target = Pid::from_raw(pid as i32);
        if let Err(e) = kill(target, Signal::SIGTERM) {
            debug!(pid, error = %e, "SIGTERM failed");
        }
    }
}

#[cfg(not(unix))]
fn request_terminate(_child: &Child) {
    // Closing stdin is the only polite request available here.
}

async fn force_kill(child: &mut Child) -> Option<ExitStatus> {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill server");
    }
    match child.try_wait() {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, "failed to collect server exit status");
            None
        }
    }
}

fn drain_stderr(stderr: ChildStderr, tail: StderrTail) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    debug!(target: "mcpcheck::server_stderr", "{line}");
                    if let Ok(mut tail) = tail.lock() {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
                Err(e) => {
                    debug!(error = %e, "stderr read failed");
                    break;
                }
            }
        }
    })
}

impl Transport for ServerProcess {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        match self.channel.as_mut() {
            Some(channel) => channel.send_frame(frame).await,
            None => Err(TransportError::NotConnected),
        }
    }

    async fn recv_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.channel.as_mut() {
            Some(channel) => channel.recv_frame().await,
            None => Err(TransportError::NotConnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.channel.as_ref().is_some_and(Transport::is_connected)
    }
}

/// Builder for [`ServerProcess`].
///
/// # Example
///
/// ```no_run
/// use mcpcheck_transport::process::ServerProcessBuilder;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), mcpcheck_transport::TransportError> {
/// let server = ServerProcessBuilder::new("./gemara-mcp-server")
///     .working_dir("/srv/gemara")
///     .shutdown_timeout(Duration::from_secs(2))
///     .spawn()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ServerProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
    shutdown_timeout: Duration,
}

impl ServerProcessBuilder {
    /// Create a new builder for the given program.
    #[must_use]
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: PathBuf::from(program.as_ref()),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg<S: AsRef<str>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Set an environment variable.
    #[must_use]
    pub fn env<K: AsRef<str>, V: AsRef<str>>(mut self, key: K, value: V) -> Self {
        self.envs
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Set several environment variables.
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.envs.extend(
            vars.into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        self
    }

    /// Set the working directory for the child process.
    #[must_use]
    pub fn working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set how long [`ServerProcess::stop`] waits before killing.
    #[must_use]
    pub const fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The program this builder launches.
    #[must_use]
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Spawn the process with all three streams piped.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Launch`] if the process could not be started.
    pub async fn spawn(self) -> Result<ServerProcess, TransportError> {
        let mut command = tokio::process::Command::new(&self.program);

        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.envs {
            command.env(key, value);
        }

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let program = self.program.display().to_string();
        let mut child = command.spawn().map_err(|source| TransportError::Launch {
            program: program.clone(),
            source,
        })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            // Unreachable with piped stdio, but never leave the child behind.
            let _ = child.kill().await;
            return Err(TransportError::Launch {
                program,
                source: std::io::Error::other("failed to capture child stdio"),
            });
        };

        let command_str = if self.args.is_empty() {
            program
        } else {
            format!("{} {}", program, self.args.join(" "))
        };

        let pid = child.id();
        info!(command = %command_str, ?pid, "server started");

        let stderr_tail = StderrTail::default();
        let stderr_task = drain_stderr(stderr, Arc::clone(&stderr_tail));

        Ok(ServerProcess {
            channel: Some(LineChannel::new(BufReader::new(stdout), stdin)),
            child: Some(child),
            stderr_tail,
            stderr_task: Some(stderr_task),
            exit_status: None,
            shutdown_timeout: self.shutdown_timeout,
            command: command_str,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_builder_construction() {
        let builder = ServerProcessBuilder::new("server")
            .arg("--flag")
            .args(["a", "b"])
            .env("MODE", "silent")
            .envs([("A", "1")])
            .working_dir("/tmp")
            .shutdown_timeout(Duration::from_millis(10));

        assert_eq!(builder.program.to_string_lossy(), "server");
        assert_eq!(builder.args, vec!["--flag", "a", "b"]);
        assert_eq!(
            builder.envs,
            vec![
                ("MODE".to_string(), "silent".to_string()),
                ("A".to_string(), "1".to_string())
            ]
        );
        assert_eq!(builder.current_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(builder.shutdown_timeout, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_spawn_nonexistent_program() {
        let result = ServerProcess::builder("./nonexistent-server-12345").spawn().await;
        match result {
            Err(TransportError::Launch { program, .. }) => {
                assert_eq!(program, "./nonexistent-server-12345");
            }
            other => panic!("expected launch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cat_echoes_frames_and_stops_on_eof() {
        let mut server = ServerProcess::builder("cat").spawn().await.unwrap();
        assert!(server.is_running());
        assert!(server.pid().is_some());

        server.send_frame(b"hello").await.unwrap();
        assert_eq!(server.recv_frame().await.unwrap(), Some(b"hello".to_vec()));

        let status = server.stop().await;
        assert!(status.is_some());
        assert!(!server.is_running());
        assert!(!server.is_connected());
        assert!(matches!(
            server.send_frame(b"late").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_server_exiting_on_eof_is_not_signalled() {
        use std::os::unix::process::ExitStatusExt;

        let mut server = ServerProcess::builder("cat").spawn().await.unwrap();
        let status = server.stop().await.unwrap();
        assert!(status.success());
        assert_eq!(status.signal(), None);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut server = ServerProcess::builder("cat").spawn().await.unwrap();
        let first = server.stop().await;
        let second = server.stop().await;
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stop_kills_a_process_that_ignores_requests() {
        // `sleep` ignores stdin; SIGTERM ends it, which is enough here. The
        // forced path is covered by the mock server's ignore-term mode.
        let mut server = ServerProcess::builder("sleep")
            .arg("30")
            .shutdown_timeout(Duration::from_millis(200))
            .spawn()
            .await
            .unwrap();
        let started = std::time::Instant::now();
        server.stop().await;
        assert!(!server.is_running());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_stderr_is_captured() {
        let mut server = ServerProcess::builder("sh")
            .args(["-c", "echo starting >&2; echo ready >&2"])
            .spawn()
            .await
            .unwrap();
        assert_eq!(server.recv_frame().await.unwrap(), None);
        server.stop().await;
        assert_eq!(server.stderr_tail(), vec!["starting", "ready"]);
    }
}

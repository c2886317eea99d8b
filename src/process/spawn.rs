//! Process spawning and lifecycle management.

use std::fs::OpenOptions;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::io::ProcessWriter;
use super::{Received, Transport};
use crate::config::{SessionConfig, StderrSink};
use crate::stream::{spawn_reader, Frame};
use crate::{Error, Result};

/// How long `close` waits for the child and the reader task.
pub const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// A running coqtop process with its background reader.
///
/// # Cancellation
///
/// Dropping a `CoqProcess` kills the subprocess if it's still running.
pub struct CoqProcess {
    child: Child,
    writer: ProcessWriter,
    frames: mpsc::UnboundedReceiver<Frame>,
    reader_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl CoqProcess {
    /// Spawn coqtop and start its background reader.
    ///
    /// The child gets its own process group so that an interrupt aimed at
    /// the editor does not reach it.
    pub async fn spawn(config: &SessionConfig) -> Result<Self> {
        let mut cmd = build_command(config)?;
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ProverNotFound {
                    searched: config.coqtop_command(),
                }
            } else {
                Error::ProcessSpawn(e)
            }
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.start_kill();
            return Err(Error::ProcessSpawn(std::io::Error::other(
                "coqtop pipes were not captured",
            )));
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let reader_task = spawn_reader(stdout, config.framing(), tx);

        tracing::info!(
            pid = ?child.id(),
            command = %config.coqtop_command(),
            framing = %config.framing(),
            "coqtop started"
        );

        Ok(Self {
            child,
            writer: ProcessWriter::new(stdin),
            frames: rx,
            reader_task: Some(reader_task),
            closed: false,
        })
    }

    /// Get the process ID of the running prover.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process is still running.
    pub fn is_running(&self) -> bool {
        !self.closed && self.child.id().is_some()
    }

    /// Write raw bytes to the prover.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::NotRunning);
        }
        self.writer.write(bytes).await
    }

    /// Wait up to `timeout` for the next frame.
    pub async fn try_receive(&mut self, timeout: Duration) -> Received {
        match tokio::time::timeout(timeout, self.frames.recv()).await {
            Ok(Some(frame)) => Received::Frame(frame),
            Ok(None) => Received::Closed,
            Err(_) => Received::Empty,
        }
    }

    /// Terminate the prover and wait for the reader to finish.
    ///
    /// Safe to call on an exited process and more than once; errors are
    /// logged and swallowed.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.writer.shutdown().await;
        if let Err(err) = self.child.start_kill() {
            tracing::debug!(error = %err, "coqtop already exited");
        }
        match tokio::time::timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => tracing::info!(%status, "coqtop stopped"),
            Ok(Err(err)) => tracing::debug!(error = %err, "waiting for coqtop failed"),
            Err(_) => tracing::warn!("coqtop did not exit in time"),
        }

        if let Some(mut task) = self.reader_task.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                tracing::warn!("reader task did not observe end of stream; aborting it");
                task.abort();
            }
        }
        self.frames.close();
    }
}

impl Transport for CoqProcess {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        CoqProcess::write(self, bytes).await
    }

    async fn try_receive(&mut self, timeout: Duration) -> Received {
        CoqProcess::try_receive(self, timeout).await
    }

    async fn close(&mut self) {
        CoqProcess::close(self).await
    }
}

impl Drop for CoqProcess {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        let _ = self.child.start_kill();
    }
}

/// Build a tokio Command from the config.
fn build_command(config: &SessionConfig) -> Result<Command> {
    let mut cmd = Command::new(config.coqtop_command());
    cmd.args(config.command_args());

    if let Some(dir) = config.working_directory() {
        cmd.current_dir(dir);
    }
    if !config.inherit_env {
        cmd.env_clear();
    }
    for (key, value) in &config.env_vars {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(stderr_stdio(config.stderr())?);
    cmd.kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    Ok(cmd)
}

fn stderr_stdio(sink: &StderrSink) -> Result<Stdio> {
    Ok(match sink {
        StderrSink::Null => Stdio::null(),
        StderrSink::Inherit => Stdio::inherit(),
        StderrSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(Error::io)?;
            Stdio::from(file)
        }
    })
}

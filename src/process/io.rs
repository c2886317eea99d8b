//! I/O primitives for communicating with the coqtop subprocess.

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;

use crate::{Error, Result};

/// Writes calls to the prover's stdin.
pub struct ProcessWriter {
    stdin: Option<ChildStdin>,
}

impl ProcessWriter {
    /// Create a new writer from a child process stdin.
    pub fn new(stdin: ChildStdin) -> Self {
        Self { stdin: Some(stdin) }
    }

    /// Write and flush `bytes`.
    ///
    /// A broken pipe means the prover exited and is reported as a lost
    /// session.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::session_lost("coqtop stdin is closed"))?;
        stdin.write_all(bytes).await.map_err(map_write_error)?;
        stdin.flush().await.map_err(map_write_error)
    }

    /// Close stdin. Closing twice is a no-op.
    pub async fn shutdown(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(err) = stdin.shutdown().await {
                tracing::debug!(error = %err, "closing coqtop stdin failed");
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.stdin.is_some()
    }
}

fn map_write_error(err: std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::BrokenPipe => Error::session_lost("the Coq process died"),
        _ => Error::io(err),
    }
}

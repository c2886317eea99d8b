//! Type-safe configuration options for a coqtop session.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reference per-call timeout: the longest wait between two prover replies.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Timeouts shorter than this have proven unreliable against a busy prover.
pub const MIN_RELIABLE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Default prover executable.
pub const DEFAULT_COQTOP: &str = "coqtop";

/// Environment variable consulted for the prover executable.
pub const ENV_COQTOP: &str = "COQTOP";

/// How the background reader cuts the prover's stdout into frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FramingStrategy {
    /// Incremental parse with depth tracking; a frame is emitted as soon as
    /// a top-level element closes.
    #[default]
    Streaming,
    /// Read one byte at a time and retry a full-document parse of the
    /// accumulated bytes whenever an element could have closed.
    ByteWise,
    /// Forward raw lines; the protocol client does the XML splitting.
    Lines,
}

impl fmt::Display for FramingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingStrategy::Streaming => write!(f, "streaming"),
            FramingStrategy::ByteWise => write!(f, "byte_wise"),
            FramingStrategy::Lines => write!(f, "lines"),
        }
    }
}

/// Where the prover's stderr goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StderrSink {
    /// Discard stderr.
    #[default]
    Null,
    /// Share the parent's stderr.
    Inherit,
    /// Append to a log file, created if missing.
    File(PathBuf),
}

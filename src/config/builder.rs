//! Session configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use libcoqtop::config::{FramingStrategy, SessionConfig, StderrSink};
//!
//! let config = SessionConfig::builder()
//!     .coqtop_path("/usr/bin/coqtop")
//!     .args(["-R", "theories", "MyLib"])
//!     .stderr(StderrSink::File("/tmp/coqtop.log".into()))
//!     .framing(FramingStrategy::Streaming)
//!     .timeout(Duration::from_secs(3))
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::options::{
    FramingStrategy, StderrSink, DEFAULT_COQTOP, DEFAULT_TIMEOUT, ENV_COQTOP, MIN_RELIABLE_TIMEOUT,
};
use crate::{Error, Result};

/// Configuration for a coqtop session.
///
/// Use [`SessionConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    // Prover invocation
    pub(crate) coqtop_path: Option<PathBuf>,
    pub(crate) args: Vec<String>,
    pub(crate) debug: bool,

    // Protocol
    pub(crate) timeout: Duration,
    pub(crate) framing: FramingStrategy,

    // Process options
    pub(crate) stderr: StderrSink,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,
}

impl SessionConfig {
    /// Create a new builder for SessionConfig.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Get the per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the framing strategy of the background reader.
    pub fn framing(&self) -> FramingStrategy {
        self.framing
    }

    /// Get the stderr sink.
    pub fn stderr(&self) -> &StderrSink {
        &self.stderr
    }

    /// Get the working directory if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }

    /// Get the extra prover arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            coqtop_path: None,
            args: Vec::new(),
            debug: false,
            timeout: DEFAULT_TIMEOUT,
            framing: FramingStrategy::default(),
            stderr: StderrSink::default(),
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true,
        }
    }
}

/// Builder for [`SessionConfig`].
///
/// Validation happens in [`build()`](SessionConfigBuilder::build); the prover
/// binary itself is only looked up at spawn time.
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    coqtop_path: Option<PathBuf>,
    args: Vec<String>,
    debug: bool,
    timeout: Duration,
    framing: FramingStrategy,
    stderr: StderrSink,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    inherit_env: bool,
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self {
            coqtop_path: None,
            args: Vec::new(),
            debug: false,
            timeout: DEFAULT_TIMEOUT,
            framing: FramingStrategy::default(),
            stderr: StderrSink::default(),
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true, // Default: inherit parent environment
        }
    }
}

impl SessionConfigBuilder {
    // -------------------------------------------------------------------------
    // Prover invocation
    // -------------------------------------------------------------------------

    /// Path to the coqtop binary (default: `$COQTOP`, then "coqtop" from PATH).
    pub fn coqtop_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.coqtop_path = Some(path.into());
        self
    }

    /// Extra arguments passed after `-ideslave`.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Append one extra argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Ask the prover for debug output (`-debug`).
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    // -------------------------------------------------------------------------
    // Protocol
    // -------------------------------------------------------------------------

    /// Maximum wait for the reply to a single call.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// How prover output is cut into frames.
    pub fn framing(mut self, framing: FramingStrategy) -> Self {
        self.framing = framing;
        self
    }

    // -------------------------------------------------------------------------
    // Process options
    // -------------------------------------------------------------------------

    /// Where the prover's stderr goes.
    pub fn stderr(mut self, sink: StderrSink) -> Self {
        self.stderr = sink;
        self
    }

    /// Working directory for the coqtop process.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// Add/override environment variable for subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Don't inherit parent environment (default: inherit).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - The timeout is non-zero (short timeouts only produce a warning)
    /// - The working directory exists if set
    pub fn build(self) -> Result<SessionConfig> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be positive".into()));
        }
        if self.timeout < MIN_RELIABLE_TIMEOUT {
            tracing::warn!(
                timeout = ?self.timeout,
                minimum = ?MIN_RELIABLE_TIMEOUT,
                "timeout is below the reliable minimum; replies may be reported as timed out"
            );
        }

        if let Some(ref dir) = self.working_directory {
            if !dir.exists() {
                return Err(Error::InvalidConfig(format!(
                    "working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(SessionConfig {
            coqtop_path: self.coqtop_path,
            args: self.args,
            debug: self.debug,
            timeout: self.timeout,
            framing: self.framing,
            stderr: self.stderr,
            working_directory: self.working_directory,
            env_vars: self.env_vars,
            inherit_env: self.inherit_env,
        })
    }
}

impl SessionConfig {
    /// Get the prover command: explicit path, then `$COQTOP`, then "coqtop".
    pub(crate) fn coqtop_command(&self) -> String {
        if let Some(path) = self.coqtop_path.as_ref() {
            return path.display().to_string();
        }
        std::env::var(ENV_COQTOP)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_COQTOP.to_string())
    }

    /// Full argument list handed to the prover.
    pub(crate) fn command_args(&self) -> Vec<String> {
        let mut args = vec!["-ideslave".to_string()];
        if self.debug {
            args.push("-debug".to_string());
        }
        args.extend(self.args.iter().cloned());
        args
    }
}

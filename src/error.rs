/// Errors that can occur when driving a coqtop session.
///
/// Errors are organized by category:
/// - Configuration errors: detected at `build()` time
/// - Spawn errors: failed to start the prover process
/// - IO errors: communication failures with the subprocess
/// - XML errors: malformed documents handed to the parser helpers
/// - Session errors: the prover is gone and must be relaunched
///
/// Timeouts, rejected sentences, unknown frames and undecodable goals are
/// not errors: they come back as values from the client and session APIs.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Configuration errors (detected at build() time)
    // -------------------------------------------------------------------------
    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// The prover binary was not found.
    #[error("coqtop not found (searched: {searched})")]
    ProverNotFound { searched: String },

    /// Failed to spawn the prover subprocess.
    #[error("failed to spawn coqtop process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // IO errors
    // -------------------------------------------------------------------------
    /// IO error communicating with the prover subprocess.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // XML errors
    // -------------------------------------------------------------------------
    /// A document could not be parsed into an element tree.
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    // -------------------------------------------------------------------------
    // Session errors
    // -------------------------------------------------------------------------
    /// The prover process died, closed its pipes, or answered a call in a
    /// way that leaves the session unusable.
    #[error("coqtop session lost: {reason}")]
    SessionLost { reason: String },

    /// No prover is running for this session.
    #[error("coqtop is not running")]
    NotRunning,
}

/// Failure to turn a string into XML elements.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum XmlError {
    /// The underlying parser rejected the input.
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),

    /// The input ended with open elements.
    #[error("unexpected end of input inside <{open}>")]
    Incomplete { open: String },

    /// The input held no element at all.
    #[error("no element found")]
    NoElement,

    /// A second element or stray text outside the root element.
    #[error("content outside the root element")]
    TrailingContent,
}

/// A specialized Result type for libcoqtop operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Create a session-lost error.
    pub fn session_lost(reason: impl Into<String>) -> Self {
        Self::SessionLost {
            reason: reason.into(),
        }
    }

    /// Check if this error ends the session.
    ///
    /// A fatal error means the caller has to relaunch the prover; there is
    /// no automatic restart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::SessionLost { .. } | Error::NotRunning)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

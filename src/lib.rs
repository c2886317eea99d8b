//! # libcoqtop
//!
//! Async Rust driver for `coqtop -ideslave`.
//!
//! This library keeps an editor buffer and a Coq prover in step:
//! - Framing of the prover's unwrapped XML output into complete elements
//! - Typed protocol calls (`interp`, `rewind`, `goal`) with timeouts
//! - Sentence detection that understands nested comments, strings and bullets
//! - Tracking of the accepted prefix, with rewinds on edits
//!
//! ## Quick Start
//!
//! ```ignore
//! use libcoqtop::document::{Position, TextDocument};
//! use libcoqtop::{Result, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut session = Session::launch(&SessionConfig::builder().build()?).await?;
//!     let doc = TextDocument::new("Goal True. exact I. Qed.");
//!     let report = session.advance_to_cursor(&doc, Position::new(0, 24)).await?;
//!     for message in &report.messages {
//!         println!("{message}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Talking to the prover directly
//!
//! ```ignore
//! use libcoqtop::{CoqtopClient, SessionConfig};
//!
//! let mut client = CoqtopClient::launch(&SessionConfig::builder().build()?).await?;
//! let goals = client.goals().await?;
//! println!("{}", goals.value.render());
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! use std::time::Duration;
//! use libcoqtop::{FramingStrategy, SessionConfig, StderrSink};
//!
//! let config = SessionConfig::builder()
//!     .coqtop_path("/opt/coq/bin/coqtop")
//!     .arg("-R").arg("theories").arg("Lib")
//!     .timeout(Duration::from_secs(5))
//!     .framing(FramingStrategy::Streaming)
//!     .stderr(StderrSink::File("/tmp/coqtop.log".into()))
//!     .build()?;
//! ```

mod client;
pub mod config;
pub mod document;
mod error;
pub mod observer;
pub mod process;
pub mod protocol;
pub mod scanner;
mod session;
pub mod stream;

pub use error::{Error, Result, XmlError};

// Re-export the main driver types at crate root
pub use client::{Answer, CoqtopClient};
pub use session::{Rejection, Session, SubmitReport};

// Re-export commonly used config types at crate root
pub use config::{FramingStrategy, SessionConfig, SessionConfigBuilder, StderrSink};

// Re-export commonly used document types at crate root
pub use document::{DocumentView, Position, Range, TextDocument};

// Re-export commonly used protocol types at crate root
pub use protocol::{Call, Element, Goal, Goals, Interpretation, Message, MessageLevel, Reply};

// Re-export commonly used process types at crate root
pub use process::{CoqProcess, Received, Transport};

// Re-export observer types at crate root
pub use observer::{LogLevel, LoggingObserver, NoopObserver, SessionObserver, SyncState};

// Re-export commonly used stream types at crate root
pub use stream::{Frame, FrameSource};

//! Configuration for a coqtop session.
//!
//! This module provides:
//!
//! - [`SessionConfig`] and [`SessionConfigBuilder`] for configuring a session
//! - Type-safe options like [`FramingStrategy`] and [`StderrSink`]
//! - Timeout constants ([`DEFAULT_TIMEOUT`], [`MIN_RELIABLE_TIMEOUT`])
//!
//! # Example
//!
//! ```ignore
//! use libcoqtop::config::{SessionConfig, StderrSink};
//!
//! let config = SessionConfig::builder()
//!     .coqtop_path("hoqtop")
//!     .stderr(StderrSink::File("/tmp/coqtop.log".into()))
//!     .build()?;
//! ```

pub mod builder;
pub mod options;

pub use builder::{SessionConfig, SessionConfigBuilder};
pub use options::{
    FramingStrategy, StderrSink, DEFAULT_COQTOP, DEFAULT_TIMEOUT, ENV_COQTOP, MIN_RELIABLE_TIMEOUT,
};

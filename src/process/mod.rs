//! Process management for coqtop.
//!
//! This module spawns the prover and carries bytes to and from it. A single
//! background task reads the prover's stdout, frames it and pushes frames
//! onto a channel; the caller writes calls and pulls frames with a timeout.
//!
//! # Architecture
//!
//! ```text
//! libcoqtop                                    coqtop -ideslave
//! ┌────────────┐                               ┌──────────────┐
//! │ CoqProcess │──stdin (<call>)──────────────▶│              │
//! │            │◀─channel◀─reader task◀─stdout─│              │
//! └────────────┘              stderr ─▶ sink ◀─│              │
//!                                              └──────────────┘
//! ```
//!
//! The protocol client is generic over [`Transport`], so it can run against
//! something other than a real process.

mod io;
mod spawn;

use std::future::Future;
use std::time::Duration;

use crate::stream::Frame;
use crate::Result;

pub use io::ProcessWriter;
pub use spawn::{CoqProcess, CLOSE_GRACE};

/// Outcome of waiting for a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// The next frame.
    Frame(Frame),
    /// Nothing arrived within the timeout.
    Empty,
    /// The output stream ended; no more frames will come.
    Closed,
}

/// Byte transport to a prover.
pub trait Transport: Send {
    /// Write bytes without waiting for any reply.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for the next frame.
    fn try_receive(&mut self, timeout: Duration) -> impl Future<Output = Received> + Send;

    /// Tear the transport down. Must be idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

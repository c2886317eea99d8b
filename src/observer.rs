//! Session observer trait and implementations.
//!
//! The session reports what an editor needs to repaint and what it needs
//! to tell the user through [`SessionObserver`]. Observation only: nothing
//! an observer does feeds back into the session.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use libcoqtop::{Session, SessionObserver, SyncState};
//!
//! struct Repaint;
//!
//! impl SessionObserver for Repaint {
//!     fn on_state_changed(&self, state: &SyncState) {
//!         println!("checked up to {:?}", state.accepted_upto);
//!     }
//! }
//!
//! let session = Session::launch(&config).await?.with_observer(Arc::new(Repaint));
//! ```

use serde::{Deserialize, Serialize};

use crate::document::{Position, Range};
use crate::protocol::Message;

/// Snapshot of the synchronized region, for repainting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// End of the accepted prefix, if anything is accepted.
    pub accepted_upto: Option<Position>,
    /// Chunks queued but not yet answered, as one span.
    ///
    /// Notifications are sent once a batch has finished, when the queue is
    /// empty again, so observers always see `None` here.
    pub pending: Option<Range>,
    /// The offending part of the last rejected chunk.
    pub error: Option<Range>,
}

/// Observer for session events.
///
/// # Implementation Notes
///
/// - Called synchronously from the session's call context; keep it cheap.
/// - Methods have default empty implementations for selective observation.
/// - One state notification and one message delivery are made per batch,
///   never one per chunk.
pub trait SessionObserver: Send + Sync {
    /// The accepted, pending or error region changed.
    fn on_state_changed(&self, state: &SyncState) {
        let _ = state;
    }

    /// Messages produced by a batch of calls, in arrival order.
    fn on_messages(&self, messages: &[Message]) {
        let _ = messages;
    }

    /// The prover is gone. The session has been reset and must be
    /// relaunched explicitly.
    fn on_fatal(&self, reason: &str) {
        let _ = reason;
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Simple logging observer that logs session events using tracing.
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver {
    level: LogLevel,
}

/// Log level for LoggingObserver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at trace level.
    Trace,
    /// Log at debug level (default).
    #[default]
    Debug,
    /// Log at info level.
    Info,
}

impl LoggingObserver {
    /// Create a new logging observer with debug level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging observer with a specific level.
    pub fn with_level(level: LogLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl SessionObserver for LoggingObserver {
    fn on_state_changed(&self, state: &SyncState) {
        let accepted = state.accepted_upto.map(|p| p.to_string());
        let pending = state.pending.map(|r| r.to_string());
        let error = state.error.map(|r| r.to_string());
        match self.level {
            LogLevel::Trace => {
                tracing::trace!(?accepted, ?pending, ?error, "sync state");
            }
            LogLevel::Debug => {
                tracing::debug!(?accepted, ?pending, ?error, "sync state");
            }
            LogLevel::Info => {
                tracing::info!(?accepted, ?pending, ?error, "sync state");
            }
        }
    }

    fn on_messages(&self, messages: &[Message]) {
        for message in messages {
            let level = message.level.as_str();
            match self.level {
                LogLevel::Trace => tracing::trace!(level, text = %message.text, "coqtop message"),
                LogLevel::Debug => tracing::debug!(level, text = %message.text, "coqtop message"),
                LogLevel::Info => tracing::info!(level, text = %message.text, "coqtop message"),
            }
        }
    }

    fn on_fatal(&self, reason: &str) {
        tracing::error!(reason, "coqtop session lost");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn session_observer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SessionObserver>();
        assert_send_sync::<LoggingObserver>();
        assert_send_sync::<NoopObserver>();
    }

    #[derive(Default)]
    struct CountingObserver {
        states: AtomicUsize,
        messages: AtomicUsize,
        fatals: AtomicUsize,
    }

    impl SessionObserver for CountingObserver {
        fn on_state_changed(&self, _state: &SyncState) {
            self.states.fetch_add(1, Ordering::Relaxed);
        }

        fn on_messages(&self, messages: &[Message]) {
            self.messages.fetch_add(messages.len(), Ordering::Relaxed);
        }

        fn on_fatal(&self, _reason: &str) {
            self.fatals.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn counting_observer_tracks_calls() {
        let observer = CountingObserver::default();
        observer.on_state_changed(&SyncState::default());
        observer.on_messages(&[
            Message::new(MessageLevel::Info, "a"),
            Message::new(MessageLevel::Error, "b"),
        ]);
        observer.on_fatal("gone");

        assert_eq!(observer.states.load(Ordering::Relaxed), 1);
        assert_eq!(observer.messages.load(Ordering::Relaxed), 2);
        assert_eq!(observer.fatals.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn default_trait_methods_are_no_ops() {
        let observer: Arc<dyn SessionObserver> = Arc::new(NoopObserver);
        observer.on_state_changed(&SyncState::default());
        observer.on_messages(&[]);
        observer.on_fatal("reason");
    }

    #[test]
    fn logging_observer_levels() {
        assert_eq!(LoggingObserver::new().level(), LogLevel::Debug);
        let observer = LoggingObserver::with_level(LogLevel::Trace);
        observer.on_state_changed(&SyncState {
            accepted_upto: Some(Position::new(1, 3)),
            pending: None,
            error: Some(Range::new(Position::new(2, 0), Position::new(2, 4))),
        });
        observer.on_messages(&[Message::new(MessageLevel::Warning, "w")]);
    }

    #[test]
    fn sync_state_serializes() {
        let state = SyncState {
            accepted_upto: Some(Position::new(0, 5)),
            ..Default::default()
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["accepted_upto"]["column"], 5);
        assert!(json["error"].is_null());
    }
}

//! Synchronization between a document and the prover.
//!
//! This module provides [`Session`], which tracks the prefix of a document
//! the prover has accepted, queues the chunks still to be sent, and keeps
//! the span of the last rejected chunk.
//!
//! # Example
//!
//! ```ignore
//! use libcoqtop::document::{Position, TextDocument};
//! use libcoqtop::{Session, SessionConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::builder().build()?;
//!     let mut session = Session::launch(&config).await?;
//!
//!     let doc = TextDocument::new("Lemma t : True.\nProof. exact I. Qed.");
//!     let report = session.advance_to_cursor(&doc, Position::new(1, 20)).await?;
//!     println!("{} chunks accepted", report.accepted);
//!
//!     println!("{}", session.goals().await?.value.render());
//!     session.close().await;
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::client::CoqtopClient;
use crate::config::SessionConfig;
use crate::document::{DocumentId, DocumentView, Position, Range};
use crate::observer::{NoopObserver, SessionObserver, SyncState};
use crate::process::{CoqProcess, Transport};
use crate::protocol::{Goals, Interpretation, Message, Reply};
use crate::scanner::{next_chunk, position_from_offset};
use crate::{Error, Result};

/// A chunk the prover refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// The whole chunk as submitted.
    pub chunk: Range,
    /// The offending part, in document positions.
    pub span: Range,
    pub reason: String,
}

/// Outcome of one batch of submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitReport {
    /// Messages from every call in the batch, in order.
    pub messages: Vec<Message>,
    /// Chunks accepted, including unsafe ones.
    pub accepted: usize,
    /// Chunks accepted with an unsafe construct.
    pub unsafe_chunks: usize,
    /// The chunk that stopped the batch, if any.
    pub rejected: Option<Rejection>,
}

impl SubmitReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_none()
    }
}

/// A prover session synchronized with one document.
///
/// # Accepted dots
///
/// Every accepted chunk records the position right after its terminator.
/// These positions strictly increase; they only shrink through rewinds.
///
/// # Session loss
///
/// When the prover dies, times out in the middle of a batch, or answers a
/// rewind in a way that leaves its state unknown, the session closes the
/// prover, resets every piece of synchronization state, calls
/// [`SessionObserver::on_fatal`] and returns the error. Nothing restarts
/// automatically; call [`restart`](Session::restart).
///
/// # Thread Safety
///
/// Calls take `&mut self` and are strictly sequential. Use
/// [`into_shared`](Self::into_shared) when several tasks drive the same
/// session.
pub struct Session<T: Transport = CoqProcess> {
    client: Option<CoqtopClient<T>>,
    accepted: Vec<Position>,
    queue: VecDeque<Range>,
    error_span: Option<Range>,
    saved: Option<DocumentId>,
    observer: Arc<dyn SessionObserver>,
}

impl Session<CoqProcess> {
    /// A session with no prover attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn coqtop and attach a session to it.
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        let client = CoqtopClient::launch(config).await?;
        Ok(Self::with_client(client))
    }

    /// Close the current prover, if any, and start a fresh one.
    ///
    /// All synchronization state is reset, whether or not the launch
    /// succeeds.
    pub async fn restart(&mut self, config: &SessionConfig) -> Result<()> {
        self.close().await;
        let client = CoqtopClient::launch(config).await?;
        self.client = Some(client);
        tracing::info!("coqtop session restarted");
        Ok(())
    }
}

impl<T: Transport> Default for Session<T> {
    fn default() -> Self {
        Self {
            client: None,
            accepted: Vec::new(),
            queue: VecDeque::new(),
            error_span: None,
            saved: None,
            observer: Arc::new(NoopObserver),
        }
    }
}

impl<T: Transport> Session<T> {
    /// Attach a session to an existing client.
    pub fn with_client(client: CoqtopClient<T>) -> Self {
        Self {
            client: Some(client),
            ..Self::default()
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn set_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observer = observer;
    }

    /// Wrap the session so that concurrent callers are serialized.
    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn is_running(&self) -> bool {
        self.client.is_some()
    }

    pub fn client(&self) -> Option<&CoqtopClient<T>> {
        self.client.as_ref()
    }

    /// Accepted dots, in document order.
    pub fn accepted(&self) -> &[Position] {
        &self.accepted
    }

    /// Where the next chunk starts: the last accepted dot, or the origin.
    pub fn last_accepted(&self) -> Position {
        self.accepted.last().copied().unwrap_or_default()
    }

    /// Span covered by queued chunks.
    ///
    /// Chunks are queued and sent within one call, so this is `None` between
    /// calls and in every state notification.
    pub fn pending(&self) -> Option<Range> {
        let first = self.queue.front()?;
        let last = self.queue.back()?;
        Some(Range::new(first.start, last.stop))
    }

    pub fn error_span(&self) -> Option<Range> {
        self.error_span
    }

    /// Take the error span once it has been shown.
    pub fn take_error_span(&mut self) -> Option<Range> {
        self.error_span.take()
    }

    pub fn state(&self) -> SyncState {
        SyncState {
            accepted_upto: self.accepted.last().copied(),
            pending: self.pending(),
            error: self.error_span,
        }
    }

    /// Forget all synchronization state. The prover is left alone.
    pub fn reset(&mut self) {
        self.accepted.clear();
        self.queue.clear();
        self.error_span = None;
        self.saved = None;
        tracing::debug!("synchronization state reset");
    }

    /// Close the prover and reset. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.close().await;
            tracing::info!("coqtop session closed");
        }
        self.reset();
        self.notify();
    }

    /// Reconcile with the document's save point.
    ///
    /// A different document invalidates everything: accepted chunks are
    /// undone in the prover and the state is reset. For the same document,
    /// chunks ending after the earliest edit are rewound.
    pub async fn resync<D: DocumentView + ?Sized>(&mut self, doc: &D) -> Result<()> {
        let point = doc.save_point_identity();
        let saved = self.saved;
        match saved {
            Some(id) if id == point.document => {
                if let Some(edit) = point.edited_from {
                    tracing::debug!(%edit, "document edited inside the checked region");
                    self.rewind_to(edit).await?;
                }
            }
            previous => {
                if previous.is_some() {
                    tracing::info!("document changed; discarding checked region");
                }
                let accepted = self.accepted.len();
                self.rewind(accepted).await?;
                self.reset();
            }
        }
        self.saved = Some(point.document);
        Ok(())
    }

    /// Rewind every accepted chunk whose dot lies after `target`.
    pub async fn rewind_to(&mut self, target: Position) -> Result<usize> {
        let steps = self.accepted.iter().filter(|dot| **dot > target).count();
        self.rewind(steps).await
    }

    /// Undo the last `steps` accepted chunks.
    ///
    /// The prover may undo more than asked when a proof goes as a block;
    /// the accepted dots shrink by the count it reports. Returns that count.
    /// Does nothing when `steps` is zero or nothing is accepted.
    pub async fn rewind(&mut self, steps: usize) -> Result<usize> {
        if steps < 1 || self.accepted.is_empty() {
            return Ok(0);
        }
        let steps = steps.min(self.accepted.len());

        let result = self.client_mut()?.rewind(steps).await;
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => return Err(self.lose(err).await),
        };

        let removed = reply.value.min(self.accepted.len());
        self.accepted.truncate(self.accepted.len() - removed);
        if removed > 0 {
            self.error_span = None;
        }
        tracing::debug!(steps, removed, "rewound");

        if !reply.messages.is_empty() {
            self.observer.on_messages(&reply.messages);
        }
        self.notify();
        Ok(removed)
    }

    /// Send every chunk ending at or before `cursor`.
    ///
    /// When the cursor lies inside the checked region, the chunks after it
    /// are rewound instead.
    pub async fn advance_to_cursor<D: DocumentView + ?Sized>(
        &mut self,
        doc: &D,
        cursor: Position,
    ) -> Result<SubmitReport> {
        self.ensure_running()?;
        self.resync(doc).await?;

        let limit = cursor.next_column();
        if limit < self.last_accepted() {
            self.rewind_to(limit).await?;
            return Ok(SubmitReport::default());
        }

        let mut from = self.last_accepted();
        while let Some(range) = next_chunk(doc, from) {
            if range.stop > cursor {
                break;
            }
            from = range.stop.next_column();
            self.queue.push_back(range);
        }
        self.submit_queue(doc).await
    }

    /// Send the next chunk, if there is one.
    pub async fn advance_one<D: DocumentView + ?Sized>(&mut self, doc: &D) -> Result<SubmitReport> {
        self.ensure_running()?;
        self.resync(doc).await?;

        match next_chunk(doc, self.last_accepted()) {
            Some(range) => {
                self.queue.push_back(range);
                self.submit_queue(doc).await
            }
            None => Ok(SubmitReport::default()),
        }
    }

    /// Send queued chunks in order until one is rejected.
    ///
    /// The queue is empty afterwards. Messages are delivered and the state
    /// change is notified once for the whole batch. The error span of an
    /// earlier batch is cleared; it is set again only if this batch stops
    /// on a rejection.
    pub async fn submit_queue<D: DocumentView + ?Sized>(&mut self, doc: &D) -> Result<SubmitReport> {
        let mut report = SubmitReport::default();
        self.error_span = None;

        while let Some(range) = self.queue.pop_front() {
            let text = doc.text_between(range.start, range.stop);
            let result = match self.client.as_mut() {
                Some(client) => client.interpret(&text, false).await,
                None => Err(Error::NotRunning),
            };
            let reply = match result {
                Ok(reply) => reply,
                Err(err) => {
                    self.deliver(&report.messages);
                    return Err(self.lose(err).await);
                }
            };
            report.messages.extend(reply.messages);

            match reply.value {
                Interpretation::Accepted => {
                    self.accepted.push(range.stop.next_column());
                    report.accepted += 1;
                }
                Interpretation::Unsafe => {
                    tracing::warn!(chunk = %range, "chunk accepted as unsafe");
                    self.accepted.push(range.stop.next_column());
                    report.accepted += 1;
                    report.unsafe_chunks += 1;
                }
                Interpretation::Rejected { location, reason } => {
                    self.queue.clear();
                    let span = match location {
                        Some((start, stop)) => Range::new(
                            position_from_offset(range.start, &text, start),
                            position_from_offset(range.start, &text, stop),
                        ),
                        None => range,
                    };
                    tracing::debug!(chunk = %range, %span, "chunk rejected");
                    self.error_span = Some(span);
                    report.rejected = Some(Rejection {
                        chunk: range,
                        span,
                        reason,
                    });
                }
                Interpretation::TimedOut => {
                    self.deliver(&report.messages);
                    let err = Error::session_lost("the Coq process died");
                    return Err(self.lose(err).await);
                }
            }
        }

        self.deliver(&report.messages);
        self.notify();
        Ok(report)
    }

    /// Run a command outside the checked region, such as a `Search`.
    ///
    /// A reply that does not arrive in time ends the session.
    pub async fn query(&mut self, text: &str) -> Result<Reply<Interpretation>> {
        let result = self.client_mut()?.interpret(text, true).await;
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => return Err(self.lose(err).await),
        };
        if reply.value == Interpretation::TimedOut {
            self.deliver(&reply.messages);
            return Err(self.lose(Error::session_lost("the Coq process died")).await);
        }
        self.deliver(&reply.messages);
        Ok(reply)
    }

    /// Current proof obligations.
    pub async fn goals(&mut self) -> Result<Reply<Goals>> {
        let result = self.client_mut()?.goals().await;
        match result {
            Ok(reply) => Ok(reply),
            Err(err) => Err(self.lose(err).await),
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.client.is_none() {
            return Err(Error::NotRunning);
        }
        Ok(())
    }

    fn client_mut(&mut self) -> Result<&mut CoqtopClient<T>> {
        self.client.as_mut().ok_or(Error::NotRunning)
    }

    fn deliver(&self, messages: &[Message]) {
        if !messages.is_empty() {
            self.observer.on_messages(messages);
        }
    }

    fn notify(&self) {
        self.observer.on_state_changed(&self.state());
    }

    /// Tear the session down after a failed call and hand the error back.
    async fn lose(&mut self, err: Error) -> Error {
        tracing::error!(error = %err, "coqtop session lost");
        if let Some(mut client) = self.client.take() {
            client.close().await;
        }
        self.reset();
        self.observer.on_fatal(&err.to_string());
        self.notify();
        err
    }
}

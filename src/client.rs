//! Protocol client: one call at a time over a framed transport.
//!
//! This module provides [`CoqtopClient`], which serializes [`Call`]s, writes
//! them, and collects the reply frames until the call's `<value>` arrives.
//!
//! # Example
//!
//! ```ignore
//! use libcoqtop::{CoqtopClient, Interpretation, SessionConfig};
//!
//! let mut client = CoqtopClient::launch(&SessionConfig::builder().build()?).await?;
//! let reply = client.interpret("Check nat.", false).await?;
//! if let Interpretation::Rejected { reason, .. } = reply.value {
//!     eprintln!("{reason}");
//! }
//! for message in reply.messages {
//!     println!("{message}");
//! }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::process::{CoqProcess, Received, Transport};
use crate::protocol::{
    rewind_extra, Call, Element, Goals, Interpretation, Message, MessageLevel, Reply, QUERY_NAG,
};
use crate::stream::Frame;
use crate::{Error, Result};

/// Raw answer to one call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Answer {
    /// Messages received before the value, in order.
    pub messages: Vec<Message>,
    /// The `<value>` frame; `None` when the call timed out.
    pub value: Option<Element>,
}

impl Answer {
    pub fn timed_out(&self) -> bool {
        self.value.is_none()
    }
}

/// A client for the coqtop XML protocol.
///
/// Calls are strictly sequential: each method takes `&mut self` and waits
/// for its own reply before returning.
///
/// # Timeouts
///
/// The timeout bounds the wait between two frames. When it elapses before
/// the `<value>` frame, the call returns with the messages received so far
/// and no value; that is not an error. Only a closed output stream is.
pub struct CoqtopClient<T: Transport = CoqProcess> {
    transport: T,
    timeout: Duration,
    backlog: VecDeque<Element>,
}

impl CoqtopClient<CoqProcess> {
    /// Spawn coqtop and connect a client to it.
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        let process = CoqProcess::spawn(config).await?;
        Ok(Self::with_transport(process, config.timeout()))
    }

    /// Get the underlying process.
    pub fn process(&self) -> &CoqProcess {
        &self.transport
    }
}

impl<T: Transport> CoqtopClient<T> {
    /// Create a client over an existing transport.
    pub fn with_transport(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            backlog: VecDeque::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send one call and collect its answer.
    ///
    /// Elements left over from a previous line, after its `value`, belong
    /// to no call and are dropped before sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionLost`] if the prover's output closed, and
    /// write errors from the transport.
    pub async fn send(&mut self, call: &Call) -> Result<Answer> {
        for stale in self.backlog.drain(..) {
            tracing::warn!(frame = %stale, "dropping element left after previous answer");
        }
        let request = call.to_xml();
        tracing::debug!(request = %request.trim_end(), "to coqtop");
        self.transport.write(request.as_bytes()).await?;
        self.collect_answer().await
    }

    async fn collect_answer(&mut self) -> Result<Answer> {
        let mut messages = Vec::new();
        loop {
            let Some(element) = self.next_element().await? else {
                tracing::debug!(collected = messages.len(), "no value before timeout");
                return Ok(Answer {
                    messages,
                    value: None,
                });
            };
            match element.name.as_str() {
                "message" => match Message::from_element(&element) {
                    Some(message) => messages.push(message),
                    None => tracing::warn!(frame = %element, "dropping unparsed message"),
                },
                "value" => {
                    tracing::debug!(value = %element, "from coqtop");
                    return Ok(Answer {
                        messages,
                        value: Some(element),
                    });
                }
                _ => tracing::warn!(frame = %element, "unknown xml response"),
            }
        }
    }

    /// Next element, from the backlog or the transport.
    ///
    /// Raw lines are parsed as a forest of sibling elements.
    async fn next_element(&mut self) -> Result<Option<Element>> {
        loop {
            if let Some(element) = self.backlog.pop_front() {
                return Ok(Some(element));
            }
            match self.transport.try_receive(self.timeout).await {
                Received::Frame(Frame::Element(element)) => return Ok(Some(element)),
                Received::Frame(Frame::Line(line)) => match Element::parse_forest(&line) {
                    Ok(elements) => self.backlog.extend(elements),
                    Err(err) => tracing::warn!(error = %err, %line, "dropping unparsed line"),
                },
                Received::Empty => return Ok(None),
                Received::Closed => return Err(Error::session_lost("the Coq process died")),
            }
        }
    }

    /// Undo `steps` accepted chunks.
    ///
    /// The reply value is the number of chunks actually undone, which may
    /// be larger than `steps` when a whole proof block goes at once.
    ///
    /// # Errors
    ///
    /// A timed-out or failed rewind leaves the prover in an unknown state and
    /// is reported as [`Error::SessionLost`].
    pub async fn rewind(&mut self, steps: usize) -> Result<Reply<usize>> {
        let answer = self.send(&Call::Rewind { steps }).await?;
        match rewind_extra(answer.value.as_ref()) {
            Some(extra) => Ok(Reply::new(answer.messages, steps + extra)),
            None => {
                tracing::error!(steps, value = ?answer.value, "rewind failed");
                Err(Error::session_lost("the Coq process died"))
            }
        }
    }

    /// Submit one chunk of text.
    ///
    /// The "query commands" nag is filtered out of the messages. On failure
    /// the prover's reason is appended as an error-level message.
    pub async fn interpret(&mut self, text: &str, raw: bool) -> Result<Reply<Interpretation>> {
        let call = Call::Interp {
            text: text.to_string(),
            raw,
        };
        let answer = self.send(&call).await?;

        let mut messages: Vec<Message> = answer
            .messages
            .into_iter()
            .filter(|m| !is_query_nag(&m.text))
            .collect();
        let outcome = Interpretation::from_value(answer.value.as_ref());
        if let Interpretation::Rejected { reason, .. } = &outcome {
            messages.push(Message::new(MessageLevel::Error, reason.clone()));
        }
        Ok(Reply::new(messages, outcome))
    }

    /// Ask for the current goals. Decode failures are values, not errors.
    pub async fn goals(&mut self) -> Result<Reply<Goals>> {
        let answer = self.send(&Call::Goal).await?;
        let goals = Goals::from_value(answer.value.as_ref());
        if let Some(reason) = goals.diagnostic() {
            tracing::warn!(reason, "could not decode goals");
        }
        Ok(Reply::new(answer.messages, goals))
    }

    /// Close the transport. Idempotent.
    pub async fn close(&mut self) {
        self.backlog.clear();
        self.transport.close().await;
    }
}

fn is_query_nag(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(QUERY_NAG)
}

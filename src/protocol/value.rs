//! Decoding of `<value>` frames.

use serde::{Deserialize, Serialize};

use super::messages::Message;
use super::xml::Element;

/// Outcome of an `interp` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Interpretation {
    /// The chunk was accepted.
    Accepted,
    /// Accepted, but an admitted or otherwise unsafe construct was used.
    Unsafe,
    /// The chunk was rejected.
    Rejected {
        /// Character offsets `(start, end)` of the failing part of the
        /// submitted text.
        location: Option<(usize, usize)>,
        reason: String,
    },
    /// No value frame arrived in time.
    TimedOut,
}

impl Interpretation {
    /// Decode the value frame of an interp call.
    pub fn from_value(value: Option<&Element>) -> Self {
        let Some(value) = value else {
            return Interpretation::TimedOut;
        };
        match value.attr("val") {
            Some("good") => Interpretation::Accepted,
            Some("unsafe") => Interpretation::Unsafe,
            Some("fail") => Interpretation::Rejected {
                location: location(value),
                reason: value.text.clone(),
            },
            other => {
                tracing::warn!(val = ?other, frame = %value, "unknown interp answer");
                Interpretation::Rejected {
                    location: None,
                    reason: format!("unknown answer: {value}"),
                }
            }
        }
    }

    /// Check whether the prover now holds the chunk.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Interpretation::Accepted | Interpretation::Unsafe)
    }
}

fn location(value: &Element) -> Option<(usize, usize)> {
    let start = value.attr("loc_s")?.trim().parse().ok()?;
    let end = value.attr("loc_e")?.trim().parse().ok()?;
    Some((start, end))
}

/// Number of extra steps reported by a successful rewind.
///
/// `None` means the rewind failed.
pub fn rewind_extra(value: Option<&Element>) -> Option<usize> {
    let value = value?;
    if value.attr("val") != Some("good") {
        return None;
    }
    value.child("int")?.text.trim().parse().ok()
}

/// A decoded answer with the messages that came before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub messages: Vec<Message>,
    pub value: T,
}

impl<T> Reply<T> {
    pub fn new(messages: Vec<Message>, value: T) -> Self {
        Self { messages, value }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            messages: self.messages,
            value: f(self.value),
        }
    }
}

//! Requests sent to the prover.

use std::fmt::Write as _;

use quick_xml::escape::partial_escape;
use serde::{Deserialize, Serialize};

/// Every call carries the same static id; calls never overlap.
pub const CALL_ID: &str = "1";

/// A protocol call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "val", rename_all = "snake_case")]
pub enum Call {
    /// Submit one chunk of source text.
    Interp {
        text: String,
        /// Raw queries run outside the proof script.
        #[serde(default)]
        raw: bool,
    },
    /// Undo the last `steps` accepted chunks.
    Rewind { steps: usize },
    /// Ask for the current proof obligations.
    Goal,
}

impl Call {
    pub fn interp(text: impl Into<String>) -> Self {
        Call::Interp {
            text: text.into(),
            raw: false,
        }
    }

    pub fn raw_interp(text: impl Into<String>) -> Self {
        Call::Interp {
            text: text.into(),
            raw: true,
        }
    }

    /// The call's `val` attribute.
    pub fn verb(&self) -> &'static str {
        match self {
            Call::Interp { .. } => "interp",
            Call::Rewind { .. } => "rewind",
            Call::Goal => "goal",
        }
    }

    /// Wire form, newline terminated.
    pub fn to_xml(&self) -> String {
        let mut out = format!("<call id=\"{CALL_ID}\"");
        let body = match self {
            Call::Interp { text, raw } => {
                if *raw {
                    out.push_str(" raw=\"true\"");
                }
                let _ = write!(out, " val=\"{}\"", self.verb());
                partial_escape(text.as_str()).into_owned()
            }
            Call::Rewind { steps } => {
                let _ = write!(out, " val=\"{}\" steps=\"{steps}\"", self.verb());
                String::new()
            }
            Call::Goal => {
                let _ = write!(out, " val=\"{}\"", self.verb());
                String::new()
            }
        };
        let _ = writeln!(out, ">{body}</call>");
        out
    }
}

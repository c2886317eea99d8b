//! Out-of-band prover messages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::xml::Element;

/// Severity of a prover message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
    Notice,
    Debug,
}

impl MessageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
            MessageLevel::Notice => "notice",
            MessageLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message level: {}", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for MessageLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(MessageLevel::Info),
            "warning" => Ok(MessageLevel::Warning),
            "error" => Ok(MessageLevel::Error),
            "notice" => Ok(MessageLevel::Notice),
            "debug" => Ok(MessageLevel::Debug),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

/// One message emitted by the prover while handling a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    /// Decode a `<message>` frame.
    ///
    /// The frame must hold exactly a `<message_level val=".."/>` followed by
    /// a `<string>`. Anything else yields `None`.
    pub fn from_element(element: &Element) -> Option<Self> {
        let [level, text] = element.children.as_slice() else {
            return None;
        };
        if !level.is("message_level") || !text.is("string") {
            return None;
        }
        let level = level.attr("val")?.parse().ok()?;
        Some(Self::new(level, text.text.clone()))
    }

    pub fn is_error(&self) -> bool {
        self.level == MessageLevel::Error
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.text)
    }
}

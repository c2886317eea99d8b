//! XML protocol types for coqtop communication.
//!
//! coqtop in `-ideslave` mode reads `<call>` elements on stdin and answers
//! with a sequence of sibling elements on stdout:
//!
//! - `<message>`: out-of-band output ([`Message`]) emitted while a call runs
//! - `<value>`: the final answer to the call
//!
//! [`Call`] builds the requests; [`Interpretation`], [`Goals`] and
//! [`rewind_extra`] decode the values.
//!
//! # Example
//!
//! ```
//! use libcoqtop::protocol::{Element, Goals};
//!
//! let value = Element::parse(r#"<value val="good"><option val="none"/></value>"#).unwrap();
//! assert_eq!(Goals::from_value(Some(&value)), Goals::NotInProof);
//! ```

mod call;
mod goals;
mod messages;
mod value;
mod xml;

pub use call::{Call, CALL_ID};
pub use goals::{Goal, Goals};
pub use messages::{Message, MessageLevel, UnknownLevel};
pub use value::{rewind_extra, Interpretation, Reply};
pub use xml::Element;

pub(crate) use xml::{decode_text, TreeBuilder};

/// Nag emitted for queries inside a script; never actionable.
pub const QUERY_NAG: &str = "Query commands should not be inserted in scripts";

//! Framing of the prover's output stream.
//!
//! coqtop writes a sequence of sibling XML elements with no wrapper and no
//! length prefix. This module cuts that byte stream into [`Frame`]s:
//!
//! - [`StreamingFramer`]: incremental parse behind a synthetic, never-closed
//!   `<root>`; a frame is emitted as soon as a direct child of the root closes
//! - [`ByteWiseFramer`]: accumulates bytes and retries a full parse
//! - [`LineFramer`]: forwards raw lines and leaves the XML to the client
//!
//! All three implement [`FrameSource`]. [`spawn_reader`] runs one of them in
//! a background task that feeds a channel.
//!
//! # Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use libcoqtop::stream::{frames, StreamingFramer};
//!
//! let mut frames = Box::pin(frames(StreamingFramer::new(stdout)));
//! while let Some(frame) = frames.next().await {
//!     println!("{frame:?}");
//! }
//! ```
//!
//! # End of stream
//!
//! End of input and malformed input both end the stream quietly; frames
//! already emitted stay valid.

mod fallback;
mod framer;
mod reader;

use std::future::Future;

use futures::Stream;

use crate::protocol::Element;

pub use fallback::{ByteWiseFramer, LineFramer};
pub use framer::{RootPrefixed, StreamingFramer, ROOT_TAG};
pub use reader::spawn_reader;

/// One unit of prover output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete top-level element.
    Element(Element),
    /// A raw output line (line framing only).
    Line(String),
}

impl Frame {
    /// The element, for element frames.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Frame::Element(el) => Some(el),
            Frame::Line(_) => None,
        }
    }
}

/// A source of frames.
///
/// `None` means the stream ended; it is never resumed afterwards.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> impl Future<Output = Option<Frame>> + Send;
}

/// Adapt a frame source into a [`futures::Stream`].
pub fn frames<S: FrameSource>(source: S) -> impl Stream<Item = Frame> + Send {
    futures::stream::unfold(source, |mut source| async move {
        let frame = source.next_frame().await?;
        Some((frame, source))
    })
}

//! Degraded framing strategies.
//!
//! Same contract as the streaming framer, for environments where it cannot
//! be used.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use super::{Frame, FrameSource};
use crate::protocol::Element;

/// Accumulates output bytes and retries a full parse of the accumulator.
///
/// A parse is only attempted after a `>`, the only byte that can complete
/// an element. On success the element is emitted and the accumulator reset;
/// failures just mean the element is not complete yet.
pub struct ByteWiseFramer<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> ByteWiseFramer<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
            pending: Vec::with_capacity(4096),
        }
    }

    async fn read_frame(&mut self) -> Option<Frame> {
        loop {
            let byte = match self.reader.read_u8().await {
                Ok(byte) => byte,
                Err(err) => {
                    if !self.pending.is_empty() {
                        tracing::debug!(
                            error = %err,
                            pending = self.pending.len(),
                            "output ended with an incomplete element"
                        );
                    }
                    return None;
                }
            };
            self.pending.push(byte);
            if byte != b'>' {
                continue;
            }
            if let Ok(element) = Element::parse_bytes(&self.pending) {
                self.pending.clear();
                return Some(Frame::Element(element));
            }
        }
    }
}

impl<R: AsyncRead + Unpin + Send> FrameSource for ByteWiseFramer<R> {
    async fn next_frame(&mut self) -> Option<Frame> {
        self.read_frame().await
    }
}

/// Forwards output line by line without looking at the XML.
pub struct LineFramer<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> LineFramer<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
            line: String::with_capacity(1024),
        }
    }

    async fn read_frame(&mut self) -> Option<Frame> {
        self.line.clear();
        match self.reader.read_line(&mut self.line).await {
            Ok(0) => None,
            Ok(_) => {
                let line = self.line.trim_end_matches(&['\n', '\r'][..]);
                Some(Frame::Line(line.to_string()))
            }
            Err(err) => {
                tracing::debug!(error = %err, "line stream ended");
                None
            }
        }
    }
}

impl<R: AsyncRead + Unpin + Send> FrameSource for LineFramer<R> {
    async fn next_frame(&mut self) -> Option<Frame> {
        self.read_frame().await
    }
}

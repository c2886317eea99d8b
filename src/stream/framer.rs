//! Depth-tracking streaming framer.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use quick_xml::events::Event;
use quick_xml::Reader;
use tokio::io::{AsyncRead, BufReader, ReadBuf};

use super::{Frame, FrameSource};
use crate::protocol::{decode_text, Element, TreeBuilder};

/// Synthetic root prepended to the prover output.
pub const ROOT_TAG: &[u8] = b"<root>";

/// Reader that yields [`ROOT_TAG`] once and then the inner reader verbatim.
///
/// The root is never closed, so the prover's sibling elements become the
/// children of one endless document.
#[derive(Debug)]
pub struct RootPrefixed<R> {
    prefix: &'static [u8],
    inner: R,
}

impl<R> RootPrefixed<R> {
    pub fn new(inner: R) -> Self {
        Self {
            prefix: ROOT_TAG,
            inner,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for RootPrefixed<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.prefix.is_empty() {
            let n = self.prefix.len().min(buf.remaining());
            let (head, tail) = self.prefix.split_at(n);
            buf.put_slice(head);
            self.prefix = tail;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

/// Emits each direct child of the synthetic root as soon as it closes.
///
/// Parser depth 1 is the root itself; the tree builder holds everything
/// below it, so a frame is complete when the builder empties again.
pub struct StreamingFramer<R> {
    reader: Reader<BufReader<RootPrefixed<R>>>,
    buf: Vec<u8>,
    tree: TreeBuilder,
    in_root: bool,
    finished: bool,
}

impl<R: AsyncRead + Unpin> StreamingFramer<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(BufReader::new(RootPrefixed::new(source)));
        reader.config_mut().expand_empty_elements = true;
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            tree: TreeBuilder::default(),
            in_root: false,
            finished: false,
        }
    }

    async fn read_frame(&mut self) -> Option<Frame> {
        if self.finished {
            return None;
        }
        loop {
            self.buf.clear();
            let step = match self.reader.read_event_into_async(&mut self.buf).await {
                Err(err) => {
                    tracing::debug!(error = %err, "xml stream ended on parse error");
                    Step::Finish
                }
                Ok(Event::Start(_)) if !self.in_root => {
                    self.in_root = true;
                    Step::Continue
                }
                Ok(Event::Start(start)) => match self.tree.open(&start) {
                    Ok(()) => Step::Continue,
                    Err(err) => {
                        tracing::debug!(error = %err, "xml stream ended on bad attribute");
                        Step::Finish
                    }
                },
                // the root itself was closed
                Ok(Event::End(_)) if self.tree.depth() == 0 => Step::Finish,
                Ok(Event::End(_)) => match self.tree.close() {
                    Some(element) => Step::Emit(element),
                    None => Step::Continue,
                },
                Ok(Event::Text(text)) => {
                    if self.tree.depth() > 0 {
                        self.tree.push_text(&decode_text(&text));
                    }
                    Step::Continue
                }
                Ok(Event::CData(data)) => {
                    self.tree.push_text(&String::from_utf8_lossy(&data));
                    Step::Continue
                }
                Ok(Event::Eof) => Step::Finish,
                Ok(_) => Step::Continue,
            };

            match step {
                Step::Continue => {}
                Step::Emit(element) => {
                    tracing::trace!(frame = %element, "frame");
                    return Some(Frame::Element(element));
                }
                Step::Finish => return self.finish(),
            }
        }
    }

    fn finish(&mut self) -> Option<Frame> {
        if let Some(open) = self.tree.innermost() {
            tracing::debug!(open, "xml stream ended inside an element");
        }
        self.tree.clear();
        self.finished = true;
        None
    }
}

enum Step {
    Continue,
    Emit(Element),
    Finish,
}

impl<R: AsyncRead + Unpin + Send> FrameSource for StreamingFramer<R> {
    async fn next_frame(&mut self) -> Option<Frame> {
        self.read_frame().await
    }
}

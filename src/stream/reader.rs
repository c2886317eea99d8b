//! Background reader task.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{frames, ByteWiseFramer, Frame, FrameSource, LineFramer, StreamingFramer};
use crate::config::FramingStrategy;

/// Spawn the task that frames `output` and forwards frames to `tx`.
///
/// The task ends when the output ends or the receiving side is dropped. It
/// never touches session state.
pub fn spawn_reader<R>(
    output: R,
    strategy: FramingStrategy,
    tx: mpsc::UnboundedSender<Frame>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    match strategy {
        FramingStrategy::Streaming => tokio::spawn(pump(StreamingFramer::new(output), tx, strategy)),
        FramingStrategy::ByteWise => tokio::spawn(pump(ByteWiseFramer::new(output), tx, strategy)),
        FramingStrategy::Lines => tokio::spawn(pump(LineFramer::new(output), tx, strategy)),
    }
}

async fn pump<S: FrameSource>(source: S, tx: mpsc::UnboundedSender<Frame>, strategy: FramingStrategy) {
    let mut frames = Box::pin(frames(source));
    let mut count = 0usize;
    while let Some(frame) = frames.next().await {
        if tx.send(frame).is_err() {
            tracing::debug!(%strategy, count, "frame receiver dropped");
            return;
        }
        count += 1;
    }
    tracing::debug!(%strategy, count, "prover output closed");
}

use bytes::Bytes;
use dropload_engine::ProgressSink;
use futures_util::stream::{self, Stream, StreamExt};

/// Default size of the pieces a body is streamed in.
pub(crate) const DEFAULT_STEP: usize = 64 * 1024;

/// Streams `content` in `step`-byte pieces, reporting the running byte
/// count to `sink` as each piece is handed to the connection.
pub(crate) fn progress_stream(
    content: Bytes,
    sink: ProgressSink,
    step: usize,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let total = content.len() as u64;
    let step = step.max(1);
    let pieces: Vec<Bytes> = (0..content.len())
        .step_by(step)
        .map(|start| content.slice(start..(start + step).min(content.len())))
        .collect();

    let mut loaded = 0u64;
    stream::iter(pieces).map(move |piece| {
        loaded += piece.len() as u64;
        sink.report(loaded, Some(total));
        Ok(piece)
    })
}

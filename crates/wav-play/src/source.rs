//! Feeder stage: pulls frames out of a [`WavStream`] into a bounded [`FrameQueue`].
//!
//! The stream itself is synchronous and never blocks; this stage gives it a thread so the
//! output callback only ever touches the queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use wav_stream::{Sample, WavStream};

use crate::config::PlaybackConfig;
use crate::queue::{FrameQueue, calc_max_buffered_frames};

/// Spawn a thread that drains `stream` into a new queue in `chunk_frames` batches.
///
/// The queue is closed when the stream is exhausted, the queue is closed downstream, or
/// `cancel` is set.
pub fn start_feeder<B>(
    stream: WavStream<B>,
    cfg: &PlaybackConfig,
    cancel: Arc<AtomicBool>,
) -> Arc<FrameQueue>
where
    B: AsRef<[u8]> + Send + 'static,
{
    let rate = stream.format().sample_rate;
    let queue = Arc::new(FrameQueue::new(calc_max_buffered_frames(
        rate,
        cfg.buffer_seconds,
    )));
    let chunk_frames = cfg.chunk_frames.max(1);

    let queue_thread = queue.clone();
    thread::spawn(move || {
        let mut stream = stream;
        let fed = feed(&mut stream, &queue_thread, chunk_frames, &cancel);
        tracing::debug!(
            frames = fed,
            position = stream.position(),
            total = stream.len(),
            "feeder finished"
        );
        queue_thread.close();
    });

    queue
}

/// Pull batches from `stream` and push them into `queue` until one side stops.
///
/// Returns the number of frames pushed.
pub(crate) fn feed<B: AsRef<[u8]>>(
    stream: &mut WavStream<B>,
    queue: &FrameQueue,
    chunk_frames: usize,
    cancel: &AtomicBool,
) -> usize {
    let mut batch: Vec<Sample> = vec![[0.0; 2]; chunk_frames.max(1)];
    let mut fed = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            tracing::debug!(position = stream.position(), "feeder cancelled");
            break;
        }

        let (n, more) = stream.produce(&mut batch);
        if n > 0 {
            if !queue.push_blocking(&batch[..n]) {
                break;
            }
            fed += n;
        }
        if !more {
            break;
        }
    }

    if let Some(err) = stream.last_error() {
        tracing::error!("stream error: {err}");
    }
    fed
}

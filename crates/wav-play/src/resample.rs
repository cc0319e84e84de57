//! Streaming resample stage.
//!
//! Converts stereo frames from the WAV sample rate to the output device rate with Rubato's
//! sinc resampler. Runs on its own thread between two [`FrameQueue`]s.

use std::sync::Arc;
use std::thread;

use anyhow::{Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};
use wav_stream::Sample;

use crate::queue::{FrameQueue, PopStrategy, calc_max_buffered_frames};

const CHANNELS: usize = 2;
const SINC_LEN: usize = 128;
const MAX_RATIO_RELATIVE: f64 = 1.1;

/// Configuration for the resampler stage.
#[derive(Clone, Copy, Debug)]
pub struct ResampleConfig {
    /// Input chunk size in frames.
    pub chunk_frames: usize,
    /// Target buffering (seconds) for the output queue.
    pub buffer_seconds: f32,
}

/// Start a resampler thread reading `srcq` at `src_rate` and writing a new queue at
/// `dst_rate`.
///
/// The output queue is closed once `srcq` is closed and drained, or on a resampler error.
/// Zero rates are rejected up front.
pub fn start_resampler(
    srcq: Arc<FrameQueue>,
    src_rate: u32,
    dst_rate: u32,
    cfg: ResampleConfig,
) -> Result<Arc<FrameQueue>> {
    if src_rate == 0 || dst_rate == 0 {
        return Err(anyhow!("cannot resample {src_rate} Hz -> {dst_rate} Hz"));
    }

    let dstq = Arc::new(FrameQueue::new(calc_max_buffered_frames(
        dst_rate,
        cfg.buffer_seconds,
    )));
    let ratio = f64::from(dst_rate) / f64::from(src_rate);
    let chunk_frames = cfg.chunk_frames.max(1);

    let dstq_thread = dstq.clone();
    thread::spawn(move || {
        let mut resampler = match new_resampler(ratio, chunk_frames) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("resampler init error: {e:#}");
                dstq_thread.close();
                return;
            }
        };

        let mut out = vec![[0.0f32; 2]; output_capacity(chunk_frames, ratio)];
        let mut indexing = Indexing {
            input_offset: 0,
            output_offset: 0,
            active_channels_mask: None,
            partial_len: None,
        };

        let stopped = resample_loop(
            resampler.as_mut(),
            &srcq,
            &dstq_thread,
            &mut out,
            &mut indexing,
            chunk_frames,
        );
        if stopped {
            tracing::debug!("resampler stopped before the source drained");
        }

        dstq_thread.close();
    });

    Ok(dstq)
}

fn new_resampler(ratio: f64, chunk_frames: usize) -> Result<Box<dyn Resampler<f32>>> {
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: calculate_cutoff(SINC_LEN, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };
    let resampler = Async::<f32>::new_sinc(
        ratio,
        MAX_RATIO_RELATIVE,
        &params,
        chunk_frames,
        CHANNELS,
        FixedAsync::Input,
    )
    .map_err(|e| anyhow!("sinc resampler: {e}"))?;
    Ok(Box::new(resampler))
}

/// Resample `srcq` into `dstq` until the source drains.
///
/// Returns `true` when it stopped early: `dstq` was closed or the resampler failed. The
/// short final chunk is only processed after a normal drain.
fn resample_loop(
    resampler: &mut dyn Resampler<f32>,
    srcq: &FrameQueue,
    dstq: &FrameQueue,
    out: &mut [Sample],
    indexing: &mut Indexing,
    chunk_frames: usize,
) -> bool {
    while let Some(input) = srcq.pop(PopStrategy::BlockingExact {
        frames: chunk_frames,
    }) {
        match process_chunk(resampler, &input, out, indexing, None) {
            Ok(n) => {
                if !dstq.push_blocking(&out[..n]) {
                    return true;
                }
            }
            Err(e) => {
                tracing::error!("resampler error: {e:#}");
                return true;
            }
        }
    }

    // Fewer than `chunk_frames` left once the source closed.
    while let Some(tail) = srcq.pop(PopStrategy::BlockingUpTo {
        max_frames: chunk_frames,
    }) {
        let partial = Some(tail.len());
        match process_chunk(resampler, &tail, out, indexing, partial) {
            Ok(n) => {
                if !dstq.push_blocking(&out[..n]) {
                    return true;
                }
            }
            Err(e) => {
                tracing::error!("resampler tail error: {e:#}");
                return true;
            }
        }
    }
    false
}

/// Output buffer size (frames) large enough for one input chunk at `ratio`.
fn output_capacity(chunk_frames: usize, ratio: f64) -> usize {
    let scaled = (chunk_frames as f64 * ratio * MAX_RATIO_RELATIVE).ceil() as usize;
    (scaled + SINC_LEN).max(chunk_frames * 3)
}

/// Resample one chunk of frames into `out`, returning the number of output frames.
///
/// `partial` marks a short final chunk.
fn process_chunk(
    resampler: &mut dyn Resampler<f32>,
    input: &[Sample],
    out: &mut [Sample],
    indexing: &mut Indexing,
    partial: Option<usize>,
) -> Result<usize> {
    let input_frames = input.len();
    let input_adapter = InterleavedSlice::new(input.as_flattened(), CHANNELS, input_frames)
        .map_err(|e| anyhow!("interleaved slice (input): {e}"))?;

    let out_frames = out.len();
    let mut output_adapter =
        InterleavedSlice::new_mut(out.as_flattened_mut(), CHANNELS, out_frames)
            .map_err(|e| anyhow!("interleaved slice (output): {e}"))?;

    indexing.input_offset = 0;
    indexing.output_offset = 0;
    indexing.partial_len = partial;

    let (_consumed, produced) = resampler
        .process_into_buffer(&input_adapter, &mut output_adapter, Some(&*indexing))
        .map_err(|e| anyhow!("process: {e}"))?;
    Ok(produced)
}

//! Playback pipeline wiring: feeder → optional resampler → CPAL output.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::Result;
use cpal::traits::{DeviceTrait, StreamTrait};
use wav_stream::WavStream;

use crate::config::PlaybackConfig;
use crate::playback::PlaybackCounters;
use crate::{device, playback, resample, source};

/// What happened during one playback run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackReport {
    /// `false` when playback was interrupted by `cancel`.
    pub completed: bool,
    pub played_frames: u64,
    pub underrun_events: u64,
}

/// Play `stream` on `device` and block until it drains or `cancel` is set.
///
/// A resampler stage is inserted when the device cannot run at the WAV sample rate.
pub fn play_stream<B>(
    device: &cpal::Device,
    stream: WavStream<B>,
    cfg: &PlaybackConfig,
    cancel: Arc<AtomicBool>,
) -> Result<PlaybackReport>
where
    B: AsRef<[u8]> + Send + 'static,
{
    let src_rate = stream.format().sample_rate;

    let config = device::pick_output_config(device, src_rate)?;
    let mut stream_config: cpal::StreamConfig = config.clone().into();
    if let Some(buf) = device::pick_buffer_size(&config) {
        stream_config.buffer_size = buf;
    }
    tracing::info!(device = %device.description()?, "output device");
    tracing::info!(
        source_rate_hz = src_rate,
        output_rate_hz = stream_config.sample_rate,
        channels = stream_config.channels,
        buffer_size = ?stream_config.buffer_size,
        "device output config"
    );

    let srcq = source::start_feeder(stream, cfg, cancel.clone());

    let dst_rate = stream_config.sample_rate;
    let dstq = if src_rate == dst_rate {
        tracing::info!(rate_hz = dst_rate, "resample skipped");
        srcq.clone()
    } else {
        tracing::info!(from_hz = src_rate, to_hz = dst_rate, "resampling");
        resample::start_resampler(
            srcq.clone(),
            src_rate,
            dst_rate,
            resample::ResampleConfig {
                chunk_frames: cfg.chunk_frames,
                buffer_seconds: cfg.buffer_seconds,
            },
        )?
    };

    tracing::debug!(capacity_frames = dstq.max_frames(), "output queue");

    let counters = PlaybackCounters::default();
    let output = playback::build_output_stream(
        device,
        &stream_config,
        config.sample_format(),
        &dstq,
        cfg.refill_max_frames,
        counters.clone(),
    )?;
    output.play()?;

    // The queue draining only means the callback has taken the last frames; wait until
    // it has written all of them, then let the device play out its final buffer.
    let completed = dstq.wait_drained_or_cancel(&cancel)
        && counters.wait_played_or_cancel(dstq.pushed_frames(), &cancel);
    if completed {
        thread::sleep(playback::device_period(&stream_config));
    } else {
        tracing::info!(buffered_frames = dstq.len_frames(), "playback cancelled");
        srcq.close();
        dstq.close();
    }
    drop(output);

    let report = PlaybackReport {
        completed,
        played_frames: counters.played_frames.load(Ordering::Relaxed),
        underrun_events: counters.underrun_events.load(Ordering::Relaxed),
    };
    tracing::info!(
        played_frames = report.played_frames,
        underrun_events = report.underrun_events,
        underrun_frames = counters.underrun_frames.load(Ordering::Relaxed),
        "playback finished"
    );
    Ok(report)
}

//! Playback stage (CPAL output stream).
//!
//! The real-time callback:
//! - refills a small local buffer from the frame queue without blocking
//! - maps stereo frames onto the device channel layout
//! - converts `f32` to the device sample format
//! - writes silence on underrun and counts it

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;
use wav_stream::Sample;

use crate::queue::{FrameQueue, PopStrategy};

/// Counters updated from the output callback.
#[derive(Clone, Debug, Default)]
pub struct PlaybackCounters {
    /// Frames written to the device.
    pub played_frames: Arc<AtomicU64>,
    /// Frames filled with silence because the queue was empty.
    pub underrun_frames: Arc<AtomicU64>,
    /// Callbacks that hit an empty queue.
    pub underrun_events: Arc<AtomicU64>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Give up waiting when the callback stops advancing for this long.
const STALL_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_DEVICE_PERIOD: Duration = Duration::from_millis(100);

impl PlaybackCounters {
    /// Block until the output callback has written `target` frames, or `cancel` is set.
    ///
    /// Returns `false` on cancel. A callback that makes no progress for [`STALL_TIMEOUT`]
    /// ends the wait with a warning.
    pub fn wait_played_or_cancel(&self, target: u64, cancel: &AtomicBool) -> bool {
        let mut last = self.played_frames.load(Ordering::Relaxed);
        let mut last_progress = Instant::now();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            let played = self.played_frames.load(Ordering::Relaxed);
            if caught_up(played, target) {
                return true;
            }
            if played != last {
                last = played;
                last_progress = Instant::now();
            } else if last_progress.elapsed() >= STALL_TIMEOUT {
                tracing::warn!(played, target, "output stalled; giving up on the tail");
                return true;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Whether the device has been handed every frame the pipeline produced.
fn caught_up(played: u64, pushed: u64) -> bool {
    played >= pushed
}

/// Time the device needs to play out one buffer after the last callback.
///
/// Unknown buffer sizes or a zero rate fall back to 100 ms.
pub fn device_period(config: &cpal::StreamConfig) -> Duration {
    match config.buffer_size {
        cpal::BufferSize::Fixed(frames) if config.sample_rate > 0 => {
            Duration::from_secs_f64(f64::from(frames) / f64::from(config.sample_rate))
        }
        _ => DEFAULT_DEVICE_PERIOD,
    }
}

/// Build a CPAL output stream that plays frames from `queue`.
///
/// `queue` must already be at the device sample rate. `refill` caps the frames pulled from
/// the queue per refill; larger values reduce lock churn but can add latency.
pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    queue: &Arc<FrameQueue>,
    refill: usize,
    counters: PlaybackCounters,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, queue, refill, counters),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, queue, refill, counters),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, queue, refill, counters),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, queue, refill, counters),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<FrameQueue>,
    refill_max_frames: usize,
    counters: PlaybackCounters,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = usize::from(config.channels).max(1);
    let refill_max_frames = refill_max_frames.max(1);
    let queue = queue.clone();
    let mut local = LocalBuffer::default();

    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let frames = data.len() / channels_out;
            let mut filled = 0usize;

            for (i, out) in data.chunks_exact_mut(channels_out).enumerate() {
                let Some(frame) = local.next(&queue, refill_max_frames) else {
                    counters.underrun_events.fetch_add(1, Ordering::Relaxed);
                    counters
                        .underrun_frames
                        .fetch_add((frames - i) as u64, Ordering::Relaxed);
                    break;
                };
                for (ch, sample) in out.iter_mut().enumerate() {
                    let value = map_channel(frame, channels_out, ch);
                    *sample = <T as cpal::Sample>::from_sample::<f32>(value);
                }
                filled += 1;
            }

            data[filled * channels_out..].fill(<T as cpal::Sample>::from_sample::<f32>(0.0));
            if filled > 0 {
                counters
                    .played_frames
                    .fetch_add(filled as u64, Ordering::Relaxed);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Frames already pulled from the queue but not yet written.
///
/// Owned by the callback closure, so reading it needs no lock.
#[derive(Default)]
struct LocalBuffer {
    pos: usize,
    frames: Vec<Sample>,
}

impl LocalBuffer {
    fn next(&mut self, queue: &FrameQueue, refill_max_frames: usize) -> Option<Sample> {
        if self.pos >= self.frames.len() {
            self.frames = queue.pop(PopStrategy::NonBlocking {
                max_frames: refill_max_frames,
            })?;
            self.pos = 0;
        }
        let frame = self.frames[self.pos];
        self.pos += 1;
        Some(frame)
    }
}

/// Output sample for device channel `dst_ch` from a stereo frame.
///
/// - mono device: average of left and right
/// - stereo and wider: left, right, then silence on the extra channels
fn map_channel(frame: Sample, dst_channels: usize, dst_ch: usize) -> f32 {
    match (dst_channels, dst_ch) {
        (1, _) => 0.5 * (frame[0] + frame[1]),
        (_, 0) => frame[0],
        (_, 1) => frame[1],
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_channel_downmixes_to_mono() {
        assert_eq!(map_channel([0.5, -0.5], 1, 0), 0.0);
        assert_eq!(map_channel([0.25, 0.75], 1, 0), 0.5);
    }

    #[test]
    fn map_channel_passes_stereo_through() {
        assert_eq!(map_channel([0.1, 0.2], 2, 0), 0.1);
        assert_eq!(map_channel([0.1, 0.2], 2, 1), 0.2);
    }

    #[test]
    fn map_channel_silences_extra_channels() {
        assert_eq!(map_channel([0.1, 0.2], 6, 0), 0.1);
        assert_eq!(map_channel([0.1, 0.2], 6, 1), 0.2);
        assert_eq!(map_channel([0.1, 0.2], 6, 4), 0.0);
    }

    #[test]
    fn caught_up_needs_every_pushed_frame() {
        assert!(!caught_up(4_095, 4_096));
        assert!(caught_up(4_096, 4_096));
        assert!(caught_up(0, 0));
    }

    #[test]
    fn wait_played_returns_once_callback_catches_up() {
        let counters = PlaybackCounters::default();
        let cancel = AtomicBool::new(false);
        let played = counters.played_frames.clone();
        let handle = thread::spawn(move || {
            for _ in 0..4 {
                thread::sleep(Duration::from_millis(5));
                played.fetch_add(1_024, Ordering::Relaxed);
            }
        });

        assert!(counters.wait_played_or_cancel(4_096, &cancel));
        assert!(counters.played_frames.load(Ordering::Relaxed) >= 4_096);
        handle.join().unwrap();
    }

    #[test]
    fn wait_played_respects_cancel() {
        let counters = PlaybackCounters::default();
        assert!(!counters.wait_played_or_cancel(1, &AtomicBool::new(true)));
    }

    #[test]
    fn device_period_follows_fixed_buffer() {
        let mut config = cpal::StreamConfig {
            channels: 2,
            sample_rate: 48_000,
            buffer_size: cpal::BufferSize::Fixed(16_384),
        };
        let period = device_period(&config);
        assert!(period > Duration::from_millis(340) && period < Duration::from_millis(342));

        config.buffer_size = cpal::BufferSize::Default;
        assert_eq!(device_period(&config), DEFAULT_DEVICE_PERIOD);
    }

    #[test]
    fn local_buffer_refills_in_bursts() {
        let queue = FrameQueue::new(16);
        queue.push_blocking(&[[0.1, 0.1], [0.2, 0.2], [0.3, 0.3]]);
        let mut local = LocalBuffer::default();

        assert_eq!(local.next(&queue, 2), Some([0.1, 0.1]));
        assert_eq!(queue.len_frames(), 1);
        assert_eq!(local.next(&queue, 2), Some([0.2, 0.2]));
        assert_eq!(local.next(&queue, 2), Some([0.3, 0.3]));
        assert_eq!(local.next(&queue, 2), None);
    }
}

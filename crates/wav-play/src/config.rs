//! Validated playback settings built from the command line.

use anyhow::{Result, bail};

pub const DEFAULT_CHUNK_FRAMES: usize = 1024;
pub const DEFAULT_REFILL_MAX_FRAMES: usize = 4096;
pub const DEFAULT_BUFFER_SECONDS: f32 = 2.0;

/// Settings for one `wav-play` run.
///
/// Sizes are at least one frame, `buffer_seconds` is finite and positive, and the start
/// offset is already in whole milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Frames pulled from the stream per batch, also the resampler chunk size.
    pub chunk_frames: usize,
    pub refill_max_frames: usize,
    /// Per-stage queue capacity in seconds.
    pub buffer_seconds: f32,
    /// Seek target applied before playback starts.
    pub start_ms: u64,
}

impl PlaybackConfig {
    /// Validate raw CLI values.
    ///
    /// Zero sizes are bumped to one frame. A negative `start_secs` means the beginning.
    pub fn new(
        chunk_frames: usize,
        refill_max_frames: usize,
        buffer_seconds: f32,
        start_secs: f64,
    ) -> Result<Self> {
        if !buffer_seconds.is_finite() || buffer_seconds <= 0.0 {
            bail!("--buffer-seconds must be a positive number, got {buffer_seconds}");
        }
        if !start_secs.is_finite() {
            bail!("--start must be a finite number of seconds, got {start_secs}");
        }
        Ok(Self {
            chunk_frames: chunk_frames.max(1),
            refill_max_frames: refill_max_frames.max(1),
            buffer_seconds,
            start_ms: (start_secs.max(0.0) * 1000.0) as u64,
        })
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            refill_max_frames: DEFAULT_REFILL_MAX_FRAMES,
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            start_ms: 0,
        }
    }
}

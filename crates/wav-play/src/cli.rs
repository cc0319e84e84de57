//! Command-line interface definitions.
//!
//! Only the `clap` surface lives here; the playback logic stays in the other modules.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::{
    DEFAULT_BUFFER_SECONDS, DEFAULT_CHUNK_FRAMES, DEFAULT_REFILL_MAX_FRAMES, PlaybackConfig,
};

#[derive(Parser, Debug)]
#[command(version, about = "Play a 16-bit PCM WAV file on an output device")]
pub struct Args {
    /// Path to a WAV file, or `-` to read it from stdin
    #[arg(required_unless_present = "list_devices")]
    pub path: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Use a specific output device by substring match
    #[arg(long)]
    pub device: Option<String>,

    /// Start playback this many seconds into the file (clamped to the file length)
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Frames pulled from the decoder per batch (also the resampler chunk size)
    #[arg(long, default_value_t = DEFAULT_CHUNK_FRAMES)]
    pub chunk_frames: usize,

    /// Playback callback refill cap (frames). Larger reduces lock churn but can add latency.
    #[arg(long, default_value_t = DEFAULT_REFILL_MAX_FRAMES)]
    pub refill_max_frames: usize,

    /// Queue buffer target in seconds (per stage)
    #[arg(long, default_value_t = DEFAULT_BUFFER_SECONDS)]
    pub buffer_seconds: f32,
}

impl Args {
    pub fn playback_config(&self) -> Result<PlaybackConfig> {
        PlaybackConfig::new(
            self.chunk_frames,
            self.refill_max_frames,
            self.buffer_seconds,
            self.start,
        )
    }
}

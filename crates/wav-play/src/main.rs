//! wav-play: play a 16-bit PCM WAV file through CPAL.
//!
//! ## Pipeline
//! 1. **Decode**: the whole file is read into memory and validated by `wav_stream`.
//! 2. **Feed**: a background thread pulls stereo frames from the stream into a bounded queue.
//! 3. **Resample**: when the device cannot run at the file rate, Rubato converts in between.
//! 4. **Playback**: the CPAL callback drains the queue without blocking.
//!
//! Ctrl-C stops playback cleanly.

mod cli;
mod config;
mod device;
mod pipeline;
mod playback;
mod queue;
mod resample;
mod source;

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wav_play=info")),
        )
        .init();
    let host = cpal::default_host();

    if args.list_devices {
        device::list_devices(&host)?;
        return Ok(());
    }

    let cfg = args.playback_config()?;
    let path = args
        .path
        .as_deref()
        .ok_or_else(|| anyhow!("missing WAV path"))?;
    let bytes = read_input(path)?;
    let (format, mut stream) =
        wav_stream::decode(bytes).with_context(|| format!("decode {:?}", path))?;
    tracing::info!(
        sample_rate = format.sample_rate,
        channels = format.channel_count,
        frames = stream.len(),
        duration_ms = stream.duration_ms(),
        "source"
    );

    if cfg.start_ms > 0 {
        stream.seek_ms(cfg.start_ms);
        tracing::info!(position_ms = stream.position_ms(), "seeked");
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_for_signal = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel_for_signal.store(true, Ordering::Relaxed);
    }) {
        tracing::warn!("ctrl-c handler not installed: {e}");
    }

    let device = device::pick_device(&host, args.device.as_deref())?;
    let report = pipeline::play_stream(&device, stream, &cfg, cancel)?;
    if !report.completed {
        std::process::exit(130);
    }
    Ok(())
}

/// Read the whole WAV file, or stdin for `-`.
fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("open {:?}", path))
}

//! Output device discovery and selection.
//!
//! Thin wrappers around CPAL for:
//! - listing output devices
//! - picking the default device or one matched by name
//! - picking the output config closest to the WAV sample rate

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Pick the first output device whose name contains `needle` (case-insensitive), or the
/// host default when `needle` is `None`.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let Some(needle) = needle else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default output device"));
    };

    host.output_devices()
        .context("No output devices")?
        .find(|d| {
            d.description()
                .map(|desc| matches_device_name(&desc.name(), needle))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("No output device matched: {needle}"))
}

/// Choose the output config that best fits a source at `source_rate`.
///
/// Rates at or below the source are preferred (highest first), then the lowest rate above
/// it. Ties go to stereo layouts, then to higher-precision sample formats.
pub fn pick_output_config(
    device: &cpal::Device,
    source_rate: u32,
) -> Result<cpal::SupportedStreamConfig> {
    let mut best: Option<(Candidate, cpal::SupportedStreamConfig)> = None;

    for range in device.supported_output_configs()? {
        let rate = rate_within(range.min_sample_rate(), range.max_sample_rate(), source_rate);
        let candidate = Candidate {
            at_or_below: rate <= source_rate,
            rate,
            stereo: range.channels() == 2,
            format_rank: sample_format_rank(range.sample_format()),
        };
        let replace = best
            .as_ref()
            .is_none_or(|(current, _)| candidate.beats(current));
        if replace {
            best = Some((candidate, range.with_sample_rate(rate)));
        }
    }

    best.map(|(_, cfg)| cfg)
        .ok_or_else(|| anyhow!("No supported output configs"))
}

/// Prefer a fixed buffer size when the device advertises a range.
///
/// Picks the largest size up to 16384 frames; `None` leaves the device default.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed(buffer_frames_within(*min, *max)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

/// Print output devices to stdout (`--list-devices`).
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let devices = host.output_devices().context("No output devices")?;
    for (i, d) in devices.enumerate() {
        println!("#{i}: {}", d.description()?);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    at_or_below: bool,
    rate: u32,
    stereo: bool,
    format_rank: u8,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        if self.at_or_below != other.at_or_below {
            return self.at_or_below;
        }
        if self.rate != other.rate {
            return if self.at_or_below {
                self.rate > other.rate
            } else {
                self.rate < other.rate
            };
        }
        if self.stereo != other.stereo {
            return self.stereo;
        }
        self.format_rank < other.format_rank
    }
}

/// Closest rate to `target` inside `[min, max]`.
fn rate_within(min: u32, max: u32, target: u32) -> u32 {
    target.clamp(min, max.max(min))
}

fn buffer_frames_within(min: u32, max: u32) -> u32 {
    const MAX_FRAMES: u32 = 16_384;
    max.min(MAX_FRAMES).max(min)
}

fn sample_format_rank(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => 10,
    }
}

fn matches_device_name(name: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&needle.to_lowercase())
}

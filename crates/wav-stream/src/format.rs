//! Value types produced by parsing.

/// `audio_format_code` for linear PCM.
pub const FORMAT_PCM: u16 = 1;
/// The only accepted bit depth.
pub const BITS_PER_SAMPLE: u16 = 16;
/// Bytes per sample word for 16-bit PCM.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Format fields from the `fmt ` chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub bits_per_sample: u16,
    pub audio_format_code: u16,
}

impl FormatDescriptor {
    /// Bytes for one sample per channel.
    pub fn bytes_per_frame(&self) -> usize {
        usize::from(self.channel_count) * BYTES_PER_SAMPLE
    }

    /// Duration of `frames` frames in milliseconds.
    ///
    /// Returns `None` for a zero sample rate.
    pub fn duration_ms(&self, frames: usize) -> Option<u64> {
        let rate = u64::from(self.sample_rate);
        if rate == 0 {
            return None;
        }
        Some((frames as u64).saturating_mul(1000) / rate)
    }

    /// Frame index at `ms` milliseconds (rounded down).
    pub fn frame_at_ms(&self, ms: u64) -> u64 {
        ms.saturating_mul(u64::from(self.sample_rate)) / 1000
    }
}

/// Byte range of raw sample data inside the source buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataExtent {
    pub offset: usize,
    pub size: usize,
}

impl DataExtent {
    /// One past the last data byte, saturating at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.size)
    }

    /// Shrink the extent so it lies within a buffer of `len` bytes.
    pub(crate) fn clamped_to(self, len: usize) -> Self {
        let offset = self.offset.min(len);
        let size = self.size.min(len - offset);
        Self { offset, size }
    }
}

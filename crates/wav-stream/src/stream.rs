//! Pull-based sample source over a validated WAVE buffer.
//!
//! [`WavStream`] keeps a byte cursor into the data extent and converts 16-bit little-endian
//! PCM to stereo `f32` frames on demand:
//! - mono input is duplicated into both channels
//! - stereo input is passed through as left/right
//!
//! The stream is `Active` while whole frames remain and `Exhausted` once the cursor reaches
//! the end of the data. `produce` only moves forward; `seek` can move either way and clamps
//! instead of failing.
//!
//! The buffer type is generic so callers can borrow (`&[u8]`), own (`Vec<u8>`) or share
//! (`Arc<[u8]>`) the bytes. Each stream owns its cursor; clones read independently.

use crate::error::DecodeError;
use crate::format::{BYTES_PER_SAMPLE, DataExtent, FormatDescriptor};

/// One stereo frame: `[left, right]`, each in `[-1.0, 1.0)`.
pub type Sample = [f32; 2];

/// Scale from `i16` to normalized `f32`.
const I16_SCALE: f32 = 32768.0;

/// Whether a stream can still produce frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Active,
    Exhausted,
}

/// Seekable stereo `f32` source over 16-bit PCM bytes.
#[derive(Clone, Debug)]
pub struct WavStream<B> {
    buf: B,
    format: FormatDescriptor,
    extent: DataExtent,
    /// Bytes of `extent` covered by whole frames.
    usable: usize,
    /// Byte position relative to `extent.offset`, always within `[0, usable]`.
    cursor: usize,
}

impl<B: AsRef<[u8]>> WavStream<B> {
    /// Wrap `buf` using the format and extent returned by [`crate::parse`].
    ///
    /// The extent is clamped to the buffer, and a trailing partial frame is ignored.
    pub fn new(buf: B, format: FormatDescriptor, extent: DataExtent) -> Self {
        let extent = extent.clamped_to(buf.as_ref().len());
        let frame = format.bytes_per_frame();
        let usable = if frame == 0 {
            0
        } else {
            extent.size - extent.size % frame
        };
        Self {
            buf,
            format,
            extent,
            usable,
            cursor: 0,
        }
    }

    /// Fill `out` with frames starting at the cursor.
    ///
    /// Returns `(frames_written, has_more)`. Once the end of the data is reached this returns
    /// `(0, false)` on every call.
    pub fn produce(&mut self, out: &mut [Sample]) -> (usize, bool) {
        let frame = self.format.bytes_per_frame();
        if frame == 0 || self.cursor >= self.usable {
            return (0, false);
        }

        let start = self.extent.offset + self.cursor;
        let end = self.extent.offset + self.usable;
        let data = &self.buf.as_ref()[start..end];
        let mono = self.format.channel_count == 1;

        let mut written = 0;
        for (slot, bytes) in out.iter_mut().zip(data.chunks_exact(frame)) {
            let left = sample_at(bytes, 0);
            let right = if mono {
                left
            } else {
                sample_at(bytes, BYTES_PER_SAMPLE)
            };
            *slot = [left, right];
            written += 1;
        }

        self.cursor += written * frame;
        (written, self.cursor < self.usable)
    }

    /// Move the cursor to frame `sample_index`, clamped into `[0, len()]`.
    pub fn seek(&mut self, sample_index: i64) {
        let frame = i64::try_from(self.format.bytes_per_frame()).unwrap_or(i64::MAX);
        let usable = i64::try_from(self.usable).unwrap_or(i64::MAX);
        let target = sample_index.saturating_mul(frame).clamp(0, usable);
        self.cursor = usize::try_from(target).unwrap_or(self.usable);
    }

    /// Seek to a time offset in milliseconds, clamped like [`Self::seek`].
    pub fn seek_ms(&mut self, ms: u64) {
        let frame = self.format.frame_at_ms(ms);
        self.seek(i64::try_from(frame).unwrap_or(i64::MAX));
    }

    /// Current frame index.
    pub fn position(&self) -> usize {
        match self.format.bytes_per_frame() {
            0 => 0,
            frame => self.cursor / frame,
        }
    }

    /// Total number of frames.
    pub fn len(&self) -> usize {
        match self.format.bytes_per_frame() {
            0 => 0,
            frame => self.extent.size / frame,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames left before exhaustion.
    pub fn remaining(&self) -> usize {
        self.len() - self.position()
    }

    pub fn state(&self) -> StreamState {
        if self.cursor < self.usable {
            StreamState::Active
        } else {
            StreamState::Exhausted
        }
    }

    /// Fault observed while producing. Always `None`: malformed input is rejected by
    /// [`crate::parse`] before a stream exists.
    pub fn last_error(&self) -> Option<&DecodeError> {
        None
    }

    pub fn format(&self) -> FormatDescriptor {
        self.format
    }

    pub fn extent(&self) -> DataExtent {
        self.extent
    }

    /// Total duration in milliseconds.
    pub fn duration_ms(&self) -> Option<u64> {
        self.format.duration_ms(self.len())
    }

    /// Cursor position in milliseconds.
    pub fn position_ms(&self) -> Option<u64> {
        self.format.duration_ms(self.position())
    }
}

#[inline]
fn sample_at(bytes: &[u8], at: usize) -> f32 {
    f32::from(i16::from_le_bytes([bytes[at], bytes[at + 1]])) / I16_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use crate::test_util::*;
    use std::sync::Arc;

    fn open(buf: &[u8]) -> WavStream<&[u8]> {
        let (format, extent) = parse(buf).unwrap();
        WavStream::new(buf, format, extent)
    }

    fn drain(stream: &mut WavStream<&[u8]>, capacity: usize) -> Vec<Sample> {
        let mut out = Vec::new();
        let mut batch = vec![[0.0f32; 2]; capacity];
        loop {
            let (n, more) = stream.produce(&mut batch);
            out.extend_from_slice(&batch[..n]);
            if !more {
                break;
            }
        }
        out
    }

    #[test]
    fn mono_is_duplicated_into_both_channels() {
        let buf = pcm16(1, 24_000, &[0, 16_384, -16_384, -32_768]);
        let mut stream = open(&buf);
        let mut out = [[9.0f32; 2]; 4];

        let (n, more) = stream.produce(&mut out);
        assert_eq!(n, 4);
        assert!(!more);
        assert_eq!(out, [[0.0, 0.0], [0.5, 0.5], [-0.5, -0.5], [-1.0, -1.0]]);
        for [l, r] in out {
            assert_eq!(l, r);
        }
    }

    #[test]
    fn stereo_words_are_deinterleaved() {
        let buf = pcm16(2, 44_100, &[16_384, -16_384, 8_192, 0, 32_767, -32_768]);
        let mut stream = open(&buf);
        assert_eq!(stream.len(), 3);

        let mut out = [[0.0f32; 2]; 8];
        let (n, more) = stream.produce(&mut out);
        assert_eq!(n, 3);
        assert!(!more);
        assert_eq!(out[0], [0.5, -0.5]);
        assert_eq!(out[1], [0.25, 0.0]);
        assert_eq!(out[2], [32_767.0 / 32_768.0, -1.0]);
    }

    #[test]
    fn amplitudes_stay_in_half_open_range() {
        let buf = pcm16(1, 8_000, &[i16::MIN, -1, 0, 1, i16::MAX]);
        let out = drain(&mut open(&buf), 16);
        for [l, _] in out {
            assert!((-1.0..1.0).contains(&l));
        }
    }

    #[test]
    fn produce_at_end_returns_nothing() {
        let buf = pcm16(1, 24_000, &[1, 2, 3, 4]);
        let mut stream = open(&buf);
        let len = stream.len() as i64;
        stream.seek(len);
        assert_eq!(stream.state(), StreamState::Exhausted);

        let mut out = [[0.0f32; 2]; 1];
        assert_eq!(stream.produce(&mut out), (0, false));
        assert_eq!(stream.produce(&mut out), (0, false));
    }

    #[test]
    fn seek_clamps_out_of_range_targets() {
        let buf = pcm16(2, 24_000, &[0; 20]);
        let mut stream = open(&buf);
        assert_eq!(stream.len(), 10);

        stream.seek(4);
        assert_eq!(stream.position(), 4);
        stream.seek(-5);
        assert_eq!(stream.position(), 0);
        stream.seek(stream.len() as i64 + 100);
        assert_eq!(stream.position(), stream.len());
        stream.seek(i64::MAX);
        assert_eq!(stream.position(), stream.len());
        stream.seek(i64::MIN);
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn seek_revives_exhausted_stream() {
        let buf = pcm16(1, 24_000, &[100, 200, 300]);
        let mut stream = open(&buf);
        drain(&mut stream, 8);
        assert_eq!(stream.state(), StreamState::Exhausted);

        stream.seek(1);
        assert_eq!(stream.state(), StreamState::Active);
        let rest = drain(&mut stream, 8);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0][0], 200.0 / 32_768.0);
    }

    #[test]
    fn batch_size_does_not_change_output() {
        let values: Vec<i16> = (0..37).map(|i| (i * 811 - 15_000) as i16).collect();
        let expected: Vec<Sample> = values
            .iter()
            .map(|&v| {
                let f = f32::from(v) / 32_768.0;
                [f, f]
            })
            .collect();
        let buf = pcm16(1, 16_000, &values);

        for capacity in [1, 3, values.len(), values.len() + 10] {
            let mut stream = open(&buf);
            let got = drain(&mut stream, capacity);
            assert_eq!(got, expected, "capacity {capacity}");
            assert_eq!(stream.position(), values.len());
        }
    }

    #[test]
    fn produce_with_zero_capacity_keeps_state() {
        let buf = pcm16(1, 24_000, &[1, 2]);
        let mut stream = open(&buf);
        assert_eq!(stream.produce(&mut []), (0, true));
        assert_eq!(stream.position(), 0);
        assert_eq!(stream.state(), StreamState::Active);
    }

    #[test]
    fn trailing_partial_frame_is_ignored() {
        let mut payload = samples_le(&[1000, 2000, 3000, 4000]);
        payload.push(0x7f);
        let buf = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 2, 24_000, 16)),
            chunk(b"data", &payload),
        ]);
        let mut stream = open(&buf);
        assert_eq!(stream.len(), 2);
        let out = drain(&mut stream, 4);
        assert_eq!(out.len(), 2);
        assert_eq!(stream.state(), StreamState::Exhausted);
        stream.seek(100);
        assert_eq!(stream.position(), 2);
    }

    #[test]
    fn clamped_data_chunk_plays_up_to_the_cut() {
        let buf = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 24_000, 16)),
            chunk_with_size(b"data", 4096, &samples_le(&[10, 20, 30])),
        ]);
        let mut stream = open(&buf);
        assert_eq!(stream.extent(), DataExtent { offset: 44, size: 6 });
        assert_eq!(stream.len(), 3);
        assert_eq!(drain(&mut stream, 2).len(), 3);
    }

    #[test]
    fn never_reads_past_the_extent() {
        let buf = riff(&[
            chunk(b"fmt ", &fmt_payload(1, 1, 24_000, 16)),
            chunk(b"data", &samples_le(&[1, 2])),
            chunk(b"LIST", &samples_le(&[i16::MAX; 8])),
        ]);
        let mut stream = open(&buf);
        let out = drain(&mut stream, 64);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|[l, _]| *l < 0.001));
    }

    #[test]
    fn timing_helpers() {
        let buf = pcm16(1, 1_000, &[0; 2_500]);
        let mut stream = open(&buf);
        assert_eq!(stream.duration_ms(), Some(2_500));
        stream.seek_ms(1_200);
        assert_eq!(stream.position(), 1_200);
        assert_eq!(stream.position_ms(), Some(1_200));
        assert_eq!(stream.remaining(), 1_300);
        stream.seek_ms(u64::MAX);
        assert_eq!(stream.position(), stream.len());
    }

    #[test]
    fn last_error_is_always_none() {
        let buf = pcm16(1, 24_000, &[1, 2, 3, 4]);
        let mut stream = open(&buf);
        assert!(stream.last_error().is_none());
        drain(&mut stream, 3);
        assert!(stream.last_error().is_none());
    }

    #[test]
    fn shared_buffer_streams_have_independent_cursors() {
        let bytes: Arc<[u8]> = pcm16(1, 24_000, &[1, 2, 3, 4, 5, 6]).into();
        let (format, extent) = parse(&bytes).unwrap();
        let mut a = WavStream::new(bytes.clone(), format, extent);
        let mut b = a.clone();

        a.seek(4);
        let mut out = [[0.0f32; 2]; 1];
        b.produce(&mut out);
        assert_eq!(a.position(), 4);
        assert_eq!(b.position(), 1);

        let handle = std::thread::spawn(move || {
            let mut out = [[0.0f32; 2]; 16];
            a.produce(&mut out).0
        });
        assert_eq!(handle.join().unwrap(), 2);
    }

    #[test]
    fn hand_built_zero_channel_format_is_inert() {
        let buf = pcm16(1, 24_000, &[1, 2]);
        let (mut format, extent) = parse(&buf).unwrap();
        format.channel_count = 0;
        let mut stream = WavStream::new(&buf[..], format, extent);
        assert_eq!(stream.len(), 0);
        stream.seek(3);
        assert_eq!(stream.position(), 0);
        assert_eq!(stream.produce(&mut [[0.0; 2]; 4]), (0, false));
    }

    #[test]
    fn matches_reference_decoder() {
        use symphonia::core::audio::SampleBuffer;
        use symphonia::core::codecs::DecoderOptions;
        use symphonia::core::formats::FormatOptions;
        use symphonia::core::io::MediaSourceStream;
        use symphonia::core::meta::MetadataOptions;
        use symphonia::core::probe::Hint;

        let values: Vec<i16> = (0..512).map(|i| ((i * 131) % 65_536 - 32_768) as i16).collect();
        let buf = pcm16(2, 22_050, &values);

        let source = Box::new(std::io::Cursor::new(buf.clone()));
        let mss = MediaSourceStream::new(source, Default::default());
        let mut hint = Hint::new();
        hint.with_extension("wav");
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .unwrap();
        let mut reader = probed.format;
        let params = reader.default_track().unwrap().codec_params.clone();
        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .unwrap();

        let mut reference = Vec::new();
        while let Ok(packet) = reader.next_packet() {
            let decoded = decoder.decode(&packet).unwrap();
            let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
            sample_buf.copy_interleaved_ref(decoded);
            reference.extend_from_slice(sample_buf.samples());
        }

        let ours = drain(&mut open(&buf), 100);
        let ours = ours.as_flattened();
        assert_eq!(ours.len(), reference.len());
        for (a, b) in ours.iter().zip(&reference) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }
}

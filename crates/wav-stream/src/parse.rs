//! WAVE container validation.
//!
//! [`parse`] checks the RIFF/WAVE header, walks the chunk list with [`Chunks`] and returns
//! the PCM format plus the byte range of the sample data. Chunks other than `fmt ` and
//! `data` are skipped by their declared size, in whatever order they appear.
//!
//! A `data` chunk whose declared size runs past the end of the buffer is clamped to the
//! bytes actually present, so truncated captures still play up to the cut.

use crate::error::{DecodeError, DecodeResult};
use crate::format::{BITS_PER_SAMPLE, DataExtent, FORMAT_PCM, FormatDescriptor};
use crate::riff::{Chunk, Chunks, RIFF_MAGIC, WAVE_FORM, read_u16_le, read_u32_le};

/// Smallest buffer accepted: the canonical 44-byte PCM header.
pub const MIN_WAV_LEN: usize = 44;

/// Bytes of the `fmt ` payload that carry the PCM fields.
const FMT_PCM_LEN: usize = 16;

/// Validate `buf` as a 16-bit PCM WAVE file.
///
/// Returns the format descriptor and the (possibly clamped) data extent. The buffer is only
/// read; nothing is copied.
pub fn parse(buf: &[u8]) -> DecodeResult<(FormatDescriptor, DataExtent)> {
    if buf.len() < MIN_WAV_LEN {
        return Err(DecodeError::TooShort {
            len: buf.len(),
            min: MIN_WAV_LEN,
        });
    }
    if &buf[0..4] != RIFF_MAGIC || &buf[8..12] != WAVE_FORM {
        return Err(DecodeError::BadMagic);
    }

    let mut format = None;
    let mut data = None;

    for chunk in Chunks::new(buf) {
        match &chunk.id {
            b"fmt " if format.is_none() => format = Some(parse_fmt(buf, &chunk)?),
            b"data" if data.is_none() => data = Some(data_extent(buf, &chunk)),
            _ => {
                tracing::debug!(
                    id = %chunk.id_str(),
                    size = chunk.size,
                    offset = chunk.payload_offset,
                    "skipping chunk"
                );
            }
        }
        if format.is_some() && data.is_some() {
            break;
        }
    }

    let format = format.ok_or(DecodeError::MissingFormatChunk)?;
    let data = data.ok_or(DecodeError::MissingDataChunk)?;
    Ok((format, data))
}

/// Decode and validate the PCM fields of a `fmt ` chunk.
fn parse_fmt(buf: &[u8], chunk: &Chunk) -> DecodeResult<FormatDescriptor> {
    let payload = chunk.payload(buf);
    if payload.len() < FMT_PCM_LEN {
        return Err(DecodeError::InvalidFormatChunk {
            size: payload.len(),
        });
    }

    let invalid = || DecodeError::InvalidFormatChunk {
        size: payload.len(),
    };
    let audio_format_code = read_u16_le(payload, 0).ok_or_else(invalid)?;
    let channel_count = read_u16_le(payload, 2).ok_or_else(invalid)?;
    let sample_rate = read_u32_le(payload, 4).ok_or_else(invalid)?;
    let bits_per_sample = read_u16_le(payload, 14).ok_or_else(invalid)?;

    if audio_format_code != FORMAT_PCM {
        return Err(DecodeError::UnsupportedFormat(audio_format_code));
    }
    if bits_per_sample != BITS_PER_SAMPLE {
        return Err(DecodeError::UnsupportedBitDepth(bits_per_sample));
    }
    if !matches!(channel_count, 1 | 2) {
        return Err(DecodeError::UnsupportedChannelCount(channel_count));
    }

    Ok(FormatDescriptor {
        sample_rate,
        channel_count,
        bits_per_sample,
        audio_format_code,
    })
}

fn data_extent(buf: &[u8], chunk: &Chunk) -> DataExtent {
    let declared = DataExtent {
        offset: chunk.payload_offset,
        size: chunk.size as usize,
    };
    if chunk.overruns(buf) {
        let clamped = declared.clamped_to(buf.len());
        tracing::warn!(
            declared = declared.size,
            available = clamped.size,
            "data chunk overruns buffer; clamping"
        );
        return clamped;
    }
    declared
}

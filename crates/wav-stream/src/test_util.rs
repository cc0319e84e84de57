//! Synthetic WAVE buffers for tests.

use crate::format::{BITS_PER_SAMPLE, FORMAT_PCM};

/// 16-byte `fmt ` payload.
pub(crate) fn fmt_payload(format_code: u16, channels: u16, rate: u32, bits: u16) -> Vec<u8> {
    let block_align = channels * (bits / 8);
    let byte_rate = rate * u32::from(block_align);
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&format_code.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out
}

pub(crate) fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Chunk whose header declares `declared` bytes regardless of the payload length.
pub(crate) fn chunk_with_size(id: &[u8; 4], declared: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

pub(crate) fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = chunks.concat();
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32 + 4).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend(body);
    out
}

pub(crate) fn samples_le(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Canonical 16-bit PCM file with interleaved `samples`.
pub(crate) fn pcm16(channels: u16, rate: u32, samples: &[i16]) -> Vec<u8> {
    riff(&[
        chunk(b"fmt ", &fmt_payload(FORMAT_PCM, channels, rate, BITS_PER_SAMPLE)),
        chunk(b"data", &samples_le(samples)),
    ])
}

//! One-call decode entry points.
//!
//! These combine [`parse`] and [`WavStream::new`] for callers that just want a playable
//! source from a complete WAVE buffer or reader.

use std::io::Read;

use crate::error::DecodeResult;
use crate::format::FormatDescriptor;
use crate::parse::parse;
use crate::stream::WavStream;

/// Validate `buf` and wrap it in a stream positioned at the first frame.
///
/// No stream is built when validation fails.
pub fn decode<B: AsRef<[u8]>>(buf: B) -> DecodeResult<(FormatDescriptor, WavStream<B>)> {
    let (format, extent) = parse(buf.as_ref())?;
    tracing::debug!(
        sample_rate = format.sample_rate,
        channels = format.channel_count,
        data_offset = extent.offset,
        data_bytes = extent.size,
        "wav parsed"
    );
    Ok((format, WavStream::new(buf, format, extent)))
}

/// Read `reader` to the end, then decode the collected bytes.
pub fn decode_reader<R: Read>(
    mut reader: R,
) -> DecodeResult<(FormatDescriptor, WavStream<Vec<u8>>)> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    decode(buf)
}

//! Streaming decoder for 16-bit PCM RIFF/WAVE buffers.
//!
//! [`parse`] validates a complete WAVE file held in memory and locates its `fmt ` and `data`
//! chunks. [`WavStream`] then serves stereo `f32` frames from the data on demand, with
//! clamped random-access seeking, for a playback backend to pull from.

pub mod decode;
pub mod error;
pub mod format;
pub mod parse;
pub mod riff;
pub mod stream;

#[cfg(test)]
mod test_util;

pub use decode::{decode, decode_reader};
pub use error::{DecodeError, DecodeResult};
pub use format::{DataExtent, FormatDescriptor};
pub use parse::parse;
pub use stream::{Sample, StreamState, WavStream};

//! Decode errors.

use thiserror::Error;

/// Result type for WAVE decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Reasons a buffer is rejected as a WAVE source.
///
/// Every variant is terminal for the decode attempt. Once a [`crate::WavStream`] exists,
/// reading from it can no longer fail.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Buffer is smaller than the canonical 44-byte header.
    #[error("invalid WAV data: too short ({len} bytes, need at least {min})")]
    TooShort {
        /// Actual buffer length.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// `RIFF` or `WAVE` tag mismatch.
    #[error("invalid WAV data: missing RIFF/WAVE header")]
    BadMagic,

    /// Audio format code other than linear PCM.
    #[error("unsupported audio format: {0} (only PCM supported)")]
    UnsupportedFormat(u16),

    /// Bit depth other than 16.
    #[error("unsupported bits per sample: {0} (only 16-bit supported)")]
    UnsupportedBitDepth(u16),

    /// Channel layout other than mono or stereo.
    #[error("unsupported channel count: {0} (only mono and stereo supported)")]
    UnsupportedChannelCount(u16),

    /// `fmt ` chunk payload is too small to hold the PCM fields.
    #[error("invalid WAV data: fmt chunk holds {size} bytes, need at least 16")]
    InvalidFormatChunk {
        /// Usable payload bytes.
        size: usize,
    },

    /// No `fmt ` chunk before the buffer ran out.
    #[error("invalid WAV data: fmt chunk not found")]
    MissingFormatChunk,

    /// No `data` chunk before the buffer ran out.
    #[error("invalid WAV data: data chunk not found")]
    MissingDataChunk,

    /// Reading the source failed before parsing started.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! RIFF chunk walking.
//!
//! A RIFF file is a 12-byte header (`RIFF`, size, form type) followed by a flat list of
//! chunks laid out as `[4-byte id][u32 LE size][size bytes of payload]`. [`Chunks`] walks
//! that list using the declared sizes only; it never assumes chunks are contiguous with any
//! particular layout.

/// `RIFF` magic at offset 0.
pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
/// `WAVE` form type at offset 8.
pub const WAVE_FORM: &[u8; 4] = b"WAVE";
/// Bytes before the first chunk header.
pub const RIFF_HEADER_LEN: usize = 12;
/// Bytes in a chunk header (id + size).
pub const CHUNK_HEADER_LEN: usize = 8;

/// One chunk header located inside a buffer.
///
/// `size` is the declared payload size and may exceed what the buffer actually holds;
/// use [`Chunk::payload`] to get the bounded slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub id: [u8; 4],
    pub size: u32,
    pub payload_offset: usize,
}

impl Chunk {
    /// Payload bytes actually present in `buf`, truncated at the end of the buffer.
    pub fn payload<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        let start = self.payload_offset.min(buf.len());
        let end = self.payload_offset.saturating_add(self.size as usize).min(buf.len());
        &buf[start..end]
    }

    /// Whether the declared size runs past the end of `buf`.
    pub fn overruns(&self, buf: &[u8]) -> bool {
        self.payload_offset.saturating_add(self.size as usize) > buf.len()
    }

    /// Chunk id as text for logging.
    pub fn id_str(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }
}

/// Iterator over the chunk headers of a RIFF buffer.
///
/// Iteration stops once fewer than [`CHUNK_HEADER_LEN`] bytes remain or the next position
/// would overflow `usize`.
#[derive(Clone, Debug)]
pub struct Chunks<'a> {
    buf: &'a [u8],
    pos: Option<usize>,
}

impl<'a> Chunks<'a> {
    /// Walk chunks starting right after the 12-byte RIFF header.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::starting_at(buf, RIFF_HEADER_LEN)
    }

    /// Walk chunks starting at an arbitrary offset.
    pub fn starting_at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos: Some(pos) }
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let pos = self.pos?;
        let header_end = pos.checked_add(CHUNK_HEADER_LEN)?;
        let Some(header) = self.buf.get(pos..header_end) else {
            self.pos = None;
            return None;
        };

        let id = [header[0], header[1], header[2], header[3]];
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        self.pos = header_end.checked_add(size as usize);
        Some(Chunk {
            id,
            size,
            payload_offset: header_end,
        })
    }
}

/// Read a little-endian `u16` at `at`, if in bounds.
pub(crate) fn read_u16_le(buf: &[u8], at: usize) -> Option<u16> {
    let bytes = buf.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian `u32` at `at`, if in bounds.
pub(crate) fn read_u32_le(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

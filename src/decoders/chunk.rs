use crate::utils::error::{ApngError, ApngResult};
use flate2::Crc;
use std::fmt::{self, Debug, Display, Formatter};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

// length + type + crc
const CHUNK_OVERHEAD: usize = 12;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    pub const PLTE: ChunkType = ChunkType(*b"PLTE");
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    pub const IEND: ChunkType = ChunkType(*b"IEND");
    pub const TRNS: ChunkType = ChunkType(*b"tRNS");
    pub const ACTL: ChunkType = ChunkType(*b"acTL");
    pub const FCTL: ChunkType = ChunkType(*b"fcTL");
    pub const FDAT: ChunkType = ChunkType(*b"fdAT");

    /// Critical chunks have an uppercase first letter.
    pub fn is_critical(&self) -> bool {
        self.0[0].is_ascii_uppercase()
    }

    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl Display for ChunkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Debug for ChunkType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({})", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk<'a> {
    pub chunk_type: ChunkType,
    pub data: &'a [u8],
    pub crc: u32,
    pub offset: usize,
}

impl Chunk<'_> {
    pub fn calculate_crc(&self) -> u32 {
        let mut crc = Crc::new();
        crc.update(&self.chunk_type.0);
        crc.update(self.data);
        crc.sum()
    }
}

/// Walks the chunks of an in-memory PNG stream.
///
/// The reader only borrows the buffer; [`ChunkReader::reset`] starts over
/// from the first chunk. After the first error the iterator is fused.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    position: usize,
    verify_crc: bool,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8], verify_crc: bool) -> ApngResult<Self> {
        if data.is_empty() {
            return Err(ApngError::EmptyBuffer);
        }

        if !data.starts_with(&PNG_SIGNATURE) {
            return Err(ApngError::InvalidSignature);
        }

        Ok(Self {
            data,
            position: PNG_SIGNATURE.len(),
            verify_crc,
            failed: false,
        })
    }

    pub fn reset(&mut self) {
        self.position = PNG_SIGNATURE.len();
        self.failed = false;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn read_chunk(&mut self) -> ApngResult<Chunk<'a>> {
        let offset = self.position;
        let remaining = self.data.len() - offset;

        if remaining < CHUNK_OVERHEAD {
            return Err(ApngError::TruncatedChunk {
                offset,
                declared: CHUNK_OVERHEAD,
                available: remaining,
            });
        }

        let header = &self.data[offset..offset + 8];
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let chunk_type = ChunkType([header[4], header[5], header[6], header[7]]);

        if length > remaining - CHUNK_OVERHEAD {
            return Err(ApngError::TruncatedChunk {
                offset,
                declared: length,
                available: remaining - CHUNK_OVERHEAD,
            });
        }

        let data_start = offset + 8;
        let data_end = data_start + length;
        let crc_bytes = &self.data[data_end..data_end + 4];

        let chunk = Chunk {
            chunk_type,
            data: &self.data[data_start..data_end],
            crc: u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]),
            offset,
        };

        if self.verify_crc {
            let calculated_crc = chunk.calculate_crc();

            if calculated_crc != chunk.crc {
                return Err(ApngError::corrupt(
                    chunk_type.as_str(),
                    format!(
                        "CRC mismatch: expected 0x{:08x}, calculated 0x{:08x}",
                        chunk.crc, calculated_crc
                    ),
                ));
            }
        }

        self.position = data_end + 4;

        Ok(chunk)
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = ApngResult<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.data.len() {
            return None;
        }

        let result = self.read_chunk();
        if result.is_err() {
            self.failed = true;
        }

        Some(result)
    }
}

use crate::utils::error::{ApngError, ApngResult};
use std::ops::Range;

/// Bounds-checked big-endian field access for chunk payloads.
///
/// Every accessor takes the four-character chunk name so that a short
/// payload surfaces as a `CorruptChunk` error naming the offending chunk.
pub(crate) trait PayloadAccess {
    fn get_range_safe(&self, range: Range<usize>, chunk: &str) -> ApngResult<&[u8]>;
    fn u8_at(&self, offset: usize, chunk: &str) -> ApngResult<u8>;
    fn u16_be_at(&self, offset: usize, chunk: &str) -> ApngResult<u16>;
    fn u32_be_at(&self, offset: usize, chunk: &str) -> ApngResult<u32>;
}

impl PayloadAccess for [u8] {
    /// Retrieves `range` of the payload.
    ///
    /// # Errors
    ///
    /// Returns `ApngError::CorruptChunk` if the range is reversed or runs past
    /// the end of the payload.
    fn get_range_safe(&self, range: Range<usize>, chunk: &str) -> ApngResult<&[u8]> {
        if range.start > range.end {
            return Err(ApngError::corrupt(
                chunk,
                format!("invalid range: start ({}) > end ({})", range.start, range.end),
            ));
        }

        self.get(range.clone()).ok_or_else(|| {
            ApngError::corrupt(
                chunk,
                format!("field {}..{} out of bounds (payload length {})", range.start, range.end, self.len()),
            )
        })
    }

    fn u8_at(&self, offset: usize, chunk: &str) -> ApngResult<u8> {
        Ok(self.get_range_safe(offset..offset + 1, chunk)?[0])
    }

    fn u16_be_at(&self, offset: usize, chunk: &str) -> ApngResult<u16> {
        let bytes = self.get_range_safe(offset..offset + 2, chunk)?;

        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32_be_at(&self, offset: usize, chunk: &str) -> ApngResult<u32> {
        let bytes = self.get_range_safe(offset..offset + 4, chunk)?;

        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

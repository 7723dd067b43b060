//! Fixed-width reader segments.

use roaring::RoaringBitmap;

/// Number of sequence units covered by one segment.
pub const SEGMENT_SIZE: i64 = 100;

/// A contiguous range of message sequences and the compressed set of reader
/// slots whose cursor has reached it.
///
/// A slot is set here iff the owning user's cursor is `>= start_seq`: once a
/// user's cursor covers any sequence in the range, the slot is set and stays
/// set for the segment's lifetime.
#[derive(Debug, Clone)]
pub struct ReadSegment {
    pub start_seq: i64,
    pub end_seq: i64,
    pub readers: RoaringBitmap,
}

impl ReadSegment {
    /// New empty segment covering `[start_seq, start_seq + SEGMENT_SIZE - 1]`.
    pub fn starting_at(start_seq: i64) -> Self {
        Self {
            start_seq,
            end_seq: start_seq + SEGMENT_SIZE - 1,
            readers: RoaringBitmap::new(),
        }
    }
}

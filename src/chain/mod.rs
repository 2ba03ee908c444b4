//! Buffer-chain primitives for parsing events delivered as segmented byte
//! buffers.
//!
//! The transport hands an event over as an ordered sequence of fixed-size
//! segments rather than one contiguous allocation. This module collects the
//! domain types needed to parse across segment seams without materialising a
//! contiguous copy: a [`BufferChain`] over [`bytes::Bytes`] segments, a
//! canonical [`Position`], a forward-only [`ChainCursor`], and a logical
//! [`ChainRange`] slice descriptor.

pub mod cursor;
pub mod dump;
pub mod position;
pub mod range;

use bytes::Bytes;
use thiserror::Error;

pub use cursor::ChainCursor;
pub use dump::HexDump;
pub use position::Position;
pub use range::ChainRange;

/// Errors produced by chain positioning and copy operations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The requested range extends past the end of the chain.
    #[error("range [{start}, {start} + {len}) overruns chain of {chain_len} bytes")]
    OutOfBounds {
        /// Logical byte offset where the access started.
        start: usize,
        /// Number of bytes requested.
        len: usize,
        /// Total chain length.
        chain_len: usize,
    },
}

/// An ordered, read-only sequence of byte segments with a known total length.
///
/// The chain is immutable for the lifetime of any iterator bound to it;
/// distinct readers may alias the same chain concurrently.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use putframe::chain::BufferChain;
///
/// let chain = BufferChain::new(vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")]);
/// assert_eq!(chain.len(), 4);
/// let mut buf = [0_u8; 4];
/// chain.read_at(chain.start(), &mut buf).expect("in bounds");
/// assert_eq!(&buf, b"abcd");
/// ```
#[derive(Clone, Debug, Default)]
pub struct BufferChain {
    segments: Vec<Bytes>,
    total_len: usize,
}

impl BufferChain {
    /// Create a chain from pre-sliced segments.
    #[must_use]
    pub fn new(segments: Vec<Bytes>) -> Self {
        let total_len = segments.iter().map(Bytes::len).sum();
        Self {
            segments,
            total_len,
        }
    }

    /// Create a single-segment chain without copying.
    #[must_use]
    pub fn from_bytes(bytes: Bytes) -> Self { Self::new(vec![bytes]) }

    /// Create a single-segment chain by copying `data`.
    #[must_use]
    pub fn from_slice(data: &[u8]) -> Self { Self::from_bytes(Bytes::copy_from_slice(data)) }

    /// Total number of bytes across all segments.
    #[must_use]
    pub const fn len(&self) -> usize { self.total_len }

    /// Return whether the chain holds no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.total_len == 0 }

    /// Number of segments, including empty ones.
    #[must_use]
    pub fn segment_count(&self) -> usize { self.segments.len() }

    pub(crate) fn segment(&self, index: usize) -> &[u8] { &self.segments[index] }

    /// Canonical position of the first byte (the end sentinel when empty).
    #[must_use]
    pub fn start(&self) -> Position { self.normalise(Position::zero()) }

    /// The distinguished "at end" sentinel position.
    #[must_use]
    pub fn end(&self) -> Position {
        Position::new_unchecked(self.segments.len(), 0, self.total_len)
    }

    /// Resolve a logical byte offset into a canonical [`Position`].
    ///
    /// Walks the segment list, so prefer [`ChainCursor::advance`] for
    /// repeated forward stepping.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::OutOfBounds`] if `logical > self.len()`.
    pub fn position_at(&self, logical: usize) -> Result<Position, ChainError> {
        if logical > self.total_len {
            return Err(ChainError::OutOfBounds {
                start: logical,
                len: 0,
                chain_len: self.total_len,
            });
        }
        let mut remaining = logical;
        for (index, segment) in self.segments.iter().enumerate() {
            if remaining < segment.len() {
                return Ok(Position::new_unchecked(index, remaining, logical));
            }
            remaining -= segment.len();
        }
        Ok(self.end())
    }

    /// Gather-copy `dst.len()` bytes starting at `pos` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::OutOfBounds`] if fewer than `dst.len()` bytes
    /// remain at `pos`.
    pub fn read_at(&self, pos: Position, dst: &mut [u8]) -> Result<(), ChainError> {
        if pos.logical_offset() + dst.len() > self.total_len {
            return Err(ChainError::OutOfBounds {
                start: pos.logical_offset(),
                len: dst.len(),
                chain_len: self.total_len,
            });
        }
        let mut segment = pos.segment();
        let mut offset = pos.offset();
        let mut written = 0;
        while written < dst.len() {
            let src = self.segment(segment);
            let take = (src.len() - offset).min(dst.len() - written);
            dst[written..written + take].copy_from_slice(&src[offset..offset + take]);
            written += take;
            segment += 1;
            offset = 0;
        }
        Ok(())
    }

    /// Describe a logical slice of `len` bytes starting at `start`.
    ///
    /// The slice may span multiple segments; no bytes are copied until the
    /// caller asks for them.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::OutOfBounds`] if the slice overruns the chain.
    pub fn range(&self, start: Position, len: usize) -> Result<ChainRange<'_>, ChainError> {
        if start.logical_offset() + len > self.total_len {
            return Err(ChainError::OutOfBounds {
                start: start.logical_offset(),
                len,
                chain_len: self.total_len,
            });
        }
        Ok(ChainRange::new_unchecked(self, start, len))
    }

    /// Render up to `limit` leading bytes as a hex dump for diagnostics.
    #[must_use]
    pub fn hex_dump(&self, limit: usize) -> HexDump<'_> { HexDump::new(Some(self), limit) }

    /// Skip forward past empty segments so the position is canonical: either
    /// it addresses a real byte or it is the end sentinel.
    pub(crate) fn normalise(&self, pos: Position) -> Position {
        let mut segment = pos.segment();
        let mut offset = pos.offset();
        while segment < self.segments.len() && offset >= self.segments[segment].len() {
            offset = 0;
            segment += 1;
        }
        Position::new_unchecked(segment, offset, pos.logical_offset())
    }
}
